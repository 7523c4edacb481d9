//! SSE HTTP handlers for the web layer.
//!
//! This module contains only the Axum handlers for the stream endpoints.
//! The broadcaster, registry and stream protocol live in the `sse` crate.

pub(crate) mod handler;
