//! Typed request bodies for the endpoints that accept input.

pub(crate) mod group_message;
pub(crate) mod message;
