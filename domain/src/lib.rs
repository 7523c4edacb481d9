//! Producers and identity resolution for the platform.
//!
//! Every producer commits its write first and only then hands a domain event
//! to the `EventDispatcher`, so fan-out to open streams can never fail or roll
//! back the write.

// Re-exports from `entity` crate via `entity_api`
pub use entity_api::{
    group_members, group_messages, groups, messages, notification_kind, notifications, users, Id,
};

pub use events;

pub mod error;
pub mod group;
pub mod group_message;
pub mod identity;
pub mod message;
pub mod notification;
