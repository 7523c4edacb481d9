use uuid::Uuid;

// Users and messaging
pub mod group_members;
pub mod group_messages;
pub mod groups;
pub mod messages;
pub mod users;

// Notifications
pub mod notification_kind;
pub mod notifications;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
