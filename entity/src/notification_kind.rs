use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What a notification is about.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "notification_kind")]
pub enum NotificationKind {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "follow")]
    Follow,
    #[sea_orm(string_value = "mention")]
    Mention,
    #[sea_orm(string_value = "message")]
    Message,
    #[sea_orm(string_value = "group_message")]
    GroupMessage,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Like => write!(fmt, "like"),
            NotificationKind::Comment => write!(fmt, "comment"),
            NotificationKind::Follow => write!(fmt, "follow"),
            NotificationKind::Mention => write!(fmt, "mention"),
            NotificationKind::Message => write!(fmt, "message"),
            NotificationKind::GroupMessage => write!(fmt, "group_message"),
        }
    }
}
