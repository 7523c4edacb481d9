//! SeaORM Entity for the notifications table.

use crate::notification_kind::NotificationKind;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::notifications::Model)]
#[sea_orm(schema_name = "pulse", table_name = "notifications")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    /// Recipient
    #[schema(value_type = Uuid)]
    pub user_id: Id,

    /// User whose action caused the notification, if any
    #[schema(value_type = Option<Uuid>)]
    pub actor_id: Option<Id>,

    pub kind: NotificationKind,

    /// Post, message or group the notification points at
    #[schema(value_type = Option<Uuid>)]
    pub entity_id: Option<Id>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[serde(skip_deserializing)]
    pub is_read: bool,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
