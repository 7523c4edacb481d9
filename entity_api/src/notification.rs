use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::notifications::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, sea_query::Expr, ActiveValue::Unchanged, ConnectionTrait, PaginatorTrait,
    QueryOrder, Set,
};

pub async fn create(db: &impl ConnectionTrait, notification_model: Model) -> Result<Model, Error> {
    debug!("New Notification Model to be inserted: {notification_model:?}");

    Ok(ActiveModel {
        user_id: Set(notification_model.user_id),
        actor_id: Set(notification_model.actor_id),
        kind: Set(notification_model.kind),
        entity_id: Set(notification_model.entity_id),
        content: Set(notification_model.content),
        is_read: Set(false),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Notifications for a user, newest first.
pub async fn find_by_user(db: &impl ConnectionTrait, user_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn count_unread(db: &impl ConnectionTrait, user_id: Id) -> Result<u64, Error> {
    Ok(Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::IsRead.eq(false))
        .count(db)
        .await?)
}

/// Marks one of `user_id`'s notifications as read. Notifications belonging to
/// someone else are reported as not found.
pub async fn mark_read(db: &impl ConnectionTrait, user_id: Id, id: Id) -> Result<Model, Error> {
    let notification = Entity::find_by_id(id)
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| {
            debug!("Notification {id} not found for user {user_id}");
            Error {
                source: None,
                error_kind: EntityApiErrorKind::RecordNotFound,
            }
        })?;

    if notification.is_read {
        return Ok(notification);
    }

    let active_model = ActiveModel {
        id: Unchanged(notification.id),
        is_read: Set(true),
        ..Default::default()
    };

    Ok(active_model.update(db).await?)
}

pub async fn mark_all_read(db: &impl ConnectionTrait, user_id: Id) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::IsRead, Expr::value(true))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::IsRead.eq(false))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
