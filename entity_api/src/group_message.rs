use super::error::Error;
use chrono::Utc;
use entity::group_messages::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder, Set};

pub async fn create(
    db: &impl ConnectionTrait,
    group_id: Id,
    sender_id: Id,
    content: String,
) -> Result<Model, Error> {
    debug!("New Group Message to be inserted into group {group_id} from {sender_id}");

    Ok(ActiveModel {
        group_id: Set(group_id),
        sender_id: Set(sender_id),
        content: Set(content),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Messages of a group, oldest first.
pub async fn find_by_group(db: &impl ConnectionTrait, group_id: Id) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::GroupId.eq(group_id))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}
