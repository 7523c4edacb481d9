use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::users::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};

pub async fn create(db: &impl ConnectionTrait, user_model: Model) -> Result<Model, Error> {
    debug!("New User Model to be inserted: {user_model:?}");

    let now = Utc::now();
    let user_active_model: ActiveModel = ActiveModel {
        external_id: Set(user_model.external_id),
        username: Set(user_model.username),
        display_name: Set(user_model.display_name),
        email: Set(user_model.email),
        avatar_url: Set(user_model.avatar_url),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(user_active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

pub async fn find_by_external_id(
    db: &impl ConnectionTrait,
    external_id: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ExternalId.eq(external_id))
        .one(db)
        .await?)
}

pub async fn exists(db: &impl ConnectionTrait, id: Id) -> Result<bool, Error> {
    Ok(Entity::find_by_id(id).one(db).await?.is_some())
}
