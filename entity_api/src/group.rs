use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::group_members;
use entity::groups::{ActiveModel, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ConnectionTrait, QuerySelect, Set, TransactionTrait};

/// Creates a group with its creator as the first member.
pub async fn create(
    db: &impl TransactionTrait,
    group_model: Model,
    created_by: Id,
) -> Result<Model, Error> {
    debug!("New Group Model to be inserted: {group_model:?}");

    let txn = db.begin().await?;
    let now = Utc::now();

    let group = ActiveModel {
        name: Set(group_model.name),
        description: Set(group_model.description),
        created_by: Set(created_by),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    add_member(&txn, group.id, created_by).await?;

    txn.commit().await?;

    Ok(group)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

pub async fn add_member(
    db: &impl ConnectionTrait,
    group_id: Id,
    user_id: Id,
) -> Result<group_members::Model, Error> {
    debug!("Adding user {user_id} to group {group_id}");

    Ok(group_members::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id),
        joined_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

pub async fn find_member_ids(db: &impl ConnectionTrait, group_id: Id) -> Result<Vec<Id>, Error> {
    Ok(group_members::Entity::find()
        .select_only()
        .column(group_members::Column::UserId)
        .filter(group_members::Column::GroupId.eq(group_id))
        .into_tuple::<Id>()
        .all(db)
        .await?)
}

pub async fn is_member(db: &impl ConnectionTrait, group_id: Id, user_id: Id) -> Result<bool, Error> {
    Ok(group_members::Entity::find()
        .filter(group_members::Column::GroupId.eq(group_id))
        .filter(group_members::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .is_some())
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn member(group_id: Id, user_id: Id) -> group_members::Model {
        group_members::Model {
            id: Id::new_v4(),
            group_id,
            user_id,
            joined_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn create_inserts_group_and_creator_membership() -> Result<(), Error> {
        let now = Utc::now();
        let creator = Id::new_v4();
        let group = Model {
            id: Id::new_v4(),
            name: "Runners with asthma".to_owned(),
            description: None,
            created_by: creator,
            created_at: now.into(),
            updated_at: now.into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![group.clone()]])
            .append_query_results(vec![vec![member(group.id, creator)]])
            .into_connection();

        let created = create(&db, group.clone(), creator).await?;

        assert_eq!(created.id, group.id);
        assert_eq!(created.created_by, creator);
        Ok(())
    }

    #[tokio::test]
    async fn is_member_is_false_without_membership_row() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<group_members::Model>::new()])
            .into_connection();

        assert!(!is_member(&db, Id::new_v4(), Id::new_v4()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn is_member_is_true_with_membership_row() -> Result<(), Error> {
        let (group_id, user_id) = (Id::new_v4(), Id::new_v4());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![member(group_id, user_id)]])
            .into_connection();

        assert!(is_member(&db, group_id, user_id).await?);
        Ok(())
    }
}
