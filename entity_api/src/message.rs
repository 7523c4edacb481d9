use super::error::Error;
use chrono::Utc;
use entity::messages::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, sea_query::Expr, Condition, ConnectionTrait, QueryOrder, Set,
};

pub async fn create(
    db: &impl ConnectionTrait,
    message_model: Model,
    sender_id: Id,
) -> Result<Model, Error> {
    debug!("New Message Model to be inserted: {message_model:?}");

    let now = Utc::now();
    let message_active_model: ActiveModel = ActiveModel {
        sender_id: Set(sender_id),
        receiver_id: Set(message_model.receiver_id),
        content: Set(message_model.content),
        is_read: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(message_active_model.insert(db).await?)
}

fn between(user_id: Id, other_user_id: Id) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(Column::SenderId.eq(user_id))
                .add(Column::ReceiverId.eq(other_user_id)),
        )
        .add(
            Condition::all()
                .add(Column::SenderId.eq(other_user_id))
                .add(Column::ReceiverId.eq(user_id)),
        )
}

/// Every message exchanged between the two users, oldest first.
pub async fn find_conversation(
    db: &impl ConnectionTrait,
    user_id: Id,
    other_user_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(between(user_id, other_user_id))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Marks the messages `reader_id` received from `sender_id` as read and
/// returns how many were updated.
pub async fn mark_conversation_read(
    db: &impl ConnectionTrait,
    reader_id: Id,
    sender_id: Id,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::IsRead, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::ReceiverId.eq(reader_id))
        .filter(Column::SenderId.eq(sender_id))
        .filter(Column::IsRead.eq(false))
        .exec(db)
        .await?;

    debug!(
        "Marked {} message(s) from {sender_id} to {reader_id} as read",
        result.rows_affected
    );
    Ok(result.rows_affected)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn message_model(sender_id: Id, receiver_id: Id, content: &str) -> Model {
        let now = Utc::now();
        Model {
            id: Id::new_v4(),
            sender_id,
            receiver_id,
            content: content.to_owned(),
            is_read: false,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn create_returns_a_new_message_model() -> Result<(), Error> {
        let message = message_model(Id::new_v4(), Id::new_v4(), "hi");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![message.clone()]])
            .into_connection();

        let created = create(&db, message.clone(), message.sender_id).await?;

        assert_eq!(created.id, message.id);
        assert!(!created.is_read);
        Ok(())
    }

    #[tokio::test]
    async fn find_conversation_returns_both_directions() -> Result<(), Error> {
        let (a, b) = (Id::new_v4(), Id::new_v4());
        let messages = vec![message_model(a, b, "hi"), message_model(b, a, "hello")];
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![messages.clone()])
            .into_connection();

        let conversation = find_conversation(&db, a, b).await?;

        assert_eq!(conversation, messages);
        Ok(())
    }

    #[tokio::test]
    async fn mark_conversation_read_reports_rows_affected() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        let updated = mark_conversation_read(&db, Id::new_v4(), Id::new_v4()).await?;

        assert_eq!(updated, 3);
        Ok(())
    }
}
