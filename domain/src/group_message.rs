use crate::error::{EntityErrorKind, Error};
use crate::group_messages::Model;
use entity::Id;
use entity_api::{group, group_message};
use events::{DomainEvent, EventDispatcher};
use log::*;
use sea_orm::DatabaseConnection;

pub use entity_api::group_message::find_by_group;

/// Stores a message in a group conversation and pushes it to every member,
/// the sender included.
pub async fn send(
    db: &DatabaseConnection,
    dispatcher: &EventDispatcher,
    group_id: Id,
    sender_id: Id,
    content: String,
) -> Result<Model, Error> {
    if content.trim().is_empty() {
        return Err(Error::invalid("Message content must not be empty"));
    }

    let member_ids = group::find_member_ids(db, group_id).await?;
    if !member_ids.contains(&sender_id) {
        warn!("User {sender_id} is not a member of group {group_id}");
        return Err(Error::entity(EntityErrorKind::Forbidden));
    }

    let message = group_message::create(db, group_id, sender_id, content).await?;

    match serde_json::to_value(&message) {
        Ok(payload) => dispatcher.dispatch(DomainEvent::GroupMessageSent {
            group_id,
            message: payload,
            notify_user_ids: member_ids,
        }),
        Err(e) => error!("Failed to serialize group message {}: {e}", message.id),
    }

    Ok(message)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn member_rows(ids: &[Id]) -> Vec<BTreeMap<&'static str, sea_orm::Value>> {
        ids.iter()
            .map(|id| BTreeMap::from([("user_id", (*id).into())]))
            .collect()
    }

    #[tokio::test]
    async fn non_members_are_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![member_rows(&[Id::new_v4()])])
            .into_connection();
        let (dispatcher, mut receiver) = EventDispatcher::channel(4);

        let result = send(&db, &dispatcher, Id::new_v4(), Id::new_v4(), "hello".into()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Forbidden))
        );
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn members_send_to_the_whole_group() -> Result<(), Error> {
        let (group_id, sender, other) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
        let stored = Model {
            id: Id::new_v4(),
            group_id,
            sender_id: sender,
            content: "hello".to_owned(),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![member_rows(&[sender, other])])
            .append_query_results(vec![vec![stored.clone()]])
            .into_connection();
        let (dispatcher, mut receiver) = EventDispatcher::channel(4);

        let message = send(&db, &dispatcher, group_id, sender, "hello".into()).await?;

        assert_eq!(message, stored);
        match receiver.try_recv() {
            Ok(DomainEvent::GroupMessageSent {
                group_id: dispatched_group,
                notify_user_ids,
                ..
            }) => {
                assert_eq!(dispatched_group, group_id);
                assert_eq!(notify_user_ids, vec![sender, other]);
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
        Ok(())
    }
}
