use crate::error::Error;
use crate::notifications::Model;
use entity::Id;
use entity_api::notification;
use events::{DomainEvent, EventDispatcher};
use log::*;
use sea_orm::DatabaseConnection;

pub use entity_api::notification::{count_unread as unread_count, find_by_user, mark_all_read};

/// Stores a notification and pushes it to the recipient's notification streams.
///
/// Returns `None` without storing anything when the actor is the recipient.
pub async fn create(
    db: &DatabaseConnection,
    dispatcher: &EventDispatcher,
    new_notification: Model,
) -> Result<Option<Model>, Error> {
    if new_notification.actor_id == Some(new_notification.user_id) {
        debug!(
            "Skipping {} notification of user {} about themselves",
            new_notification.kind, new_notification.user_id
        );
        return Ok(None);
    }

    let notification = notification::create(db, new_notification).await?;

    match serde_json::to_value(&notification) {
        Ok(payload) => dispatcher.dispatch(DomainEvent::NotificationCreated {
            notification_id: notification.id,
            notification: payload,
            user_id: notification.user_id,
        }),
        Err(e) => error!("Failed to serialize notification {}: {e}", notification.id),
    }

    Ok(Some(notification))
}

pub async fn mark_read(db: &DatabaseConnection, user_id: Id, id: Id) -> Result<Model, Error> {
    Ok(notification::mark_read(db, user_id, id).await?)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use chrono::Utc;
    use entity::notification_kind::NotificationKind;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn notification_model(user_id: Id, actor_id: Option<Id>) -> Model {
        Model {
            id: Id::new_v4(),
            user_id,
            actor_id,
            kind: NotificationKind::Follow,
            entity_id: None,
            content: "started following you".to_owned(),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn create_dispatches_to_the_recipient() -> Result<(), Error> {
        let recipient = Id::new_v4();
        let stored = notification_model(recipient, Some(Id::new_v4()));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![stored.clone()]])
            .into_connection();
        let (dispatcher, mut receiver) = EventDispatcher::channel(4);

        let created = create(&db, &dispatcher, stored.clone()).await?;

        assert_eq!(created, Some(stored.clone()));
        match receiver.try_recv() {
            Ok(DomainEvent::NotificationCreated {
                notification_id,
                user_id,
                notification,
            }) => {
                assert_eq!(notification_id, stored.id);
                assert_eq!(user_id, recipient);
                assert_eq!(notification["kind"], "follow");
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn self_notifications_are_skipped() -> Result<(), Error> {
        let user_id = Id::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (dispatcher, mut receiver) = EventDispatcher::channel(4);

        let created = create(&db, &dispatcher, notification_model(user_id, Some(user_id))).await?;

        assert_eq!(created, None);
        assert!(receiver.try_recv().is_err());
        Ok(())
    }
}
