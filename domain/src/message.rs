use crate::error::{EntityErrorKind, Error};
use crate::messages::Model;
use crate::notification;
use entity::notification_kind::NotificationKind;
use entity::{notifications, Id};
use entity_api::{message, user};
use events::{DomainEvent, EventDispatcher};
use log::*;
use sea_orm::DatabaseConnection;

pub use entity_api::message::{find_conversation, mark_conversation_read};

/// Stores a direct message, then pushes it to both participants' message
/// streams and notifies the receiver.
pub async fn send(
    db: &DatabaseConnection,
    dispatcher: &EventDispatcher,
    sender_id: Id,
    receiver_id: Id,
    content: String,
) -> Result<Model, Error> {
    if content.trim().is_empty() {
        return Err(Error::invalid("Message content must not be empty"));
    }
    if sender_id == receiver_id {
        return Err(Error::invalid("Cannot send a message to yourself"));
    }

    let sender = user::find_by_id(db, sender_id).await?;
    if !user::exists(db, receiver_id).await? {
        debug!("Message receiver {receiver_id} does not exist");
        return Err(Error::entity(EntityErrorKind::NotFound));
    }

    let new_message = Model {
        id: Id::nil(),
        sender_id,
        receiver_id,
        content,
        is_read: false,
        created_at: chrono::Utc::now().into(),
        updated_at: chrono::Utc::now().into(),
    };
    let message = message::create(db, new_message, sender_id).await?;

    match serde_json::to_value(&message) {
        Ok(payload) => dispatcher.dispatch(DomainEvent::MessageSent {
            message_id: message.id,
            message: payload,
            notify_user_ids: vec![sender_id, receiver_id],
        }),
        Err(e) => error!("Failed to serialize message {}: {e}", message.id),
    }

    let sender_name = sender.display_name.unwrap_or(sender.username);
    let new_notification = notifications::Model {
        id: Id::nil(),
        user_id: receiver_id,
        actor_id: Some(sender_id),
        kind: NotificationKind::Message,
        entity_id: Some(message.id),
        content: format!("{sender_name} sent you a message"),
        is_read: false,
        created_at: chrono::Utc::now().into(),
    };
    // The message is already stored; a failed notification must not fail the send.
    if let Err(e) = notification::create(db, dispatcher, new_notification).await {
        warn!("Failed to create message notification for {receiver_id}: {e}");
    }

    Ok(message)
}
