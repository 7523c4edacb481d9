use crate::message::EventKind;
use crate::Broadcaster;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use serde_json::Value;
use std::sync::Arc;

/// Handles domain events by converting them to SSE events and broadcasting to affected users.
///
/// The domain layer determines which users should be notified and includes
/// their IDs in the event. This handler simply routes the payloads.
pub struct SseDomainEventHandler {
    broadcaster: Arc<Broadcaster>,
}

impl SseDomainEventHandler {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }

    /// Each recipient is an independent best-effort send.
    fn send_to_users(&self, kind: EventKind, payload: &Value, user_ids: &[events::Id]) {
        for user_id in user_ids {
            self.broadcaster
                .broadcast_to_user(&user_id.to_string(), kind.clone(), payload);
        }

        debug!(
            "Sent {kind} SSE event to {} user(s): {:?}",
            user_ids.len(),
            user_ids
        );
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::MessageSent {
                message_id,
                message,
                notify_user_ids,
            } => {
                debug!("Handling MessageSent event for message {message_id}");
                self.send_to_users(EventKind::Message, message, notify_user_ids);
            }

            DomainEvent::GroupMessageSent {
                group_id,
                message,
                notify_user_ids,
            } => {
                debug!("Handling GroupMessageSent event for group {group_id}");
                self.send_to_users(EventKind::GroupMessage, message, notify_user_ids);
            }

            DomainEvent::NotificationCreated {
                notification_id,
                notification,
                user_id,
            } => {
                debug!("Handling NotificationCreated event for notification {notification_id}");
                self.send_to_users(
                    EventKind::Notification,
                    notification,
                    std::slice::from_ref(user_id),
                );
            }
        }
    }
}
