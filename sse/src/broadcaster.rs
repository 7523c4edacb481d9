use crate::connection::{ConnectionId, ConnectionRegistry, UserId};
use crate::message::{EventKind, Frame, Message as SseMessage, MessageScope, StreamKind};
use log::*;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver};

/// Pending events a single connection may hold before it is considered stuck.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Best-effort fan-out of events to every open stream of a user.
///
/// Nothing here ever returns an error to the caller: an offline user, a full
/// queue or a payload that cannot be serialized are logged and dropped.
pub struct Broadcaster {
    registry: ConnectionRegistry,
    queue_capacity: usize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Allocate a bounded queue for a new connection and register it.
    pub fn connect(&self, user_id: UserId, stream: StreamKind) -> (ConnectionId, Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let connection_id = self.registry.register(user_id.clone(), stream, sender);

        info!(
            "Registered {stream} stream connection {} for user {user_id}",
            connection_id.as_str()
        );
        (connection_id, receiver)
    }

    /// Remove a connection. Disconnecting an already removed connection is a no-op.
    pub fn disconnect(&self, connection_id: &ConnectionId) -> bool {
        let removed = self.registry.unregister(connection_id);
        if removed {
            info!("Unregistered stream connection {}", connection_id.as_str());
        }
        removed
    }

    pub fn broadcast_to_user<T>(&self, user_id: &str, event_type: impl Into<EventKind>, payload: &T)
    where
        T: Serialize + ?Sized,
    {
        // Most users are offline most of the time, so bail out before serializing.
        if !self.registry.has_connections(user_id) {
            return;
        }

        let kind = event_type.into();
        match Frame::new(kind, payload) {
            Ok(frame) => self.deliver(user_id, &frame),
            Err(e) => error!("Failed to serialize SSE event for user {user_id}: {e}"),
        }
    }

    pub fn broadcast_to_all<T>(&self, event_type: impl Into<EventKind>, payload: &T)
    where
        T: Serialize + ?Sized,
    {
        let kind = event_type.into();
        let frame = match Frame::new(kind, payload) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize SSE broadcast event: {e}");
                return;
            }
        };

        for user_id in self.registry.user_ids() {
            self.deliver(&user_id, &frame);
        }
    }

    /// Send a message based on its scope
    pub fn send_message(&self, message: SseMessage) {
        match message.scope {
            MessageScope::User { user_id } => {
                self.broadcast_to_user(&user_id, message.event, &message.payload);
            }
            MessageScope::Broadcast => {
                self.broadcast_to_all(message.event, &message.payload);
            }
        }
    }

    pub fn connection_count(&self, user_id: Option<&str>) -> usize {
        self.registry.connection_count(user_id)
    }

    fn deliver(&self, user_id: &str, frame: &Frame) {
        let mut failed = Vec::new();

        for (connection_id, sender) in self.registry.senders_for(user_id, frame.kind()) {
            match sender.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Queue for connection {} of user {user_id} is full, dropping {} event and evicting the connection",
                        connection_id.as_str(),
                        frame.kind()
                    );
                    failed.push(connection_id);
                }
                Err(TrySendError::Closed(_)) => {
                    info!(
                        "Connection {} of user {user_id} is gone, evicting it",
                        connection_id.as_str()
                    );
                    failed.push(connection_id);
                }
            }
        }

        for connection_id in failed {
            self.disconnect(&connection_id);
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
