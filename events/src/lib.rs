//! Event system infrastructure for the Pulse platform.
//!
//! This crate provides the event system that enables loose coupling between
//! domain logic and infrastructure concerns (like SSE notifications).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//! - **EventDispatcher**: Hands events from producers to a dedicated dispatch
//!   task that runs the publisher, so producers never wait on fan-out
//!
//! This crate has no dependencies on internal crates (entity, domain, etc.),
//! avoiding circular dependencies. Entity data is carried as serialized JSON values.

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A type alias that represents any Entity's internal id field data type.
/// This matches the definition in the entity crate to maintain compatibility.
pub type Id = Uuid;

/// Domain events that represent business-level changes in the system.
/// These events are emitted only after the underlying write has been committed.
///
/// Events include user IDs for notification routing. The domain layer is
/// responsible for determining which users should be notified.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A direct message was stored.
    MessageSent {
        message_id: Id,
        /// Complete serialized message row.
        message: Value,
        /// Typically the sender (for multi-tab sync) and the receiver.
        notify_user_ids: Vec<Id>,
    },
    /// A message was posted to a group conversation.
    GroupMessageSent {
        group_id: Id,
        /// Complete serialized group message row.
        message: Value,
        /// Every member of the group, the sender included.
        notify_user_ids: Vec<Id>,
    },
    /// A notification row was created for a single recipient.
    NotificationCreated {
        notification_id: Id,
        notification: Value,
        user_id: Id,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::MessageSent { .. } => "message_sent",
            DomainEvent::GroupMessageSent { .. } => "group_message_sent",
            DomainEvent::NotificationCreated { .. } => "notification_created",
        }
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers, in order.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer-side handle onto the dispatch task.
///
/// `dispatch` never waits: the event is queued for the dispatch task, or dropped
/// with a warning when the queue is full or the task has stopped. Delivery is
/// best-effort and a dropped event must never fail the write that produced it.
#[derive(Clone, Debug)]
pub struct EventDispatcher {
    sender: mpsc::Sender<DomainEvent>,
}

impl EventDispatcher {
    /// Starts the dispatch task on the current tokio runtime. The task ends once
    /// every `EventDispatcher` clone has been dropped.
    pub fn spawn(publisher: EventPublisher, capacity: usize) -> (Self, JoinHandle<()>) {
        let (dispatcher, mut receiver) = Self::channel(capacity);

        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                trace!("Dispatching domain event {}", event.name());
                publisher.publish(event).await;
            }
            debug!("Event dispatch task stopped");
        });

        (dispatcher, handle)
    }

    /// Creates a dispatcher and hands back the receiving end instead of spawning
    /// a task for it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn dispatch(&self, event: DomainEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Event dispatch queue is full, dropping {} event",
                    event.name()
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    "Event dispatch task is not running, dropping {} event",
                    event.name()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, event: &DomainEvent) {
            self.seen.lock().unwrap().push(event.name());
        }
    }

    fn notification_event() -> DomainEvent {
        DomainEvent::NotificationCreated {
            notification_id: Id::new_v4(),
            notification: json!({"content": "hello"}),
            user_id: Id::new_v4(),
        }
    }

    #[tokio::test]
    async fn publish_calls_every_handler_in_registration_order() {
        let first = Arc::new(RecordingHandler::default());
        let second = Arc::new(RecordingHandler::default());
        let publisher = EventPublisher::new()
            .with_handler(first.clone())
            .with_handler(second.clone());

        publisher.publish(notification_event()).await;

        assert_eq!(*first.seen.lock().unwrap(), vec!["notification_created"]);
        assert_eq!(*second.seen.lock().unwrap(), vec!["notification_created"]);
    }

    #[tokio::test]
    async fn dispatched_events_reach_handlers_through_the_dispatch_task() {
        let handler = Arc::new(RecordingHandler::default());
        let publisher = EventPublisher::new().with_handler(handler.clone());
        let (dispatcher, task) = EventDispatcher::spawn(publisher, 8);

        dispatcher.dispatch(notification_event());
        dispatcher.dispatch(DomainEvent::MessageSent {
            message_id: Id::new_v4(),
            message: json!({"content": "hi"}),
            notify_user_ids: vec![Id::new_v4()],
        });
        drop(dispatcher);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("dispatch task should stop once dispatchers are dropped")
            .unwrap();

        assert_eq!(
            *handler.seen.lock().unwrap(),
            vec!["notification_created", "message_sent"]
        );
    }

    #[tokio::test]
    async fn dispatch_drops_events_when_the_queue_is_full() {
        let (dispatcher, mut receiver) = EventDispatcher::channel(1);

        dispatcher.dispatch(notification_event());
        // Second event does not fit and must not block or panic.
        dispatcher.dispatch(notification_event());

        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn dispatch_after_the_task_stopped_is_a_no_op() {
        let (dispatcher, receiver) = EventDispatcher::channel(4);
        drop(receiver);

        dispatcher.dispatch(notification_event());
    }
}
