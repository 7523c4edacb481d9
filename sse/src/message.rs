use axum::response::sse::Event;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// The SSE endpoint a connection was opened on. Every connection queue belongs
/// to exactly one stream, and events are only queued for the streams they target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Direct-message stream (`/messages/stream`)
    Messages,
    /// Notification stream (`/notifications/stream`), also carries group messages
    Notifications,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Messages => "messages",
            StreamKind::Notifications => "notifications",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SSE event name. The set is open: producers may introduce new names through
/// `Other`, and clients are expected to ignore names they don't recognize.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Message,
    GroupMessage,
    Notification,
    Ping,
    Reconnect,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Message => "message",
            EventKind::GroupMessage => "group_message",
            EventKind::Notification => "notification",
            EventKind::Ping => "ping",
            EventKind::Reconnect => "reconnect",
            EventKind::Other(name) => name.as_str(),
        }
    }

    /// Whether connections opened on `stream` receive this kind of event.
    pub fn targets(&self, stream: StreamKind) -> bool {
        match self {
            EventKind::Message => stream == StreamKind::Messages,
            EventKind::GroupMessage | EventKind::Notification => {
                stream == StreamKind::Notifications
            }
            EventKind::Connected | EventKind::Ping | EventKind::Reconnect | EventKind::Other(_) => {
                true
            }
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "connected" => EventKind::Connected,
            "message" => EventKind::Message,
            "group_message" => EventKind::GroupMessage,
            "notification" => EventKind::Notification,
            "ping" => EventKind::Ping,
            "reconnect" => EventKind::Reconnect,
            other => EventKind::Other(other.to_owned()),
        }
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        EventKind::from(name.as_str())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serialized event waiting in a connection queue. The JSON payload is
/// rendered once per broadcast and shared between every queue it lands in.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    kind: EventKind,
    data: Arc<str>,
}

impl Frame {
    pub fn new<T>(kind: EventKind, payload: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_string(payload)?;
        Ok(Self {
            kind,
            data: data.into(),
        })
    }

    pub fn from_value(kind: EventKind, payload: &Value) -> Self {
        Self {
            kind,
            data: payload.to_string().into(),
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn into_sse_event(self) -> Event {
        Event::default().event(self.kind.as_str()).data(&*self.data)
    }

    pub(crate) fn connected(user_id: &str) -> Self {
        Self::from_value(
            EventKind::Connected,
            &json!({ "user_id": user_id, "timestamp": now() }),
        )
    }

    pub(crate) fn ping() -> Self {
        Self::from_value(EventKind::Ping, &json!({ "timestamp": now() }))
    }

    pub(crate) fn reconnect(reason: &str) -> Self {
        Self::from_value(
            EventKind::Reconnect,
            &json!({ "reason": reason, "timestamp": now() }),
        )
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone)]
pub struct Message {
    pub event: EventKind,
    pub payload: Value,
    pub scope: MessageScope,
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// Send to all connections for a specific user
    User { user_id: String },
    /// Send to all connected users
    Broadcast,
}
