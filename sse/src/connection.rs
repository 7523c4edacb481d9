use crate::message::{EventKind, Frame, StreamKind};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc::Sender;

// Type alias for user IDs (web layer converts domain::Id to String)
pub type UserId = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection information (no redundant connection_id)
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub user_id: UserId,
    pub stream: StreamKind,
    /// Producer half of the connection's bounded queue.
    pub sender: Sender<Frame>,
}

/// Connection registry with dual indices for O(1) lookups.
///
/// Invariant: a user id is present in `user_index` only while at least one of
/// its connections is registered.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: fast lookup by user_id for message routing - O(1)
    user_index: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_index: DashMap::new(),
        }
    }

    /// Register a new connection - O(1)
    pub fn register(
        &self,
        user_id: UserId,
        stream: StreamKind,
        sender: Sender<Frame>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();

        // Insert into primary storage
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                user_id: user_id.clone(),
                stream,
                sender,
            },
        );

        // Update secondary index
        self.user_index
            .entry(user_id)
            .or_default()
            .insert(connection_id.clone());

        connection_id
    }

    /// Unregister a connection - O(1). Returns `false` when the connection was
    /// already gone.
    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        let Some((_, info)) = self.connections.remove(connection_id) else {
            return false;
        };

        if let Some(mut entry) = self.user_index.get_mut(&info.user_id) {
            entry.remove(connection_id);
        }

        // Conditional removal so a concurrent register for the same user is never lost
        self.user_index
            .remove_if(&info.user_id, |_, connection_ids| connection_ids.is_empty());

        true
    }

    /// Snapshot of the queues registered for `user_id` that accept `kind`.
    ///
    /// No map guard is held once this returns, so callers are free to unregister
    /// connections while walking the result.
    pub fn senders_for(&self, user_id: &str, kind: &EventKind) -> Vec<(ConnectionId, Sender<Frame>)> {
        let connection_ids: Vec<ConnectionId> = match self.user_index.get(user_id) {
            Some(entry) => entry.iter().cloned().collect(),
            None => return Vec::new(),
        };

        connection_ids
            .into_iter()
            .filter_map(|connection_id| {
                let info = self.connections.get(&connection_id)?;
                if kind.targets(info.stream) {
                    let sender = info.sender.clone();
                    Some((connection_id, sender))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Snapshot of every user with at least one open connection.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.user_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn has_connections(&self, user_id: &str) -> bool {
        self.user_index.contains_key(user_id)
    }

    /// Number of connections for one user, or for everyone when `user_id` is `None`.
    pub fn connection_count(&self, user_id: Option<&str>) -> usize {
        match user_id {
            Some(user_id) => self
                .user_index
                .get(user_id)
                .map(|entry| entry.len())
                .unwrap_or(0),
            None => self.connections.len(),
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn sender() -> Sender<Frame> {
        mpsc::channel(4).0
    }

    #[test]
    fn register_indexes_connection_under_its_user() {
        let registry = ConnectionRegistry::new();

        let first = registry.register("u1".into(), StreamKind::Messages, sender());
        let second = registry.register("u1".into(), StreamKind::Notifications, sender());

        assert_ne!(first, second);
        assert!(registry.has_connections("u1"));
        assert_eq!(registry.connection_count(Some("u1")), 2);
        assert_eq!(registry.connection_count(None), 2);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let connection_id = registry.register("u1".into(), StreamKind::Messages, sender());

        assert!(registry.unregister(&connection_id));
        assert!(!registry.unregister(&connection_id));
        assert_eq!(registry.connection_count(None), 0);
    }

    #[test]
    fn last_unregister_removes_the_user_entry() {
        let registry = ConnectionRegistry::new();
        let first = registry.register("u1".into(), StreamKind::Messages, sender());
        let second = registry.register("u1".into(), StreamKind::Messages, sender());

        registry.unregister(&first);
        assert!(registry.has_connections("u1"));
        assert_eq!(registry.connection_count(Some("u1")), 1);

        registry.unregister(&second);
        assert!(!registry.has_connections("u1"));
        assert!(registry.user_ids().is_empty());
    }

    #[test]
    fn unregister_only_touches_its_own_user() {
        let registry = ConnectionRegistry::new();
        let mine = registry.register("u1".into(), StreamKind::Messages, sender());
        registry.register("u2".into(), StreamKind::Messages, sender());

        registry.unregister(&mine);

        assert_eq!(registry.connection_count(Some("u1")), 0);
        assert_eq!(registry.connection_count(Some("u2")), 1);
    }

    #[test]
    fn senders_for_filters_by_stream() {
        let registry = ConnectionRegistry::new();
        let messages = registry.register("u1".into(), StreamKind::Messages, sender());
        let notifications = registry.register("u1".into(), StreamKind::Notifications, sender());

        let for_message: Vec<_> = registry
            .senders_for("u1", &EventKind::Message)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(for_message, vec![messages.clone()]);

        let for_notification: Vec<_> = registry
            .senders_for("u1", &EventKind::Notification)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(for_notification, vec![notifications.clone()]);

        assert_eq!(registry.senders_for("u1", &EventKind::Ping).len(), 2);
        assert!(registry.senders_for("nobody", &EventKind::Ping).is_empty());
    }

    #[test]
    fn connection_count_for_unknown_user_is_zero() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.connection_count(Some("ghost")), 0);
        assert!(!registry.has_connections("ghost"));
    }
}
