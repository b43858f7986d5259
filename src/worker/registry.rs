//! In-memory connection registry.
//!
//! The worker's authoritative view of its own sockets. The shared store
//! mirrors this with bounded staleness; every mutation here is paired with
//! a store write by the caller.

use std::sync::{Arc, Mutex};

use axum::extract::ws;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::target::TargetQuery;
use crate::util::remove_string;

/// Handle to one live socket. The actual I/O happens in the connection's
/// writer and reader tasks; everything else talks to the socket through
/// this handle's mailbox.
///
/// The mailbox is unbounded: a client that stops draining frames grows it
/// until the liveness TTL lapses or a disconnect closes the socket.
pub struct Connection {
    pub id: String,
    pub user: String,
    pub session: Option<String>,
    channels: Mutex<Vec<String>>,
    last_ping: Mutex<DateTime<Utc>>,
    sender: mpsc::UnboundedSender<ws::Message>,
    close: CancellationToken,
}

impl Connection {
    pub fn new(
        id: String,
        user: String,
        session: Option<String>,
        channels: Vec<String>,
        sender: mpsc::UnboundedSender<ws::Message>,
    ) -> Self {
        Self {
            id,
            user,
            session,
            channels: Mutex::new(channels),
            last_ping: Mutex::new(Utc::now()),
            sender,
            close: CancellationToken::new(),
        }
    }

    /// Enqueue a frame for the writer task. Returns false once the writer
    /// is gone (socket closing).
    pub fn send(&self, message: ws::Message) -> bool {
        self.sender.send(message).is_ok()
    }

    /// Ask the connection's tasks to shut the socket down.
    pub fn close(&self) {
        self.close.cancel();
    }

    pub fn close_signal(&self) -> CancellationToken {
        self.close.clone()
    }

    pub fn channels(&self) -> Vec<String> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Add a channel; false when already subscribed.
    pub fn subscribe_channel(&self, channel: &str) -> bool {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if channels.iter().any(|c| c == channel) {
            return false;
        }
        channels.push(channel.to_string());
        true
    }

    /// Remove a channel; false when not subscribed.
    pub fn unsubscribe_channel(&self, channel: &str) -> bool {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if !channels.iter().any(|c| c == channel) {
            return false;
        }
        remove_string(&mut channels, channel);
        true
    }

    pub fn touch(&self) {
        *self.last_ping.lock().unwrap_or_else(|e| e.into_inner()) = Utc::now();
    }

    pub fn last_ping(&self) -> DateTime<Utc> {
        *self.last_ping.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// All live connections on this worker, with by-user and by-channel
/// indexes for local target resolution.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<Connection>>,
    users: DashMap<String, Vec<String>>,
    channels: DashMap<String, Vec<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, connection: Arc<Connection>) {
        self.users
            .entry(connection.user.clone())
            .or_default()
            .push(connection.id.clone());
        for channel in connection.channels() {
            self.channels
                .entry(channel)
                .or_default()
                .push(connection.id.clone());
        }
        self.connections
            .insert(connection.id.clone(), connection);
    }

    /// Drop a connection and every index entry pointing at it.
    pub fn remove(&self, id: &str) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(id)?;

        remove_index_entry(&self.users, &connection.user, id);
        for channel in connection.channels() {
            remove_index_entry(&self.channels, &channel, id);
        }

        Some(connection)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Connection>> {
        self.connections.get(id).map(|entry| entry.clone())
    }

    /// Subscribe a connection to a channel, keeping the index in step.
    /// Returns false when nothing changed.
    pub fn subscribe(&self, connection: &Arc<Connection>, channel: &str) -> bool {
        if !connection.subscribe_channel(channel) {
            return false;
        }
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push(connection.id.clone());
        true
    }

    /// Unsubscribe a connection from a channel, keeping the index in step.
    /// Returns false when nothing changed.
    pub fn unsubscribe(&self, connection: &Arc<Connection>, channel: &str) -> bool {
        if !connection.unsubscribe_channel(channel) {
            return false;
        }
        remove_index_entry(&self.channels, channel, &connection.id);
        true
    }

    /// Resolve a target against local connections only. Same selector
    /// precedence as the control plane: connection id > channel >
    /// user(+session).
    pub fn resolve_local(&self, target: &TargetQuery) -> Vec<Arc<Connection>> {
        if !target.id.is_empty() {
            return self.get(&target.id).into_iter().collect();
        }

        let ids: Vec<String> = if !target.channel.is_empty() {
            self.channels
                .get(&target.channel)
                .map(|entry| entry.clone())
                .unwrap_or_default()
        } else if !target.user.is_empty() {
            self.users
                .get(&target.user)
                .map(|entry| entry.clone())
                .unwrap_or_default()
        } else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|id| self.get(id))
            .filter(|connection| {
                target.session.is_empty()
                    || connection.session.as_deref() == Some(&target.session)
            })
            .collect()
    }

    pub fn connection_ids(&self) -> Vec<String> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Remove `id` from the index entry at `key`, dropping the entry when it
/// empties so indexes never accumulate dead keys.
fn remove_index_entry(index: &DashMap<String, Vec<String>>, key: &str, id: &str) {
    let emptied = if let Some(mut entry) = index.get_mut(key) {
        remove_string(&mut entry, id);
        entry.is_empty()
    } else {
        false
    };

    if emptied {
        index.remove_if(key, |_, ids| ids.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(id: &str, user: &str, session: Option<&str>, channels: &[&str]) -> Arc<Connection> {
        let (sender, _receiver) = mpsc::unbounded_channel();
        Arc::new(Connection::new(
            id.to_string(),
            user.to_string(),
            session.map(str::to_string),
            channels.iter().map(|c| c.to_string()).collect(),
            sender,
        ))
    }

    #[test]
    fn resolve_by_connection_id() {
        let registry = ConnectionRegistry::new();
        registry.add(connection("c1", "alice", None, &[]));

        let target = TargetQuery {
            id: "c1".to_string(),
            ..Default::default()
        };
        assert_eq!(registry.resolve_local(&target).len(), 1);

        let target = TargetQuery {
            id: "missing".to_string(),
            ..Default::default()
        };
        assert!(registry.resolve_local(&target).is_empty());
    }

    #[test]
    fn resolve_by_user_with_session_filter() {
        let registry = ConnectionRegistry::new();
        registry.add(connection("c1", "alice", Some("phone"), &[]));
        registry.add(connection("c2", "alice", Some("laptop"), &[]));
        registry.add(connection("c3", "bob", None, &[]));

        let target = TargetQuery {
            user: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(registry.resolve_local(&target).len(), 2);

        let target = TargetQuery {
            user: "alice".to_string(),
            session: "phone".to_string(),
            ..Default::default()
        };
        let matched = registry.resolve_local(&target);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "c1");
    }

    #[test]
    fn resolve_by_channel() {
        let registry = ConnectionRegistry::new();
        registry.add(connection("c1", "alice", None, &["news"]));
        registry.add(connection("c2", "bob", None, &["news", "sport"]));

        let target = TargetQuery {
            channel: "news".to_string(),
            ..Default::default()
        };
        assert_eq!(registry.resolve_local(&target).len(), 2);

        let target = TargetQuery {
            channel: "sport".to_string(),
            ..Default::default()
        };
        assert_eq!(registry.resolve_local(&target).len(), 1);
    }

    #[test]
    fn channel_id_beats_other_selectors() {
        let registry = ConnectionRegistry::new();
        registry.add(connection("c1", "alice", None, &["news"]));
        registry.add(connection("c2", "bob", None, &["news"]));

        let target = TargetQuery {
            id: "c1".to_string(),
            channel: "news".to_string(),
            user: "bob".to_string(),
            ..Default::default()
        };
        let matched = registry.resolve_local(&target);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "c1");
    }

    #[test]
    fn subscribe_and_unsubscribe_update_index() {
        let registry = ConnectionRegistry::new();
        let conn = connection("c1", "alice", None, &[]);
        registry.add(conn.clone());

        assert!(registry.subscribe(&conn, "news"));
        // Already subscribed: no change
        assert!(!registry.subscribe(&conn, "news"));

        let target = TargetQuery {
            channel: "news".to_string(),
            ..Default::default()
        };
        assert_eq!(registry.resolve_local(&target).len(), 1);

        assert!(registry.unsubscribe(&conn, "news"));
        assert!(!registry.unsubscribe(&conn, "news"));
        assert!(registry.resolve_local(&target).is_empty());
    }

    #[test]
    fn remove_clears_indexes() {
        let registry = ConnectionRegistry::new();
        registry.add(connection("c1", "alice", Some("s"), &["news"]));

        assert!(registry.remove("c1").is_some());
        assert!(registry.remove("c1").is_none());
        assert!(registry.is_empty());

        let by_user = TargetQuery {
            user: "alice".to_string(),
            ..Default::default()
        };
        let by_channel = TargetQuery {
            channel: "news".to_string(),
            ..Default::default()
        };
        assert!(registry.resolve_local(&by_user).is_empty());
        assert!(registry.resolve_local(&by_channel).is_empty());
    }

    #[test]
    fn session_alone_matches_nothing() {
        let registry = ConnectionRegistry::new();
        registry.add(connection("c1", "alice", Some("s"), &[]));

        let target = TargetQuery {
            session: "s".to_string(),
            ..Default::default()
        };
        assert!(registry.resolve_local(&target).is_empty());
    }
}
