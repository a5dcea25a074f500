//! Connection Registry
//!
//! Maps each live connection to its display name and outbound queue.
//! Owned by value inside the hub task; nothing else ever touches it.

use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::protocol::{ConnectionId, OutboundNotification};

/// Outbound queue of a single connection, drained by its writer task.
pub type ConnectionSender = mpsc::UnboundedSender<OutboundNotification>;

struct Entry {
    /// Empty until the client identifies.
    name: String,
    sender: ConnectionSender,
    /// Set by `left`. The socket stays open but the connection gets no
    /// fan-out and is absent from the user list until it identifies again.
    left: bool,
}

/// Result of one fan-out pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    /// Connections whose queue was closed; already removed from the registry.
    pub dropped: Vec<ConnectionId>,
    /// A dropped connection had a display name, so the user list changed.
    pub list_changed: bool,
}

#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<ConnectionId, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection with an empty display name.
    pub fn insert(&mut self, conn: ConnectionId, sender: ConnectionSender) {
        self.entries.insert(
            conn,
            Entry {
                name: String::new(),
                sender,
                left: false,
            },
        );
    }

    /// Set the display name, bringing back a connection that had left.
    /// Returns false when the connection is not registered.
    pub fn set_name(&mut self, conn: ConnectionId, name: String) -> bool {
        match self.entries.get_mut(&conn) {
            Some(entry) => {
                entry.name = name;
                entry.left = false;
                true
            }
            None => false,
        }
    }

    /// Take a connection out of fan-out and the user list without closing it.
    /// Returns its display name, or `None` if it was not a member.
    pub fn leave(&mut self, conn: ConnectionId) -> Option<String> {
        match self.entries.get_mut(&conn) {
            Some(entry) if !entry.left => {
                entry.left = true;
                Some(std::mem::take(&mut entry.name))
            }
            _ => None,
        }
    }

    /// Drop a connection entirely. Dropping the sender closes its writer.
    /// Returns the display name if the connection was still a member.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<String> {
        self.entries
            .remove(&conn)
            .filter(|entry| !entry.left)
            .map(|entry| entry.name)
    }

    /// Whether the connection's socket is still held, member or not.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.entries.contains_key(&conn)
    }

    pub fn is_member(&self, conn: ConnectionId) -> bool {
        self.entries.get(&conn).is_some_and(|entry| !entry.left)
    }

    pub fn name(&self, conn: ConnectionId) -> Option<&str> {
        self.entries.get(&conn).map(|entry| entry.name.as_str())
    }

    /// Connections held, including those that left.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members().count()
    }

    fn members(&self) -> impl Iterator<Item = (&ConnectionId, &Entry)> {
        self.entries.iter().filter(|(_, entry)| !entry.left)
    }

    /// Non-empty display names of members, sorted ascending (byte order),
    /// duplicates kept.
    pub fn user_list(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .members()
            .filter(|(_, entry)| !entry.name.is_empty())
            .map(|(_, entry)| entry.name.clone())
            .collect();
        users.sort();
        users
    }

    /// Queue `notification` on every member. Connections whose queue is
    /// closed are removed; the rest still get the notification.
    pub fn send_all(&mut self, notification: &OutboundNotification) -> FanOut {
        let mut fan_out = FanOut::default();
        for (conn, entry) in self.members() {
            if entry.sender.send(notification.clone()).is_ok() {
                fan_out.delivered += 1;
            } else {
                fan_out.dropped.push(*conn);
            }
        }
        for conn in &fan_out.dropped {
            if let Some(entry) = self.entries.remove(conn) {
                fan_out.list_changed |= !entry.name.is_empty();
            }
        }
        fan_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerAction;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::from(id)
    }

    #[test]
    fn test_insert_starts_anonymous() {
        let mut registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx);
        assert!(registry.contains(conn(1)));
        assert_eq!(registry.name(conn(1)), Some(""));
        assert!(registry.user_list().is_empty());
    }

    #[test]
    fn test_user_list_sorted_with_duplicates() {
        let mut registry = Registry::new();
        let mut receivers = Vec::new();
        for (id, name) in [(1, "bob"), (2, "alice"), (3, "alice"), (4, "")] {
            let (tx, rx) = mpsc::unbounded_channel();
            receivers.push(rx);
            registry.insert(conn(id), tx);
            registry.set_name(conn(id), name.to_string());
        }
        assert_eq!(registry.user_list(), vec!["alice", "alice", "bob"]);
    }

    #[test]
    fn test_user_list_is_case_sensitive() {
        let mut registry = Registry::new();
        let mut receivers = Vec::new();
        for (id, name) in [(1, "bob"), (2, "Zed"), (3, "alice")] {
            let (tx, rx) = mpsc::unbounded_channel();
            receivers.push(rx);
            registry.insert(conn(id), tx);
            registry.set_name(conn(id), name.to_string());
        }
        assert_eq!(registry.user_list(), vec!["Zed", "alice", "bob"]);
    }

    #[test]
    fn test_set_name_on_unknown_connection() {
        let mut registry = Registry::new();
        assert!(!registry.set_name(conn(9), "ghost".into()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_only_touches_one_entry() {
        let mut registry = Registry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx1);
        registry.insert(conn(2), tx2);
        registry.set_name(conn(1), "alice".into());
        registry.set_name(conn(2), "alice".into());

        assert_eq!(registry.remove(conn(1)), Some("alice".to_string()));
        assert!(!registry.contains(conn(1)));
        assert!(registry.contains(conn(2)));
        assert_eq!(registry.user_list(), vec!["alice"]);
        assert_eq!(registry.remove(conn(1)), None);
    }

    #[test]
    fn test_send_all_drops_closed_queues() {
        let mut registry = Registry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx1);
        registry.insert(conn(2), tx2);
        registry.insert(conn(3), tx3);
        drop(rx2);

        let fan_out = registry.send_all(&OutboundNotification::chat("bob", "hi", vec![]));
        assert_eq!(fan_out.delivered, 2);
        assert_eq!(fan_out.dropped, vec![conn(2)]);
        assert!(!fan_out.list_changed);
        assert!(!registry.contains(conn(2)));
        assert_eq!(registry.len(), 2);

        assert_eq!(rx1.try_recv().unwrap().message, "bob: hi");
        assert_eq!(rx3.try_recv().unwrap().action, ServerAction::Broadcast);
    }

    #[test]
    fn test_remove_closes_queue() {
        let mut registry = Registry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx);
        registry.remove(conn(1));
        assert!(rx.try_recv().is_err());
        assert!(rx.is_closed());
    }

    #[test]
    fn test_leave_keeps_socket_but_hides_member() {
        let mut registry = Registry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx1);
        registry.insert(conn(2), tx2);
        registry.set_name(conn(1), "alice".into());
        registry.set_name(conn(2), "bob".into());

        assert_eq!(registry.leave(conn(1)), Some("alice".to_string()));
        assert_eq!(registry.leave(conn(1)), None);
        assert!(registry.contains(conn(1)));
        assert!(!registry.is_member(conn(1)));
        assert_eq!(registry.user_list(), vec!["bob"]);
        assert_eq!(registry.member_count(), 1);

        let fan_out = registry.send_all(&OutboundNotification::chat("bob", "hi", vec![]));
        assert_eq!(fan_out.delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert!(!rx1.is_closed());
        assert_eq!(rx2.try_recv().unwrap().message, "bob: hi");
    }

    #[test]
    fn test_identify_after_leave_rejoins() {
        let mut registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx);
        registry.set_name(conn(1), "alice".into());
        registry.leave(conn(1));

        assert!(registry.set_name(conn(1), "alicia".into()));
        assert!(registry.is_member(conn(1)));
        assert_eq!(registry.user_list(), vec!["alicia"]);
    }

    #[test]
    fn test_remove_after_leave_reports_no_member() {
        let mut registry = Registry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx);
        registry.set_name(conn(1), "alice".into());
        registry.leave(conn(1));

        assert_eq!(registry.remove(conn(1)), None);
        assert!(registry.is_empty());
        assert!(rx.is_closed());
    }

    #[test]
    fn test_send_all_flags_named_drops() {
        let mut registry = Registry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        registry.insert(conn(1), tx1);
        registry.insert(conn(2), tx2);
        registry.set_name(conn(2), "carol".into());
        drop(rx2);

        let fan_out = registry.send_all(&OutboundNotification::user_list(vec![]));
        assert_eq!(fan_out.dropped, vec![conn(2)]);
        assert!(fan_out.list_changed);
        assert!(registry.user_list().is_empty());
    }
}
