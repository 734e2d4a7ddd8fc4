//! Live change feed over database tables.
//!
//! The feed is an in-process hub: a websocket task (see [`socket`]) publishes
//! row-change events into it, and services subscribe with a table name, a set
//! of change kinds and an optional column filter. Tests publish synthetic
//! events into the same hub. Consumer tasks are cancelled when their
//! [`WatchGuard`] drops, so no listener outlives its owner.

mod socket;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub use socket::{ConnectionState, SocketOptions, SocketTask};

/// Kind of row change, as delivered by the backend's change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

/// One row change on one table.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// The row after the change (empty for deletes on some configurations)
    pub row: serde_json::Value,
    /// The row before the change, when the backend sends it
    pub old: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// Convenience constructor for inserts, used heavily in tests.
    pub fn insert(table: &str, row: serde_json::Value) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            row,
            old: None,
        }
    }

    /// Read a string column from the changed row.
    pub fn column(&self, name: &str) -> Option<&str> {
        self.row.get(name).and_then(|v| v.as_str())
    }
}

/// Column-equality scoping for a subscription.
#[derive(Debug, Clone)]
pub enum ChangeFilter {
    /// Every change on the table
    Any,
    /// Only changes whose row has `column == value`
    Eq(String, String),
}

impl ChangeFilter {
    fn matches(&self, event: &ChangeEvent) -> bool {
        match self {
            ChangeFilter::Any => true,
            ChangeFilter::Eq(column, value) => event.column(column) == Some(value.as_str()),
        }
    }
}

/// In-process hub distributing change events to subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Push an event to every live subscriber. Events published with no
    /// subscribers are dropped, matching the at-most-once delivery of the
    /// upstream feed.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to changes on `table`, restricted to `kinds` and `filter`.
    pub fn subscribe(&self, table: &str, kinds: &[ChangeKind], filter: ChangeFilter) -> ChangeStream {
        ChangeStream {
            rx: self.sender.subscribe(),
            table: table.to_string(),
            kinds: kinds.to_vec(),
            filter,
        }
    }

    pub(crate) fn sender(&self) -> broadcast::Sender<ChangeEvent> {
        self.sender.clone()
    }
}

/// Stream of change events matching one subscription.
pub struct ChangeStream {
    rx: broadcast::Receiver<ChangeEvent>,
    table: String,
    kinds: Vec<ChangeKind>,
    filter: ChangeFilter,
}

impl ChangeStream {
    /// Wait for the next matching event. Returns `None` once the feed is
    /// gone. A lagged receiver skips to the newest events rather than
    /// erroring; the coarse refetch policy upstream tolerates missed events.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.table == self.table
                        && self.kinds.contains(&event.kind)
                        && self.filter.matches(&event)
                    {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, table = %self.table, "change stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Handle on a background watch task. Dropping the guard aborts the task.
pub struct WatchGuard {
    handle: JoinHandle<()>,
}

impl WatchGuard {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn stream_sees_only_its_table_and_kinds() {
        let feed = ChangeFeed::new();
        let mut stream = feed.subscribe("items", &[ChangeKind::Insert], ChangeFilter::Any);

        feed.publish(ChangeEvent::insert("chats", json!({"id": "c1"})));
        feed.publish(ChangeEvent {
            table: "items".into(),
            kind: ChangeKind::Update,
            row: json!({"id": "i0"}),
            old: None,
        });
        feed.publish(ChangeEvent::insert("items", json!({"id": "i1"})));

        let event = stream.next().await.unwrap();
        assert_eq!(event.column("id"), Some("i1"));
    }

    #[tokio::test]
    async fn eq_filter_scopes_by_column() {
        let feed = ChangeFeed::new();
        let mut stream = feed.subscribe(
            "messages",
            &[ChangeKind::Insert],
            ChangeFilter::Eq("chat_id".into(), "c7".into()),
        );

        feed.publish(ChangeEvent::insert("messages", json!({"chat_id": "c1"})));
        feed.publish(ChangeEvent::insert("messages", json!({"chat_id": "c7"})));

        let event = stream.next().await.unwrap();
        assert_eq!(event.column("chat_id"), Some("c7"));
    }

    #[tokio::test]
    async fn stream_ends_when_feed_drops() {
        let feed = ChangeFeed::new();
        let mut stream = feed.subscribe("items", &[ChangeKind::Insert], ChangeFilter::Any);
        drop(feed);
        assert!(stream.next().await.is_none());
    }
}
