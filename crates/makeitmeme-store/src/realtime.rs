//! In-process realtime store.
//!
//! Holds one JSON tree behind a mutex. Every registered value listener gets
//! the current value of its path on registration and a fresh snapshot after
//! each write that overlaps its path. Notifications are queued on the
//! listener's channel while the lock is held, so every listener observes
//! writes in the order they were applied.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use makeitmeme_shared::{
    ListenerId, RemoteReadError, RemoteStore, RemoteWriteError, Snapshot, StoreEvent, StorePath,
    StoreSink,
};

use crate::push_id::PushIdGenerator;
use crate::tree;

struct Listener {
    path: StorePath,
    sink: StoreSink,
}

struct StoreInner {
    root: Value,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener: u64,
    push_ids: PushIdGenerator,
    write_failure: Option<String>,
    stall_writes: bool,
    subscribed_total: u64,
    unsubscribed_total: u64,
}

impl StoreInner {
    fn snapshot(&self, path: &StorePath) -> Snapshot {
        Snapshot::new(path.clone(), tree::get(&self.root, path).cloned())
    }

    fn apply(&mut self, path: &StorePath, value: Value) {
        tree::set(&mut self.root, path, value);

        for (id, listener) in &self.listeners {
            if !listener.path.overlaps(path) {
                continue;
            }
            let event = StoreEvent {
                listener: *id,
                outcome: Ok(self.snapshot(&listener.path)),
            };
            if listener.sink.send(event).is_err() {
                debug!(listener = %id, path = %listener.path, "Listener channel closed");
            }
        }
    }

    fn check_writable(&self, path: &StorePath) -> Result<(), RemoteWriteError> {
        match &self.write_failure {
            Some(reason) => Err(RemoteWriteError::Rejected {
                path: path.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Shared, thread-safe realtime store.
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                root: Value::Object(Map::new()),
                listeners: BTreeMap::new(),
                next_listener: 1,
                push_ids: PushIdGenerator::new(),
                write_failure: None,
                stall_writes: false,
                subscribed_total: 0,
                unsubscribed_total: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current value at `path`, if any.
    pub fn value_at(&self, path: &StorePath) -> Option<Value> {
        tree::get(&self.lock().root, path).cloned()
    }

    /// Write without going through the async API. Listeners are notified.
    pub fn put(&self, path: &StorePath, value: Value) {
        self.lock().apply(path, value);
    }

    /// Reject every following write with `reason`, or accept them again.
    pub fn fail_writes(&self, reason: Option<&str>) {
        self.lock().write_failure = reason.map(str::to_string);
    }

    /// Make every following write hang forever, or complete normally again.
    pub fn stall_writes(&self, stall: bool) {
        self.lock().stall_writes = stall;
    }

    /// Cancel every listener overlapping `path` with a read error, the way a
    /// permission change on the backend does. Cancelled listeners are removed.
    pub fn cancel_listeners(&self, path: &StorePath, reason: &str) -> usize {
        let mut inner = self.lock();
        let cancelled: Vec<ListenerId> = inner
            .listeners
            .iter()
            .filter(|(_, l)| l.path.overlaps(path))
            .map(|(id, _)| *id)
            .collect();

        for id in &cancelled {
            if let Some(listener) = inner.listeners.remove(id) {
                let event = StoreEvent {
                    listener: *id,
                    outcome: Err(RemoteReadError {
                        path: listener.path.to_string(),
                        reason: reason.to_string(),
                    }),
                };
                let _ = listener.sink.send(event);
                warn!(listener = %id, path = %listener.path, reason, "Listener cancelled");
            }
        }
        cancelled.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn listener_count_at(&self, path: &StorePath) -> usize {
        self.lock()
            .listeners
            .values()
            .filter(|l| &l.path == path)
            .count()
    }

    /// Totals of accepted `subscribe_value` and `unsubscribe` calls.
    pub fn listener_totals(&self) -> (u64, u64) {
        let inner = self.lock();
        (inner.subscribed_total, inner.unsubscribed_total)
    }

    async fn wait_if_stalled(&self) {
        let stalled = self.lock().stall_writes;
        if stalled {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryStore {
    fn subscribe_value(&self, path: &StorePath, sink: StoreSink) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.subscribed_total += 1;

        let initial = StoreEvent {
            listener: id,
            outcome: Ok(inner.snapshot(path)),
        };
        let _ = sink.send(initial);

        inner.listeners.insert(
            id,
            Listener {
                path: path.clone(),
                sink,
            },
        );
        debug!(listener = %id, path = %path, "Value listener added");
        id
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        match inner.listeners.remove(&id) {
            Some(listener) => {
                inner.unsubscribed_total += 1;
                debug!(listener = %id, path = %listener.path, "Value listener removed");
                true
            }
            None => false,
        }
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, RemoteWriteError> {
        self.wait_if_stalled().await;

        let mut inner = self.lock();
        inner.check_writable(path)?;
        let key = inner.push_ids.next_id(Utc::now().timestamp_millis());
        let child = path.child(&key).map_err(|e| RemoteWriteError::Rejected {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        inner.apply(&child, value);
        info!(path = %child, "Pushed child");
        Ok(key)
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), RemoteWriteError> {
        self.wait_if_stalled().await;

        let mut inner = self.lock();
        inner.check_writable(path)?;
        inner.apply(path, value);
        info!(path = %path, "Value set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    fn snapshot_of(event: StoreEvent) -> Snapshot {
        event.outcome.expect("snapshot")
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_value() {
        let store = MemoryStore::new();
        store.put(&path("users/u1/message"), json!("hello"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = store.subscribe_value(&path("users/u1/message"), tx);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.listener, id);
        assert_eq!(
            snapshot_of(event).decode::<String>().unwrap().as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn test_empty_path_snapshot_is_absent() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_value(&path("users/u1/message"), tx);

        assert!(!snapshot_of(rx.try_recv().unwrap()).exists());
    }

    #[tokio::test]
    async fn test_push_notifies_with_full_snapshot_in_order() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_value(&path("chat"), tx);
        let _ = rx.try_recv();

        let k1 = store.push(&path("chat"), json!("one")).await.unwrap();
        let k2 = store.push(&path("chat"), json!("two")).await.unwrap();
        assert!(k1 < k2);

        let _first = rx.try_recv().unwrap();
        let latest = snapshot_of(rx.try_recv().unwrap());
        let values: Vec<&Value> = latest.children().map(|(_, v)| v).collect();
        assert_eq!(values, [&json!("one"), &json!("two")]);
    }

    #[tokio::test]
    async fn test_unrelated_write_does_not_notify() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_value(&path("chat"), tx);
        let _ = rx.try_recv();

        store.set(&path("memes/u1"), json!({"a": 1})).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_parent_listener_sees_child_write() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_value(&path("users"), tx);
        let _ = rx.try_recv();

        store.set(&path("users/u1/message"), json!("x")).await.unwrap();
        let snap = snapshot_of(rx.try_recv().unwrap());
        assert_eq!(snap.value(), Some(&json!({ "u1": { "message": "x" } })));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_tree_untouched() {
        let store = MemoryStore::new();
        store.fail_writes(Some("permission denied"));

        let err = store.set(&path("a"), json!(1)).await.unwrap_err();
        assert!(matches!(err, RemoteWriteError::Rejected { .. }));
        assert_eq!(store.value_at(&path("a")), None);

        store.fail_writes(None);
        store.set(&path("a"), json!(1)).await.unwrap();
        assert_eq!(store.value_at(&path("a")), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_unsubscribe_once() {
        let store = MemoryStore::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = store.subscribe_value(&path("chat"), tx);

        assert_eq!(store.listener_count(), 1);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        assert_eq!(store.listener_count(), 0);
        assert_eq!(store.listener_totals(), (1, 1));
    }

    #[tokio::test]
    async fn test_cancel_listeners_sends_error_and_removes() {
        let store = MemoryStore::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        store.subscribe_value(&path("chat"), tx);
        let _ = rx.try_recv();

        assert_eq!(store.cancel_listeners(&path("chat"), "permission denied"), 1);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.outcome.unwrap_err().reason, "permission denied");
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_stalled_write_never_completes() {
        let store = MemoryStore::new();
        store.stall_writes(true);

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            store.set(&path("a"), json!(1)),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(store.value_at(&path("a")), None);
    }
}
