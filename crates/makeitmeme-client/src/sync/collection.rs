//! Mirror of an append-only remote collection.
//!
//! Each snapshot replaces the whole mirror with its decodable children, in
//! store order. Children that fail to decode are skipped. Appends go into
//! the mirror right away as pending entries and are then pushed; the next
//! snapshot supersedes them without any correlation.
//!
//! The push itself runs outside the view: [`CollectionView::start_append`]
//! hands back an owned future and the caller reports its outcome through
//! [`CollectionView::finish_append`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use makeitmeme_shared::{
    ListenerId, Record, RemoteStore, RemoteWriteError, Snapshot, StoreEvent, StorePath, StoreSink,
};

use crate::error::{ClientError, Result};
use crate::subscription::ScopedSubscription;
use crate::sync::{write_with_timeout, ViewError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Child of the latest snapshot, under its server generated key.
    Confirmed { key: String },
    /// Appended locally, not yet seen in a snapshot.
    Pending,
}

#[derive(Debug, Clone)]
pub struct MirrorEntry<R> {
    pub status: EntryStatus,
    pub record: R,
}

impl<R> MirrorEntry<R> {
    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }
}

pub struct CollectionView<S: RemoteStore, R: Record> {
    /// Store the collection lives in
    store: Arc<S>,
    /// Collection root
    path: StorePath,
    /// Value listener, present while mounted
    subscription: Option<ScopedSubscription<S>>,
    /// Latest snapshot plus local appends, in display order
    mirror: Vec<MirrorEntry<R>>,
    /// Set by the first snapshot
    loaded: bool,
    /// Undecodable children in the latest snapshot
    skipped: usize,
    /// A push started and its outcome not yet reported
    in_flight: bool,
    /// Shown as a banner until superseded
    last_error: Option<ViewError>,
    /// Upper bound on a push, `None` waits forever
    write_timeout: Option<Duration>,
}

impl<S: RemoteStore, R: Record> CollectionView<S, R> {
    pub fn new(store: Arc<S>, path: StorePath, write_timeout: Option<Duration>) -> Self {
        Self {
            store,
            path,
            subscription: None,
            mirror: Vec::new(),
            loaded: false,
            skipped: 0,
            in_flight: false,
            last_error: None,
            write_timeout,
        }
    }

    /// Start listening. An existing subscription is closed first.
    pub fn subscribe(&mut self, sink: StoreSink) {
        if let Some(old) = self.subscription.take() {
            old.close();
        }
        self.subscription = Some(ScopedSubscription::open(
            self.store.clone(),
            self.path.clone(),
            sink,
        ));
    }

    /// Stop listening. Returns `false` if there was nothing to release.
    pub fn unsubscribe(&mut self) -> bool {
        match self.subscription.take() {
            Some(sub) => {
                sub.close();
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn owns(&self, listener: ListenerId) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|sub| sub.owns(listener))
    }

    /// Apply a notification. Returns `false` if it belongs to another listener.
    pub fn apply(&mut self, event: StoreEvent) -> bool {
        if !self.owns(event.listener) {
            return false;
        }
        match event.outcome {
            Ok(snapshot) => self.replace(&snapshot),
            Err(e) => {
                // Keep showing what we had.
                warn!(path = %self.path, error = %e, "Collection read failed");
                self.last_error = Some(ViewError::Read(e));
            }
        }
        true
    }

    fn replace(&mut self, snapshot: &Snapshot) {
        let mut mirror = Vec::with_capacity(snapshot.child_count());
        let mut skipped = 0;

        for (key, value) in snapshot.children() {
            match snapshot.decode_child::<R>(key, value) {
                Ok(record) => mirror.push(MirrorEntry {
                    status: EntryStatus::Confirmed {
                        key: key.to_string(),
                    },
                    record,
                }),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable child");
                    skipped += 1;
                }
            }
        }

        debug!(
            path = %self.path,
            records = mirror.len(),
            skipped,
            "Collection snapshot applied"
        );
        self.mirror = mirror;
        self.skipped = skipped;
        self.loaded = true;
        if matches!(self.last_error, Some(ViewError::Read(_))) {
            self.last_error = None;
        }
    }

    /// Show `record` at the tail immediately and return the push to run.
    ///
    /// The view stays in flight until [`finish_append`](Self::finish_append)
    /// gets the push outcome.
    pub fn start_append(
        &mut self,
        record: R,
    ) -> Result<impl Future<Output = std::result::Result<String, RemoteWriteError>> + Send + 'static>
    {
        if self.in_flight {
            return Err(ClientError::WriteInFlight);
        }
        let value = serde_json::to_value(&record)?;

        self.mirror.push(MirrorEntry {
            status: EntryStatus::Pending,
            record,
        });
        self.in_flight = true;
        self.last_error = None;

        let store = self.store.clone();
        let path = self.path.clone();
        let timeout = self.write_timeout;
        Ok(async move { write_with_timeout(timeout, &path, store.push(&path, value)).await })
    }

    /// Record the outcome of a push started by [`start_append`](Self::start_append).
    ///
    /// A failed push leaves the pending entry in place.
    pub fn finish_append(
        &mut self,
        outcome: std::result::Result<String, RemoteWriteError>,
    ) -> Option<String> {
        self.in_flight = false;
        match outcome {
            Ok(key) => {
                info!(path = %self.path, key = %key, "Record pushed");
                Some(key)
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "Push failed");
                self.last_error = Some(ViewError::Write(e));
                None
            }
        }
    }

    /// Id of the open subscription, used to tag pushes started while mounted.
    pub fn listener(&self) -> Option<ListenerId> {
        self.subscription.as_ref().map(ScopedSubscription::id)
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn entries(&self) -> &[MirrorEntry<R>] {
        &self.mirror
    }

    pub fn records(&self) -> impl Iterator<Item = &R> + '_ {
        self.mirror.iter().map(|entry| &entry.record)
    }

    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// `true` once the first snapshot has arrived.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Children skipped in the latest snapshot.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&ViewError> {
        self.last_error.as_ref()
    }

    pub fn error_banner(&self) -> Option<String> {
        self.last_error.as_ref().map(ViewError::banner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use makeitmeme_shared::{ChatMessage, RemoteReadError, RemoteWriteError};
    use makeitmeme_store::MemoryStore;
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    type ChatView = CollectionView<MemoryStore, ChatMessage>;

    fn chat_path() -> StorePath {
        StorePath::parse("chat").unwrap()
    }

    fn mounted(store: &Arc<MemoryStore>) -> (ChatView, UnboundedReceiver<StoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut view = CollectionView::new(store.clone(), chat_path(), None);
        view.subscribe(tx);
        (view, rx)
    }

    fn drain(view: &mut ChatView, rx: &mut UnboundedReceiver<StoreEvent>) {
        while let Ok(event) = rx.try_recv() {
            view.apply(event);
        }
    }

    async fn append(view: &mut ChatView, text: &str) -> Result<Option<String>> {
        let push = view.start_append(ChatMessage::new("ana", text))?;
        let outcome = push.await;
        Ok(view.finish_append(outcome))
    }

    fn texts(view: &ChatView) -> Vec<String> {
        view.records().map(|m| m.text.clone()).collect()
    }

    fn message_json(text: &str) -> serde_json::Value {
        json!({ "author": "ana", "text": text, "createdAt": 1_700_000_000_000_i64 })
    }

    #[tokio::test]
    async fn test_initial_snapshot_loads_mirror() {
        let store = Arc::new(MemoryStore::new());
        store.put(&chat_path().child("k1").unwrap(), message_json("hello"));

        let (mut view, mut rx) = mounted(&store);
        assert!(!view.is_loaded());
        drain(&mut view, &mut rx);

        assert!(view.is_loaded());
        assert_eq!(texts(&view), ["hello"]);
        assert_eq!(
            view.entries()[0].status,
            EntryStatus::Confirmed { key: "k1".into() }
        );
    }

    #[tokio::test]
    async fn test_optimistic_append_visible_before_confirmation() {
        let store = Arc::new(MemoryStore::new());
        let (mut view, mut rx) = mounted(&store);
        drain(&mut view, &mut rx);

        assert!(append(&mut view, "first").await.unwrap().is_some());

        // The push notification is still queued: the mirror shows the
        // local copy at the tail.
        let last = view.entries().last().unwrap();
        assert!(last.is_pending());
        assert_eq!(last.record.text, "first");

        drain(&mut view, &mut rx);
        assert_eq!(texts(&view), ["first"]);
        assert!(!view.entries()[0].is_pending());
    }

    #[tokio::test]
    async fn test_snapshot_replaces_instead_of_merging() {
        let store = Arc::new(MemoryStore::new());
        store.put(&chat_path().child("a").unwrap(), message_json("old-1"));
        store.put(&chat_path().child("b").unwrap(), message_json("old-2"));

        let (mut view, mut rx) = mounted(&store);
        drain(&mut view, &mut rx);
        assert_eq!(view.len(), 2);

        store.put(
            &chat_path(),
            json!({ "c": message_json("new-1"), "d": message_json("new-2") }),
        );
        drain(&mut view, &mut rx);

        assert_eq!(texts(&view), ["new-1", "new-2"]);
    }

    #[tokio::test]
    async fn test_undecodable_child_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.put(
            &chat_path(),
            json!({
                "k1": message_json("one"),
                "k2": { "unexpected": true },
                "k3": message_json("three"),
            }),
        );

        let (mut view, mut rx) = mounted(&store);
        drain(&mut view, &mut rx);

        assert_eq!(texts(&view), ["one", "three"]);
        assert_eq!(view.skipped(), 1);
        assert!(view.last_error().is_none());
    }

    #[tokio::test]
    async fn test_read_error_keeps_mirror() {
        let store = Arc::new(MemoryStore::new());
        store.put(&chat_path().child("k1").unwrap(), message_json("kept"));
        let (mut view, mut rx) = mounted(&store);
        drain(&mut view, &mut rx);

        store.cancel_listeners(&chat_path(), "permission denied");
        drain(&mut view, &mut rx);

        assert_eq!(texts(&view), ["kept"]);
        assert!(matches!(view.last_error(), Some(ViewError::Read(_))));
        assert_eq!(
            view.error_banner().as_deref(),
            Some("Database read failed: permission denied")
        );
    }

    #[tokio::test]
    async fn test_failed_push_keeps_pending_entry() {
        let store = Arc::new(MemoryStore::new());
        let (mut view, mut rx) = mounted(&store);
        drain(&mut view, &mut rx);

        store.fail_writes(Some("quota exceeded"));
        assert_eq!(append(&mut view, "lost").await.unwrap(), None);

        assert!(matches!(
            view.last_error(),
            Some(ViewError::Write(RemoteWriteError::Rejected { .. }))
        ));
        assert!(!view.in_flight());
        assert_eq!(texts(&view), ["lost"]);
        assert!(view.entries()[0].is_pending());
        assert_eq!(view.error_banner().as_deref(), Some("Save failed: quota exceeded"));
    }

    #[tokio::test]
    async fn test_write_timeout_clears_in_flight() {
        let store = Arc::new(MemoryStore::new());
        store.stall_writes(true);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut view: ChatView =
            CollectionView::new(store.clone(), chat_path(), Some(Duration::from_millis(20)));
        view.subscribe(tx);

        assert_eq!(append(&mut view, "slow").await.unwrap(), None);
        assert!(matches!(
            view.last_error(),
            Some(ViewError::Write(RemoteWriteError::TimedOut { .. }))
        ));
        assert!(!view.in_flight());
    }

    #[tokio::test]
    async fn test_hung_write_blocks_duplicate_submission() {
        let store = Arc::new(MemoryStore::new());
        store.stall_writes(true);
        let (mut view, _rx) = mounted(&store);

        // No configured timeout: the push never reports back.
        let push = view.start_append(ChatMessage::new("ana", "stuck")).unwrap();
        let pending = tokio::spawn(push);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());
        assert!(view.in_flight());

        let again = view.start_append(ChatMessage::new("ana", "again"));
        assert!(matches!(again, Err(ClientError::WriteInFlight)));
        assert_eq!(view.len(), 1);
        pending.abort();
    }

    #[tokio::test]
    async fn test_push_runs_detached_from_view() {
        let store = Arc::new(MemoryStore::new());
        let (mut view, mut rx) = mounted(&store);
        drain(&mut view, &mut rx);

        let push = view.start_append(ChatMessage::new("ana", "later")).unwrap();
        let key = tokio::spawn(push).await.unwrap().unwrap();
        drain(&mut view, &mut rx);
        assert!(view.in_flight());

        assert_eq!(view.finish_append(Ok(key.clone())), Some(key.clone()));
        assert!(!view.in_flight());
        assert_eq!(view.entries()[0].status, EntryStatus::Confirmed { key });
    }

    #[tokio::test]
    async fn test_foreign_event_ignored() {
        let store = Arc::new(MemoryStore::new());
        let (mut view, _rx) = mounted(&store);
        let stray = StoreEvent {
            listener: ListenerId(4242),
            outcome: Err(RemoteReadError {
                path: "elsewhere".into(),
                reason: "nope".into(),
            }),
        };
        assert!(!view.apply(stray));
        assert!(view.last_error().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_once() {
        let store = Arc::new(MemoryStore::new());
        let (mut view, _rx) = mounted(&store);
        assert_eq!(store.listener_count_at(&chat_path()), 1);

        assert!(view.unsubscribe());
        assert!(!view.unsubscribe());
        drop(view);

        assert_eq!(store.listener_count(), 0);
        assert_eq!(store.listener_totals(), (1, 1));
    }

    #[tokio::test]
    async fn test_resubscribe_closes_previous_listener() {
        let store = Arc::new(MemoryStore::new());
        let (mut view, _rx) = mounted(&store);
        let (tx, _rx2) = mpsc::unbounded_channel();
        view.subscribe(tx);

        assert_eq!(store.listener_count(), 1);
        assert_eq!(store.listener_totals(), (2, 1));
    }
}
