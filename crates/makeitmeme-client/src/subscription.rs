//! Scoped listener registrations.
//!
//! A guard is the only way the client registers a listener. The listener is
//! removed exactly once: either through an explicit `close()` or when the
//! guard is dropped, whichever happens first.

use std::sync::Arc;

use tracing::debug;

use makeitmeme_shared::{AuthProvider, AuthSink, ListenerId, RemoteStore, StorePath, StoreSink};

/// A value listener on one store path, tied to the owning view's lifetime.
pub struct ScopedSubscription<S: RemoteStore> {
    store: Arc<S>,
    path: StorePath,
    id: ListenerId,
    active: bool,
}

impl<S: RemoteStore> ScopedSubscription<S> {
    pub fn open(store: Arc<S>, path: StorePath, sink: StoreSink) -> Self {
        let id = store.subscribe_value(&path, sink);
        debug!(listener = %id, path = %path, "Subscribed");
        Self {
            store,
            path,
            id,
            active: true,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn owns(&self, id: ListenerId) -> bool {
        self.active && self.id == id
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if self.store.unsubscribe(self.id) {
            debug!(listener = %self.id, path = %self.path, "Unsubscribed");
        } else {
            // Already dropped by the store, e.g. after a cancelled read.
            debug!(listener = %self.id, path = %self.path, "Listener was already gone");
        }
    }
}

impl<S: RemoteStore> Drop for ScopedSubscription<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// An auth state listener, tied to the session controller's lifetime.
pub struct AuthListenerGuard<A: AuthProvider> {
    auth: Arc<A>,
    id: ListenerId,
    active: bool,
}

impl<A: AuthProvider> AuthListenerGuard<A> {
    pub fn register(auth: Arc<A>, sink: AuthSink) -> Self {
        let id = auth.add_auth_listener(sink);
        Self {
            auth,
            id,
            active: true,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            self.auth.remove_auth_listener(self.id);
        }
    }
}

impl<A: AuthProvider> Drop for AuthListenerGuard<A> {
    fn drop(&mut self) {
        self.release();
    }
}
