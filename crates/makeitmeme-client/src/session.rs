//! Current identity, mirrored from the auth provider's notifications.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use makeitmeme_shared::{AuthEvent, AuthProvider, AuthSink, Identity};

use crate::subscription::AuthListenerGuard;

/// Pass-through of the provider's auth state.
///
/// Registers one listener while mounted. Each notification replaces the
/// identity wholesale; observers follow it through a `watch` channel.
pub struct SessionController<A: AuthProvider> {
    auth: Arc<A>,
    listener: Option<AuthListenerGuard<A>>,
    identity: watch::Sender<Option<Identity>>,
}

impl<A: AuthProvider> SessionController<A> {
    pub fn new(auth: Arc<A>) -> Self {
        let (identity, _) = watch::channel(auth.current_identity());
        Self {
            auth,
            listener: None,
            identity,
        }
    }

    pub fn auth(&self) -> &Arc<A> {
        &self.auth
    }

    /// Register the auth listener. Does nothing if already mounted.
    pub fn mount(&mut self, sink: AuthSink) {
        if self.listener.is_some() {
            return;
        }
        let guard = AuthListenerGuard::register(self.auth.clone(), sink);
        debug!(listener = %guard.id(), "Session listener registered");
        self.listener = Some(guard);
    }

    pub fn unmount(&mut self) {
        if let Some(guard) = self.listener.take() {
            debug!(listener = %guard.id(), "Session listener removed");
            guard.close();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.listener.is_some()
    }

    /// Apply a provider notification. Returns `true` if the identity changed.
    /// Notifications for any other listener are ignored.
    pub fn apply(&mut self, event: AuthEvent) -> bool {
        let ours = self
            .listener
            .as_ref()
            .is_some_and(|guard| guard.id() == event.listener);
        if !ours {
            debug!(listener = %event.listener, "Ignoring stale auth notification");
            return false;
        }

        let previous = self.identity.send_replace(event.identity);
        let current = self.identity.borrow();
        let changed = previous != *current;
        if changed {
            match current.as_ref() {
                Some(identity) => info!(uid = %identity.uid, "Session started"),
                None => info!("Session ended"),
            }
        }
        changed
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.borrow().is_some()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }
}

impl<A: AuthProvider> Drop for SessionController<A> {
    fn drop(&mut self) {
        self.unmount();
    }
}
