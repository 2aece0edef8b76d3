//! Mirror of a single remote value with write-through replace.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use makeitmeme_shared::constants::{LOADING_LABEL, NO_MESSAGE_LABEL, UNKNOWN_VALUE_LABEL};
use makeitmeme_shared::{ListenerId, RemoteStore, RemoteWriteError, StoreEvent, StorePath, StoreSink};

use crate::error::{ClientError, Result};
use crate::subscription::ScopedSubscription;
use crate::sync::{write_with_timeout, ViewError};

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarState<T> {
    /// No notification received yet.
    Loading,
    /// The path holds no value.
    Absent,
    Present(T),
    /// The value could not be read or decoded.
    Unknown,
}

pub struct ScalarView<S: RemoteStore, T> {
    /// Store the value lives in
    store: Arc<S>,
    /// Slot holding the value
    path: StorePath,
    /// Value listener, present while mounted
    subscription: Option<ScopedSubscription<S>>,
    /// Latest notified value
    state: ScalarState<T>,
    /// Input buffer, cleared only by a successful write
    draft: String,
    /// A write started and its outcome not yet reported
    saving: bool,
    /// Shown as a banner until superseded
    last_error: Option<ViewError>,
    /// Upper bound on a write, `None` waits forever
    write_timeout: Option<Duration>,
}

impl<S, T> ScalarView<S, T>
where
    S: RemoteStore,
    T: Serialize + DeserializeOwned + Clone + Debug + Send + 'static,
{
    pub fn new(store: Arc<S>, path: StorePath, write_timeout: Option<Duration>) -> Self {
        Self {
            store,
            path,
            subscription: None,
            state: ScalarState::Loading,
            draft: String::new(),
            saving: false,
            last_error: None,
            write_timeout,
        }
    }

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

    pub fn apply(&mut self, event: StoreEvent) -> bool {
        if !self.owns(event.listener) {
            return false;
        }
        match event.outcome {
            Ok(snapshot) => match snapshot.decode::<T>() {
                Ok(Some(value)) => {
                    debug!(path = %self.path, "Scalar value received");
                    self.state = ScalarState::Present(value);
                    self.clear_read_error();
                }
                Ok(None) => {
                    debug!(path = %self.path, "Scalar slot is empty");
                    self.state = ScalarState::Absent;
                    self.clear_read_error();
                }
                Err(e) => {
                    warn!(error = %e, "Scalar value undecodable");
                    self.state = ScalarState::Unknown;
                    self.last_error = Some(ViewError::Decode(e));
                }
            },
            Err(e) => {
                warn!(path = %self.path, error = %e, "Scalar read failed");
                self.state = ScalarState::Unknown;
                self.last_error = Some(ViewError::Read(e));
            }
        }
        true
    }

    fn clear_read_error(&mut self) {
        if matches!(
            self.last_error,
            Some(ViewError::Read(_) | ViewError::Decode(_))
        ) {
            self.last_error = None;
        }
    }

    /// Start replacing the remote value and return the write to run.
    ///
    /// The new value shows up through the next notification, not here.
    pub fn start_write(
        &mut self,
        value: T,
    ) -> Result<impl Future<Output = std::result::Result<(), RemoteWriteError>> + Send + 'static> {
        if self.saving {
            warn!(path = %self.path, "Write refused, previous one still saving");
            return Err(ClientError::WriteInFlight);
        }
        let encoded = serde_json::to_value(&value)?;

        self.saving = true;
        let store = self.store.clone();
        let path = self.path.clone();
        let timeout = self.write_timeout;
        Ok(async move { write_with_timeout(timeout, &path, store.set(&path, encoded)).await })
    }

    /// Record the outcome of a write. Failures stay in the view as a
    /// banner; returns `true` on success.
    pub fn finish_write(&mut self, outcome: std::result::Result<(), RemoteWriteError>) -> bool {
        self.saving = false;
        match outcome {
            Ok(()) => {
                info!(path = %self.path, "Value saved");
                self.draft.clear();
                if matches!(self.last_error, Some(ViewError::Write(_))) {
                    self.last_error = None;
                }
                true
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "Save failed");
                self.last_error = Some(ViewError::Write(e));
                false
            }
        }
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.subscription.as_ref().map(ScopedSubscription::id)
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn state(&self) -> &ScalarState<T> {
        &self.state
    }

    pub fn value(&self) -> Option<&T> {
        match &self.state {
            ScalarState::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn saving(&self) -> bool {
        self.saving
    }

    pub fn last_error(&self) -> Option<&ViewError> {
        self.last_error.as_ref()
    }

    pub fn error_banner(&self) -> Option<String> {
        self.last_error.as_ref().map(ViewError::banner)
    }
}

impl<S, T> ScalarView<S, T>
where
    S: RemoteStore,
    T: Serialize + DeserializeOwned + Clone + Debug + Display + Send + 'static,
{
    /// Text shown for the mirrored value.
    pub fn display(&self) -> String {
        match &self.state {
            ScalarState::Loading => LOADING_LABEL.to_string(),
            ScalarState::Absent => NO_MESSAGE_LABEL.to_string(),
            ScalarState::Present(value) => value.to_string(),
            ScalarState::Unknown => UNKNOWN_VALUE_LABEL.to_string(),
        }
    }
}

impl<S: RemoteStore> ScalarView<S, String> {
    /// Start writing the input buffer. A blank buffer is rejected locally.
    pub fn start_submit(
        &mut self,
    ) -> Result<impl Future<Output = std::result::Result<(), RemoteWriteError>> + Send + 'static> {
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return Err(ClientError::InputRequired("Message"));
        }
        self.start_write(text)
    }
}
