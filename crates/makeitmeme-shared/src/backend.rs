//! Capability interfaces of the hosted backend.
//!
//! The client never talks to a concrete service. It is handed an
//! [`AuthProvider`], a [`RemoteStore`] and a [`FileStorage`] at construction
//! time. Listener callbacks are delivered as events on unbounded tokio
//! channels so that the receiving side applies them one at a time on its own
//! task.

use std::future::Future;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{AuthError, DecodeError, RemoteReadError, RemoteWriteError, UploadError};
use crate::path::StorePath;
use crate::types::Identity;

/// Handle returned by listener registration, consumed by removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Auth state change. `identity` is `None` once signed out.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub listener: ListenerId,
    pub identity: Option<Identity>,
}

/// Value listener notification: a full snapshot of the listened path, or
/// the error that cancelled the listener.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    pub listener: ListenerId,
    pub outcome: Result<Snapshot, RemoteReadError>,
}

pub type AuthSink = mpsc::UnboundedSender<AuthEvent>;
pub type StoreSink = mpsc::UnboundedSender<StoreEvent>;

/// Immutable view of the value stored at a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: StorePath,
    value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: StorePath, value: Option<Value>) -> Self {
        let value = value.filter(|v| !v.is_null());
        Self { path, value }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Children in store order (ascending key). Push keys sort
    /// chronologically, so this is insertion order for pushed records.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.value
            .as_ref()
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
    }

    pub fn child_count(&self) -> usize {
        self.value
            .as_ref()
            .and_then(Value::as_object)
            .map_or(0, |map| map.len())
    }

    /// Decode the whole value. `Ok(None)` when nothing is stored here.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, DecodeError> {
        match &self.value {
            None => Ok(None),
            Some(value) => decode_value(&self.path.to_string(), value).map(Some),
        }
    }

    /// Decode one child value.
    pub fn decode_child<T: DeserializeOwned>(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<T, DecodeError> {
        decode_value(&format!("{}/{key}", self.path), value)
    }
}

fn decode_value<T: DeserializeOwned>(path: &str, value: &Value) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|e| DecodeError {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Email/password auth provider with state-change listeners.
pub trait AuthProvider: Send + Sync + 'static {
    fn current_identity(&self) -> Option<Identity>;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = ()> + Send;

    /// Register a listener. The current state is delivered right away.
    fn add_auth_listener(&self, sink: AuthSink) -> ListenerId;

    /// Returns `false` if the handle was unknown.
    fn remove_auth_listener(&self, id: ListenerId) -> bool;
}

/// Realtime key-path store.
pub trait RemoteStore: Send + Sync + 'static {
    /// Register a value listener on `path`. The current value is delivered
    /// right away, then a fresh snapshot after every write that touches it.
    fn subscribe_value(&self, path: &StorePath, sink: StoreSink) -> ListenerId;

    /// Returns `false` if the handle was unknown.
    fn unsubscribe(&self, id: ListenerId) -> bool;

    /// Append `value` under a server generated key and return that key.
    fn push(
        &self,
        path: &StorePath,
        value: Value,
    ) -> impl Future<Output = Result<String, RemoteWriteError>> + Send;

    /// Replace the value at `path`. `Value::Null` deletes it.
    fn set(
        &self,
        path: &StorePath,
        value: Value,
    ) -> impl Future<Output = Result<(), RemoteWriteError>> + Send;
}

/// Blob storage for meme images.
pub trait FileStorage: Send + Sync + 'static {
    /// Store `data` at `path` and return its download URL.
    fn upload(
        &self,
        path: &str,
        data: Bytes,
    ) -> impl Future<Output = Result<String, UploadError>> + Send;
}
