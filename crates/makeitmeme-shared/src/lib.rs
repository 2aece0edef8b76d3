//! Domain types, error taxonomy and backend capability traits shared by the
//! Make It Meme client and its in-process backend.

pub mod backend;
pub mod constants;
pub mod error;
pub mod path;
pub mod protocol;
pub mod types;

pub use backend::{
    AuthEvent, AuthProvider, AuthSink, FileStorage, ListenerId, RemoteStore, Snapshot,
    StoreEvent, StoreSink,
};
pub use error::{
    AuthError, DecodeError, PathError, RemoteReadError, RemoteWriteError, UploadError,
};
pub use path::StorePath;
pub use protocol::{ChatMessage, MemeRecord, Record};
pub use types::{Identity, Screen, UserId};
