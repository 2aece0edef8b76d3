//! Local mirrors of remote data.
//!
//! A view owns one scoped subscription while mounted and applies every
//! notification for it on the caller's task. Writes leave the view as owned
//! futures so the caller can run them on another task and report back.
//! Errors stay inside the view as a banner.

pub mod collection;
pub mod scalar;

use std::future::Future;
use std::time::Duration;

use makeitmeme_shared::{DecodeError, RemoteReadError, RemoteWriteError, StorePath};

pub use collection::{CollectionView, EntryStatus, MirrorEntry};
pub use scalar::{ScalarState, ScalarView};

/// The last failure seen by a view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewError {
    Read(RemoteReadError),
    Write(RemoteWriteError),
    Decode(DecodeError),
}

impl ViewError {
    /// Text for the view's error banner.
    pub fn banner(&self) -> String {
        match self {
            ViewError::Read(e) => format!("Database read failed: {}", e.reason),
            ViewError::Write(RemoteWriteError::Rejected { reason, .. }) => {
                format!("Save failed: {reason}")
            }
            ViewError::Write(RemoteWriteError::TimedOut { after, .. }) => {
                format!("Save failed: no answer after {after:?}")
            }
            ViewError::Decode(e) => format!("Unreadable value: {}", e.reason),
        }
    }
}

/// Await a write, giving up after `timeout` if one is configured.
pub(crate) async fn write_with_timeout<T, F>(
    timeout: Option<Duration>,
    path: &StorePath,
    write: F,
) -> Result<T, RemoteWriteError>
where
    F: Future<Output = Result<T, RemoteWriteError>>,
{
    match timeout {
        None => write.await,
        Some(after) => match tokio::time::timeout(after, write).await {
            Ok(result) => result,
            Err(_) => Err(RemoteWriteError::TimedOut {
                path: path.to_string(),
                after,
            }),
        },
    }
}
