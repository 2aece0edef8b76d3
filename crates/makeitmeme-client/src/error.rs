use thiserror::Error;

use makeitmeme_shared::{PathError, Screen};

use crate::navigation::UserAction;

/// Errors produced by the client layer.
///
/// None of them is fatal: each one belongs to the command that raised it.
/// Remote write, upload and auth failures arrive later, with the write's
/// outcome, and are kept by the view they belong to.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The control already has a write outstanding.
    #[error("A write is already in flight")]
    WriteInFlight,

    #[error("{0} is required")]
    InputRequired(&'static str),

    #[error("Cannot {action} from the {from} screen")]
    InvalidTransition { from: Screen, action: UserAction },

    #[error("The {0} screen is not active")]
    NotMounted(Screen),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
