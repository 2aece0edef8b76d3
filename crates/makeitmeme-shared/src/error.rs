use std::time::Duration;

use thiserror::Error;

/// Failures reported by the auth provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password too weak")]
    WeakPassword,

    #[error("Email already in use")]
    UserCollision,

    #[error("Authentication failed: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Text shown to the user on the auth screen.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Incorrect email or password.".to_string(),
            AuthError::WeakPassword => format!(
                "Password too weak ({} characters minimum).",
                crate::constants::MIN_PASSWORD_LEN
            ),
            AuthError::UserCollision => "This email is already in use.".to_string(),
            AuthError::Unknown(reason) => format!("Authentication failed: {reason}"),
        }
    }
}

/// A value listener was cancelled by the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Read failed at '{path}': {reason}")]
pub struct RemoteReadError {
    pub path: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteWriteError {
    #[error("Write rejected at '{path}': {reason}")]
    Rejected { path: String, reason: String },

    #[error("Write to '{path}' timed out after {after:?}")]
    TimedOut { path: String, after: Duration },
}

/// A snapshot value did not match the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot decode value at '{path}': {reason}")]
pub struct DecodeError {
    pub path: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Empty upload")]
    Empty,

    #[error("Upload too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Upload rejected at '{path}': {reason}")]
    Rejected { path: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty path segment in '{0}'")]
    EmptySegment(String),

    #[error("Forbidden character {ch:?} in '{path}'")]
    ForbiddenChar { path: String, ch: char },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_user_messages() {
        assert_eq!(
            AuthError::InvalidCredentials.user_message(),
            "Incorrect email or password."
        );
        assert_eq!(
            AuthError::WeakPassword.user_message(),
            "Password too weak (6 characters minimum)."
        );
        assert!(AuthError::Unknown("network down".into())
            .user_message()
            .contains("network down"));
    }
}
