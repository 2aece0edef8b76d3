//! Client configuration loaded from environment variables.
//!
//! Every setting has a default, so the client starts with zero
//! configuration. Invalid values are logged and ignored.

use std::time::Duration;

use makeitmeme_shared::constants::{
    DEFAULT_CHAT_PATH, DEFAULT_MEMES_PATH, DEFAULT_MESSAGE_PATH, DEFAULT_UPLOAD_PREFIX,
};
use makeitmeme_shared::{PathError, StorePath, UserId};

/// Which screens exist once signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavLayout {
    /// Menu, Primary and Chat.
    Full,
    /// Primary only.
    Reduced,
}

impl std::str::FromStr for NavLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(NavLayout::Full),
            "reduced" => Ok(NavLayout::Reduced),
            other => Err(format!("unknown layout '{other}', expected full or reduced")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Shared chat collection.
    /// Env: `MEME_CHAT_PATH`
    /// Default: `chat`
    pub chat_path: String,

    /// Root of the per-identity meme collections.
    /// Env: `MEME_MEMES_PATH`
    /// Default: `memes`
    pub memes_path: String,

    /// Saved message slot; `{uid}` is replaced by the user id.
    /// Env: `MEME_MESSAGE_PATH`
    /// Default: `users/{uid}/message`
    pub message_path: String,

    /// File storage prefix for uploaded meme images.
    /// Env: `MEME_UPLOAD_PREFIX`
    /// Default: `memes`
    pub upload_prefix: String,

    /// Env: `MEME_NAV_LAYOUT` (full/reduced)
    /// Default: `full`
    pub layout: NavLayout,

    /// Give up on a remote write after this long. `None` waits forever.
    /// Env: `MEME_WRITE_TIMEOUT_MS`
    /// Default: unset.
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            memes_path: DEFAULT_MEMES_PATH.to_string(),
            message_path: DEFAULT_MESSAGE_PATH.to_string(),
            upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
            layout: NavLayout::Full,
            write_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("MEME_CHAT_PATH") {
            if StorePath::parse(&path).is_ok() {
                config.chat_path = path;
            } else {
                tracing::warn!(value = %path, "Invalid MEME_CHAT_PATH, using default");
            }
        }

        if let Some(path) = lookup("MEME_MEMES_PATH") {
            if StorePath::parse(&path).is_ok() {
                config.memes_path = path;
            } else {
                tracing::warn!(value = %path, "Invalid MEME_MEMES_PATH, using default");
            }
        }

        if let Some(template) = lookup("MEME_MESSAGE_PATH") {
            if StorePath::from_template(&template, &UserId::from("sample")).is_ok() {
                config.message_path = template;
            } else {
                tracing::warn!(value = %template, "Invalid MEME_MESSAGE_PATH, using default");
            }
        }

        if let Some(prefix) = lookup("MEME_UPLOAD_PREFIX") {
            let prefix = prefix.trim_matches('/').to_string();
            if !prefix.is_empty() {
                config.upload_prefix = prefix;
            }
        }

        if let Some(raw) = lookup("MEME_NAV_LAYOUT") {
            match raw.parse::<NavLayout>() {
                Ok(layout) => config.layout = layout,
                Err(e) => tracing::warn!(error = %e, "Invalid MEME_NAV_LAYOUT, using default"),
            }
        }

        if let Some(raw) = lookup("MEME_WRITE_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.write_timeout = None,
                Ok(ms) => config.write_timeout = Some(Duration::from_millis(ms)),
                Err(_) => {
                    tracing::warn!(value = %raw, "Invalid MEME_WRITE_TIMEOUT_MS, writes never time out")
                }
            }
        }

        config
    }

    pub fn chat_path(&self) -> Result<StorePath, PathError> {
        StorePath::parse(&self.chat_path)
    }

    /// Meme collection of one identity: `<memes_path>/<uid>`.
    pub fn memes_path_for(&self, uid: &UserId) -> Result<StorePath, PathError> {
        StorePath::parse(&self.memes_path)?.child(uid.as_str())
    }

    pub fn message_path_for(&self, uid: &UserId) -> Result<StorePath, PathError> {
        StorePath::from_template(&self.message_path, uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.chat_path, "chat");
        assert_eq!(config.layout, NavLayout::Full);
        assert!(config.write_timeout.is_none());
    }

    #[test]
    fn test_paths_for_identity() {
        let config = ClientConfig::default();
        let uid = UserId::from("u1");
        assert_eq!(config.memes_path_for(&uid).unwrap().to_string(), "memes/u1");
        assert_eq!(
            config.message_path_for(&uid).unwrap().to_string(),
            "users/u1/message"
        );
    }

    #[test]
    fn test_overrides_from_env() {
        let config = config_from(&[
            ("MEME_CHAT_PATH", "rooms/general"),
            ("MEME_NAV_LAYOUT", "Reduced"),
            ("MEME_WRITE_TIMEOUT_MS", "1500"),
        ]);
        assert_eq!(config.chat_path, "rooms/general");
        assert_eq!(config.layout, NavLayout::Reduced);
        assert_eq!(config.write_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[
            ("MEME_CHAT_PATH", "chat//x"),
            ("MEME_MESSAGE_PATH", "users/{uid}/a.b"),
            ("MEME_NAV_LAYOUT", "sideways"),
            ("MEME_WRITE_TIMEOUT_MS", "soon"),
        ]);
        assert_eq!(config.chat_path, "chat");
        assert_eq!(config.message_path, "users/{uid}/message");
        assert_eq!(config.layout, NavLayout::Full);
        assert!(config.write_timeout.is_none());
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = config_from(&[("MEME_WRITE_TIMEOUT_MS", "0")]);
        assert!(config.write_timeout.is_none());
    }
}
