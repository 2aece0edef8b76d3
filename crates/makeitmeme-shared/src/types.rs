use serde::{Deserialize, Serialize};

/// Opaque user identifier issued by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The authenticated user as reported by the auth provider.
/// Created and destroyed by the provider; the client only observes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: UserId,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: UserId(uid.into()),
            email,
        }
    }

    /// Email if known, otherwise the short user id.
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or_else(|| self.uid.short())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    Auth,
    Menu,
    Primary,
    Chat,
}

impl Screen {
    pub fn is_authenticated(self) -> bool {
        !matches!(self, Screen::Auth)
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Screen::Auth => "auth",
            Screen::Menu => "menu",
            Screen::Primary => "primary",
            Screen::Chat => "chat",
        };
        f.write_str(name)
    }
}
