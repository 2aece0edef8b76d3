//! Sign-in / sign-up form shown on the Auth screen.
//!
//! The form only asks the provider for a session. Leaving the Auth screen
//! is driven by the provider's listener notification, never by the form.

use std::sync::Arc;

use tracing::{info, warn};

use makeitmeme_shared::{AuthError, AuthProvider, Identity};

const MISSING_FIELDS: &str = "Email and password are required.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub mode: AuthMode,
    /// A request is with the provider
    loading: bool,
    /// Last failure, already worded for the user
    message: Option<String>,
}

/// A validated form submission, detached from the form.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Ask the provider for a session.
    pub async fn send<A: AuthProvider>(self, auth: Arc<A>) -> Result<Identity, AuthError> {
        match self.mode {
            AuthMode::SignIn => auth.sign_in(&self.email, &self.password).await,
            AuthMode::SignUp => auth.sign_up(&self.email, &self.password).await,
        }
    }
}

impl AuthForm {
    pub fn new() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            mode: AuthMode::SignIn,
            loading: false,
            message: None,
        }
    }

    pub fn fill(&mut self, mode: AuthMode, email: &str, password: &str) {
        self.mode = mode;
        self.email = email.trim().to_string();
        self.password = password.to_string();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last failure, as shown to the user.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Validate the form and mark it loading. Returns `None` when a request
    /// is already out or a field is blank.
    pub fn begin(&mut self) -> Option<Credentials> {
        if self.loading {
            return None;
        }
        if self.email.is_empty() || self.password.is_empty() {
            self.message = Some(MISSING_FIELDS.to_string());
            return None;
        }

        self.loading = true;
        self.message = None;
        Some(Credentials {
            mode: self.mode,
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }

    /// Apply the provider's answer. Returns the new identity on success;
    /// on failure the reason is kept in [`AuthForm::message`].
    pub fn finish(&mut self, outcome: Result<Identity, AuthError>) -> Option<Identity> {
        self.loading = false;
        match outcome {
            Ok(identity) => {
                info!(uid = %identity.uid, mode = ?self.mode, "Authenticated");
                self.password.clear();
                Some(identity)
            }
            Err(e) => {
                warn!(error = %e, mode = ?self.mode, "Authentication rejected");
                self.message = Some(e.user_message());
                None
            }
        }
    }
}

impl Default for AuthForm {
    fn default() -> Self {
        Self::new()
    }
}
