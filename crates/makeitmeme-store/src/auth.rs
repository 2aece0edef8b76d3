//! In-process email/password auth provider.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};
use uuid::Uuid;

use makeitmeme_shared::constants::MIN_PASSWORD_LEN;
use makeitmeme_shared::{AuthError, AuthEvent, AuthProvider, AuthSink, Identity, ListenerId, UserId};

struct Account {
    uid: UserId,
    password: String,
}

struct AuthInner {
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
    listeners: BTreeMap<ListenerId, AuthSink>,
    next_listener: u64,
    outage: Option<String>,
}

impl AuthInner {
    fn set_current(&mut self, identity: Option<Identity>) {
        if self.current == identity {
            return;
        }
        self.current = identity;
        for (id, sink) in &self.listeners {
            let event = AuthEvent {
                listener: *id,
                identity: self.current.clone(),
            };
            if sink.send(event).is_err() {
                debug!(listener = %id, "Auth listener channel closed");
            }
        }
    }

    fn check_available(&self) -> Result<(), AuthError> {
        match &self.outage {
            Some(reason) => Err(AuthError::Unknown(reason.clone())),
            None => Ok(()),
        }
    }
}

pub struct MemoryAuth {
    inner: Mutex<AuthInner>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(AuthInner {
                accounts: HashMap::new(),
                current: None,
                listeners: BTreeMap::new(),
                next_listener: 1,
                outage: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuthInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail every following request with `AuthError::Unknown(reason)`.
    pub fn set_outage(&self, reason: Option<&str>) {
        self.lock().outage = reason.map(str::to_string);
    }

    /// Drop the session from the provider side (token revoked, account
    /// disabled). Listeners see the identity disappear.
    pub fn revoke_session(&self) {
        warn!("Session revoked");
        self.lock().set_current(None);
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if well_formed {
        Ok(email)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

impl AuthProvider for MemoryAuth {
    fn current_identity(&self) -> Option<Identity> {
        self.lock().current.clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut inner = self.lock();
        inner.check_available()?;
        let email = normalize_email(email)?;

        let uid = match inner.accounts.get(&email) {
            Some(account) if account.password == password => account.uid.clone(),
            _ => {
                warn!(email = %email, "Sign-in rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let identity = Identity {
            uid,
            email: Some(email),
        };
        inner.set_current(Some(identity.clone()));
        info!(uid = %identity.uid, "Signed in");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut inner = self.lock();
        inner.check_available()?;
        let email = normalize_email(email)?;

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if inner.accounts.contains_key(&email) {
            return Err(AuthError::UserCollision);
        }

        let uid = UserId(Uuid::new_v4().simple().to_string());
        inner.accounts.insert(
            email.clone(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );

        let identity = Identity {
            uid,
            email: Some(email),
        };
        inner.set_current(Some(identity.clone()));
        info!(uid = %identity.uid, "Account created");
        Ok(identity)
    }

    async fn sign_out(&self) {
        self.lock().set_current(None);
        info!("Signed out");
    }

    fn add_auth_listener(&self, sink: AuthSink) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;

        let _ = sink.send(AuthEvent {
            listener: id,
            identity: inner.current.clone(),
        });
        inner.listeners.insert(id, sink);
        debug!(listener = %id, "Auth listener added");
        id
    }

    fn remove_auth_listener(&self, id: ListenerId) -> bool {
        let removed = self.lock().listeners.remove(&id).is_some();
        if removed {
            debug!(listener = %id, "Auth listener removed");
        }
        removed
    }
}
