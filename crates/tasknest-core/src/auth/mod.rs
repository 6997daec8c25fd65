//! Owner scope provider.
//!
//! The sync subsystem never talks to an identity service itself. It only needs
//! to know which owner is signed in and to hear when that changes; both come
//! from an [`AuthProvider`].

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::util::{now_millis, normalize_text_option};

/// Source of the authenticated owner scope
pub trait AuthProvider: Send + Sync {
    /// Currently signed-in owner, if any
    fn current_owner_id(&self) -> Option<String>;

    /// Stream of owner changes (sign-in, sign-out, account switch)
    fn subscribe(&self) -> watch::Receiver<Option<String>>;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub owner_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    pub signed_in_at: i64,
}

impl AuthSession {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            email: None,
            access_token: None,
            signed_in_at: now_millis(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = normalize_text_option(Some(email.into()));
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = normalize_text_option(Some(token.into()));
        self
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("owner_id", &self.owner_id)
            .field("email", &self.email)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("signed_in_at", &self.signed_in_at)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid session: {0}")]
    InvalidSession(&'static str),
    #[error("Session storage error: {0}")]
    Storage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Durable storage for the signed-in session
pub trait SessionPersistence: Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// [`AuthProvider`] backed by an explicitly managed session
pub struct SessionAuth {
    session: RwLock<Option<AuthSession>>,
    owner_tx: watch::Sender<Option<String>>,
    store: Option<Arc<dyn SessionPersistence>>,
}

impl SessionAuth {
    /// Signed-out provider without persistence
    pub fn new() -> Self {
        let (owner_tx, _owner_rx) = watch::channel(None);
        Self {
            session: RwLock::new(None),
            owner_tx,
            store: None,
        }
    }

    /// Provider already signed in as `owner_id` (no persistence)
    pub fn signed_in(owner_id: impl Into<String>) -> AuthResult<Self> {
        let auth = Self::new();
        auth.sign_in(AuthSession::new(owner_id))?;
        Ok(auth)
    }

    /// Provider restoring and persisting its session through `store`
    pub fn with_persistence(store: Arc<dyn SessionPersistence>) -> AuthResult<Self> {
        let restored = store.load_session()?;
        let (owner_tx, _owner_rx) =
            watch::channel(restored.as_ref().map(|session| session.owner_id.clone()));
        if let Some(session) = &restored {
            tracing::debug!("Restored session for owner {}", session.owner_id);
        }
        Ok(Self {
            session: RwLock::new(restored),
            owner_tx,
            store: Some(store),
        })
    }

    /// Establish `session` as the current owner scope
    pub fn sign_in(&self, session: AuthSession) -> AuthResult<()> {
        let owner_id = normalize_text_option(Some(session.owner_id.clone()))
            .ok_or(AuthError::InvalidSession("owner id must not be empty"))?;
        let session = AuthSession {
            owner_id: owner_id.clone(),
            ..session
        };

        if let Some(store) = &self.store {
            store.save_session(&session)?;
        }
        *self
            .session
            .write()
            .map_err(|_| AuthError::Storage("session lock poisoned".to_string()))? = Some(session);

        self.owner_tx.send_if_modified(|current| {
            let changed = current.as_deref() != Some(owner_id.as_str());
            *current = Some(owner_id.clone());
            changed
        });
        tracing::info!("Signed in as owner {owner_id}");
        Ok(())
    }

    /// Drop the current owner scope
    pub fn sign_out(&self) -> AuthResult<()> {
        if let Some(store) = &self.store {
            store.clear_session()?;
        }
        *self
            .session
            .write()
            .map_err(|_| AuthError::Storage("session lock poisoned".to_string()))? = None;

        self.owner_tx.send_if_modified(|current| current.take().is_some());
        tracing::info!("Signed out");
        Ok(())
    }

    /// Copy of the current session
    pub fn session(&self) -> Option<AuthSession> {
        self.session.read().ok().and_then(|session| session.clone())
    }
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for SessionAuth {
    fn current_owner_id(&self) -> Option<String> {
        self.owner_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.owner_tx.subscribe()
    }
}
