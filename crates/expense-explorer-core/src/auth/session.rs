use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::SessionStore;
use crate::models::{AuthTokens, UserSummary};

/// Persisted session contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The one session for this client.
///
/// Created on login or registration, access token replaced on refresh,
/// cleared entirely on logout or an unrecoverable refresh failure. Every
/// mutation is written through to the injected store.
pub struct Session {
    store: Box<dyn SessionStore>,
    data: Mutex<SessionData>,
}

impl Session {
    /// Load the session from `store`. A store that fails to load is treated
    /// as "no session".
    pub fn open(store: impl SessionStore + 'static) -> Self {
        let data = match store.load() {
            Ok(Some(data)) => {
                debug!(has_access = data.access_token.is_some(), "Session loaded");
                data
            }
            Ok(None) => SessionData::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load session, starting signed out");
                SessionData::default()
            }
        };
        Self {
            store: Box::new(store),
            data: Mutex::new(data),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, data: &SessionData) {
        if let Err(e) = self.store.save(data) {
            warn!(error = %e, "Failed to save session");
        }
    }

    /// Start a new session from a login or registration response.
    pub(crate) fn create(&self, tokens: AuthTokens) {
        let data = SessionData {
            access_token: Some(tokens.access),
            refresh_token: Some(tokens.refresh),
            user: Some(tokens.user),
            updated_at: Some(Utc::now()),
        };
        *self.lock() = data.clone();
        self.persist(&data);
    }

    /// Swap in a refreshed access token, and the rotated refresh token when
    /// the backend sent one.
    pub(crate) fn replace_access(&self, access: String, refresh: Option<String>) {
        let data = {
            let mut guard = self.lock();
            guard.access_token = Some(access);
            if let Some(refresh) = refresh {
                guard.refresh_token = Some(refresh);
            }
            guard.updated_at = Some(Utc::now());
            guard.clone()
        };
        self.persist(&data);
    }

    /// Drop tokens and user, in memory and on disk.
    pub(crate) fn clear(&self) {
        *self.lock() = SessionData::default();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session");
        }
    }

    /// The access token as of right now.
    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.lock().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().access_token.is_some()
    }

    pub fn snapshot(&self) -> SessionData {
        self.lock().clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.lock();
        f.debug_struct("Session")
            .field("authenticated", &data.access_token.is_some())
            .field("user", &data.user.as_ref().map(|u| u.username.as_str()))
            .finish()
    }
}
