//! Single-flight access token refresh.
//!
//! Concurrent 401s collapse onto one pending refresh. The pending future is
//! a `futures::future::Shared`, so every waiter observes the same outcome. A
//! completed refresh is never joined: the next failure after completion
//! starts a new one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::models::AccessToken;

/// Path of the refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Result of one refresh call, shared by every request that waited on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(String),
    /// The session has been cleared.
    SessionExpired,
}

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    pending: Mutex<Option<PendingRefresh>>,
    started: AtomicU64,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight refresh or start a new one.
    pub(crate) fn join_or_start(
        &self,
        http: &Client,
        refresh_url: String,
        session: &Arc<Session>,
    ) -> PendingRefresh {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(in_flight) = pending.as_ref() {
            if in_flight.peek().is_none() {
                debug!("Joining in-flight token refresh");
                return in_flight.clone();
            }
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        let refresh = refresh_access_token(http.clone(), refresh_url, Arc::clone(session))
            .boxed()
            .shared();
        *pending = Some(refresh.clone());
        refresh
    }

    /// Number of refreshes started since the client was created.
    pub(crate) fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }
}

/// Exchange the stored refresh token for a new access token. Any failure is
/// terminal for the session: it is cleared and `SessionExpired` returned.
async fn refresh_access_token(
    http: Client,
    refresh_url: String,
    session: Arc<Session>,
) -> RefreshOutcome {
    let Some(refresh_token) = session.refresh_token() else {
        warn!("No refresh token available, session expired");
        session.clear();
        return RefreshOutcome::SessionExpired;
    };

    info!("Access token rejected, refreshing");
    let response = http
        .post(&refresh_url)
        .json(&serde_json::json!({ "refresh": refresh_token }))
        .send()
        .await;

    let response = match response {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!(status = %response.status(), "Token refresh rejected, clearing session");
            session.clear();
            return RefreshOutcome::SessionExpired;
        }
        Err(e) => {
            warn!(error = %e, "Token refresh failed, clearing session");
            session.clear();
            return RefreshOutcome::SessionExpired;
        }
    };

    match response.json::<AccessToken>().await {
        Ok(token) => {
            session.replace_access(token.access.clone(), token.refresh);
            debug!("Access token refreshed");
            RefreshOutcome::Refreshed(token.access)
        }
        Err(e) => {
            warn!(error = %e, "Unreadable refresh response, clearing session");
            session.clear();
            RefreshOutcome::SessionExpired
        }
    }
}
