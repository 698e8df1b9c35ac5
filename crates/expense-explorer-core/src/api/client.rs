//! Session Client for the Expense Explorer REST API.
//!
//! Every domain call goes through [`ApiClient::send`], which attaches the
//! current access token, and on a 401 runs the refresh protocol once before
//! retrying the request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::{Session, SessionStore};
use crate::models::{
    Account, AccountId, AnalyticsSnapshot, AuthTokens, Credentials, NewAccount, Registration,
    Statement, StatementId, Transaction, UploadStatement, UploadSummary, UserSummary,
};

use super::error::Result;
use super::refresh::{RefreshCoordinator, RefreshOutcome, REFRESH_PATH};
use super::request::{ApiRequest, Attempt, FormValue};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default API root, matching the development backend
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Transport settings for the client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub max_rate_limit_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_rate_limit_retries: MAX_RATE_LIMIT_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

impl ClientOptions {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }
}

/// DRF error bodies look like `{"error": "..."}` or `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "detail")]
    error: Option<String>,
}

/// Accept both a bare array and a paginated `{"results": [...]}` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Plain(Vec<T>),
    Paginated { results: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Plain(items) => items,
            ListBody::Paginated { results } => results,
        }
    }
}

struct Inner {
    http: Client,
    options: ClientOptions,
    session: Arc<Session>,
    refresh: RefreshCoordinator,
}

/// API client bound to the process-wide session.
/// Clone is cheap: clones share the connection pool, the session and the
/// pending-refresh slot.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.options.base_url)
            .field("session", &self.inner.session)
            .finish()
    }
}

impl ApiClient {
    /// Create a client whose session is loaded from `store`.
    pub fn new(options: ClientOptions, store: impl SessionStore + 'static) -> Result<Self> {
        let http = Client::builder().timeout(options.timeout).build()?;
        let session = Arc::new(Session::open(store));
        debug!(base_url = %options.base_url, authenticated = session.is_authenticated(), "API client created");

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                options,
                session,
                refresh: RefreshCoordinator::new(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.options.base_url
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserSummary> {
        self.inner.session.user()
    }

    /// Number of token refreshes this client has started.
    pub fn refresh_count(&self) -> u64 {
        self.inner.refresh.started()
    }

    // ===== Request lifecycle =====

    /// Send a request, refreshing the access token once if it was rejected.
    ///
    /// Returns the successful response, or the tagged failure. A request
    /// rejected again after its one retry comes back as
    /// `ApiError::Unauthorized` and does not trigger another refresh.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response> {
        let mut attempt = Attempt::First;
        loop {
            let (response, token_used) = self.dispatch(request).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Self::check_response(response).await;
            }

            if !request.requires_auth() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::InvalidCredentials(Self::error_message(&body)));
            }

            if attempt.is_retry() {
                warn!(path = request.path(), "Request rejected again after token refresh");
                return Err(ApiError::Unauthorized);
            }
            attempt = Attempt::Retry;

            // Another request may already have rotated the token while this
            // one was in flight.
            match self.inner.session.access_token() {
                None => return Err(ApiError::SessionExpired),
                Some(current) if Some(current.as_str()) != token_used.as_deref() => {
                    debug!(path = request.path(), "Token rotated while in flight, retrying");
                    continue;
                }
                Some(_) => {}
            }

            match self.refresh_access_token().await {
                RefreshOutcome::Refreshed(_) => {
                    debug!(path = request.path(), "Retrying after token refresh");
                }
                RefreshOutcome::SessionExpired => return Err(ApiError::SessionExpired),
            }
        }
    }

    /// Join or start the shared refresh and wait for its outcome.
    async fn refresh_access_token(&self) -> RefreshOutcome {
        let refresh_url = format!(
            "{}{}",
            self.inner.options.base_url.trim_end_matches('/'),
            REFRESH_PATH
        );
        let pending =
            self.inner
                .refresh
                .join_or_start(&self.inner.http, refresh_url, &self.inner.session);
        pending.await
    }

    /// Put one request on the wire, backing off on 429. The access token is
    /// read right before each send, never across a sleep.
    async fn dispatch(&self, request: &ApiRequest) -> Result<(Response, Option<String>)> {
        let mut retries = 0;
        let mut backoff = self.inner.options.initial_backoff;

        loop {
            let token = if request.requires_auth() {
                match self.inner.session.access_token() {
                    Some(token) => Some(token),
                    None => return Err(ApiError::NotAuthenticated),
                }
            } else {
                None
            };

            let response = request
                .build(&self.inner.http, &self.inner.options.base_url, token.as_deref())?
                .send()
                .await?;
            debug!(method = %request.method(), path = request.path(), status = %response.status(), "Response received");

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok((response, token));
            }

            retries += 1;
            if retries > self.inner.options.max_rate_limit_retries {
                return Err(ApiError::RateLimited);
            }
            warn!(path = request.path(), retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff);
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| body.trim().to_string())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(&request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {}: {}", request.path(), e))
        })
    }

    async fn fetch_list<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<T>> {
        let list: ListBody<T> = self.fetch(request).await?;
        Ok(list.into_vec())
    }

    async fn execute(&self, request: ApiRequest) -> Result<()> {
        self.send(&request).await?;
        Ok(())
    }

    // ===== Authentication =====

    /// Log in and start a new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserSummary> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = ApiRequest::post("/auth/login/").anonymous().json(&credentials)?;
        let tokens: AuthTokens = self.fetch(request).await?;
        let user = tokens.user.clone();
        self.inner.session.create(tokens);
        info!(username = %user.username, "Login successful");
        Ok(user)
    }

    /// Register a new user and start a session for them.
    pub async fn register(&self, registration: &Registration) -> Result<UserSummary> {
        let request = ApiRequest::post("/auth/register/").anonymous().json(registration)?;
        let tokens: AuthTokens = self.fetch(request).await?;
        let user = tokens.user.clone();
        self.inner.session.create(tokens);
        info!(username = %user.username, "Registration successful");
        Ok(user)
    }

    /// Forget the session locally. The backend keeps no server-side session.
    pub fn logout(&self) {
        self.inner.session.clear();
        info!("Logged out");
    }

    // ===== Bank accounts =====

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.fetch_list(ApiRequest::get("/bank-accounts/")).await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account> {
        self.fetch(ApiRequest::get(format!("/bank-accounts/{}/", id)))
            .await
    }

    pub async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        self.fetch(ApiRequest::post("/bank-accounts/").json(account)?)
            .await
    }

    pub async fn delete_account(&self, id: AccountId) -> Result<()> {
        self.execute(ApiRequest::delete(format!("/bank-accounts/{}/", id)))
            .await
    }

    // ===== Statements =====

    pub async fn list_statements(&self, account: AccountId) -> Result<Vec<Statement>> {
        self.fetch_list(ApiRequest::get("/statements/").query("bank_account", account))
            .await
    }

    /// Upload a statement file for parsing.
    pub async fn upload_statement(&self, upload: &UploadStatement) -> Result<UploadSummary> {
        let mut parts = vec![
            (
                "bank_account".to_string(),
                FormValue::Text(upload.bank_account.to_string()),
            ),
            (
                "file".to_string(),
                FormValue::File {
                    file_name: upload.file_name.clone(),
                    mime: upload.file_type.mime_type(),
                    bytes: upload.bytes.clone(),
                },
            ),
            (
                "file_type".to_string(),
                FormValue::Text(upload.file_type.as_str().to_string()),
            ),
        ];
        if let Some(name) = upload.name.as_ref().filter(|n| !n.trim().is_empty()) {
            parts.push(("name".to_string(), FormValue::Text(name.clone())));
        }

        let summary: UploadSummary = self
            .fetch(ApiRequest::post("/statements/upload/").multipart(parts))
            .await?;
        info!(
            account = upload.bank_account,
            transactions = summary.transaction_count,
            "Statement uploaded"
        );
        Ok(summary)
    }

    pub async fn delete_statement(&self, id: StatementId) -> Result<()> {
        self.execute(ApiRequest::delete(format!("/statements/{}/", id)))
            .await
    }

    // ===== Analytics and transactions =====

    /// Dashboard numbers for an account, narrowed to one statement when given.
    pub async fn dashboard_analytics(
        &self,
        account: AccountId,
        statement: Option<StatementId>,
    ) -> Result<AnalyticsSnapshot> {
        self.fetch(
            ApiRequest::get("/analytics/dashboard/")
                .query("bank_account", account)
                .query_opt("statement", statement),
        )
        .await
    }

    pub async fn list_transactions(
        &self,
        account: AccountId,
        statement: Option<StatementId>,
    ) -> Result<Vec<Transaction>> {
        self.fetch_list(
            ApiRequest::get("/transactions/")
                .query("bank_account", account)
                .query_opt("statement", statement),
        )
        .await
    }

    /// PDF report of the dashboard for the given selection.
    pub async fn export_dashboard(
        &self,
        account: AccountId,
        statement: Option<StatementId>,
    ) -> Result<Vec<u8>> {
        let request = ApiRequest::get("/transactions/export_dashboard/")
            .query("bank_account", account)
            .query_opt("statement", statement);
        let response = self.send(&request).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Double the rate-limit delay, saturating for very large retry counts.
fn next_backoff(backoff: Duration) -> Duration {
    backoff.saturating_mul(2)
}
