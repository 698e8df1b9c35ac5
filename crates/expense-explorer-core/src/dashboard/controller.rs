//! Async driver for the dashboard state machine.
//!
//! `DashboardController` runs every `FetchRequest` the `Dashboard` emits on a
//! spawned task. Completions come back over an mpsc channel and are applied
//! one at a time by whoever owns the controller, either by polling
//! [`DashboardController::check_background_tasks`] from an event loop or by
//! awaiting [`DashboardController::settle`].

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{Account, AccountId, FileType, NewAccount, StatementId, UploadStatement, UploadSummary};

use super::preferences::Preferences;
use super::selection::{CategoryFilter, StatementFilter};
use super::state::{Dashboard, FetchOutcome, FetchRequest};
use super::DashboardError;

/// Buffer size for the completion channel.
/// One selection change issues at most three fetches, 32 leaves plenty of room.
const CHANNEL_BUFFER_SIZE: usize = 32;

pub struct DashboardController {
    api: ApiClient,
    dashboard: Dashboard,
    preferences: Preferences,
    outcome_tx: mpsc::Sender<FetchOutcome>,
    outcome_rx: mpsc::Receiver<FetchOutcome>,
    in_flight: usize,
}

impl DashboardController {
    pub fn new(api: ApiClient, preferences: Preferences) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            api,
            dashboard: Dashboard::new(),
            preferences,
            outcome_tx,
            outcome_rx,
            in_flight: 0,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Number of spawned fetches whose completion has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Load the account list and select the remembered (or first) account.
    pub fn start(&mut self) {
        let requests = self.dashboard.start(self.preferences.last_account());
        self.spawn_all(requests);
    }

    /// Re-fetch the account list, e.g. after an account was created elsewhere.
    pub fn refresh_accounts(&mut self) {
        let requests = self.dashboard.refresh_accounts();
        self.spawn_all(requests);
    }

    pub fn select_account(&mut self, account: AccountId) -> Result<(), DashboardError> {
        let requests = self.dashboard.select_account(account)?;
        self.remember_selection();
        self.spawn_all(requests);
        Ok(())
    }

    pub fn select_statement(&mut self, statement: StatementFilter) -> Result<(), DashboardError> {
        let requests = self.dashboard.select_statement(statement)?;
        self.spawn_all(requests);
        Ok(())
    }

    pub fn select_category(&mut self, category: CategoryFilter) -> Result<(), DashboardError> {
        let requests = self.dashboard.select_category(category)?;
        self.spawn_all(requests);
        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Delete the selected statement.
    ///
    /// The statement list is re-fetched before the selection falls back to
    /// "all", so the dashboard never shows the deleted statement as an
    /// option. If the delete itself fails nothing changes.
    pub async fn delete_statement(&mut self, statement: StatementId) -> Result<(), DashboardError> {
        let account = self.dashboard.check_statement_deletable(statement)?;
        info!(account, statement, "Deleting statement");
        self.api.delete_statement(statement).await?;

        let refetch = self.dashboard.refresh_statements()?;
        let outcome = Self::execute(&self.api, refetch).await;
        let applied = self.dashboard.apply(outcome);
        if applied.session_expired {
            self.end_session();
            return Err(ApiError::SessionExpired.into());
        }

        let requests = self.dashboard.statement_deleted(statement)?;
        self.spawn_all(requests);
        Ok(())
    }

    /// Upload a statement file to the selected account.
    pub async fn upload_statement(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        name: Option<String>,
    ) -> Result<UploadSummary, DashboardError> {
        let account = self
            .dashboard
            .selection()
            .account()
            .ok_or(DashboardError::NoAccountSelected)?;
        let file_type = FileType::from_file_name(file_name)
            .ok_or_else(|| DashboardError::UnsupportedFile(file_name.to_string()))?;

        let upload = UploadStatement {
            bank_account: account,
            file_name: file_name.to_string(),
            bytes,
            file_type,
            name: name.filter(|n| !n.trim().is_empty()),
        };
        info!(account, file = file_name, "Uploading statement");
        let summary = self.api.upload_statement(&upload).await?;

        let requests = self.dashboard.statement_uploaded(account);
        self.spawn_all(requests);
        Ok(summary)
    }

    /// Create a bank account and reload the account list.
    pub async fn create_account(&mut self, account: &NewAccount) -> Result<Account, DashboardError> {
        let created = self.api.create_account(account).await?;
        info!(account = created.id, "Bank account created");
        self.refresh_accounts();
        Ok(created)
    }

    /// Delete a bank account and go back through account selection.
    pub async fn delete_account(&mut self, account: AccountId) -> Result<(), DashboardError> {
        info!(account, "Deleting bank account");
        self.api.delete_account(account).await?;
        if self.preferences.last_account() == Some(account) {
            self.preferences.forget();
        }
        let requests = self.dashboard.account_deleted(account);
        self.spawn_all(requests);
        Ok(())
    }

    /// PDF export of the current selection.
    pub async fn export_dashboard(&self) -> Result<Vec<u8>, DashboardError> {
        let selection = self.dashboard.selection();
        let account = selection.account().ok_or(DashboardError::NoAccountSelected)?;
        Ok(self
            .api
            .export_dashboard(account, selection.statement().id())
            .await?)
    }

    /// Log out: clear the session and everything derived from it.
    pub fn logout(&mut self) {
        self.api.logout();
        self.end_session();
    }

    /// Stop applying completions of fetches already in flight.
    pub fn teardown(&mut self) {
        debug!(in_flight = self.in_flight, "Dashboard torn down");
        self.dashboard.teardown();
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    /// Apply every completion that has arrived, without waiting.
    ///
    /// Returns how many completions were committed. A fetch that failed
    /// because the session is gone resets the dashboard and yields
    /// `SessionExpired`.
    pub fn check_background_tasks(&mut self) -> Result<usize, DashboardError> {
        // Collect first, then apply
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            outcomes.push(outcome);
        }
        self.apply_all(outcomes)
    }

    /// Wait until no fetch is in flight, applying completions as they come,
    /// including the follow-up fetches they trigger.
    pub async fn settle(&mut self) -> Result<usize, DashboardError> {
        let mut committed = 0;
        while self.in_flight > 0 {
            let Some(outcome) = self.outcome_rx.recv().await else {
                break;
            };
            committed += self.apply_all(vec![outcome])?;
        }
        Ok(committed)
    }

    fn apply_all(&mut self, outcomes: Vec<FetchOutcome>) -> Result<usize, DashboardError> {
        let mut committed = 0;
        let mut session_expired = false;
        for outcome in outcomes {
            self.in_flight = self.in_flight.saturating_sub(1);
            let applied = self.dashboard.apply(outcome);
            if applied.committed {
                committed += 1;
            }
            session_expired |= applied.session_expired;
            if !session_expired {
                self.spawn_all(applied.follow_up);
            }
        }

        if session_expired {
            warn!("Session expired while loading the dashboard");
            self.end_session();
            return Err(ApiError::SessionExpired.into());
        }
        self.remember_selection();
        Ok(committed)
    }

    fn end_session(&mut self) {
        self.dashboard.reset();
        self.preferences.forget();
    }

    fn remember_selection(&mut self) {
        if let Some(account) = self.dashboard.selection().account() {
            self.preferences.remember_account(account);
        }
    }

    fn spawn_all(&mut self, requests: Vec<FetchRequest>) {
        for request in requests {
            self.spawn(request);
        }
    }

    fn spawn(&mut self, request: FetchRequest) {
        debug!(?request, "Spawning fetch");
        let api = self.api.clone();
        let tx = self.outcome_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let outcome = Self::execute(&api, request).await;
            if let Err(e) = tx.send(outcome).await {
                error!(error = %e, "Failed to send fetch outcome - channel closed");
            }
        });
    }

    /// Run one fetch through the Session Client.
    async fn execute(api: &ApiClient, request: FetchRequest) -> FetchOutcome {
        match request {
            FetchRequest::Accounts { generation } => FetchOutcome::Accounts {
                generation,
                result: api.list_accounts().await,
            },
            FetchRequest::Statements { generation, account } => FetchOutcome::Statements {
                generation,
                account,
                result: api.list_statements(account).await,
            },
            FetchRequest::Analytics { generation, key } => FetchOutcome::Analytics {
                generation,
                key,
                result: api.dashboard_analytics(key.0, key.1.id()).await,
            },
            FetchRequest::CategoryTransactions { generation, key } => {
                // No server-side category filter; narrow the statement's rows here.
                let result = api
                    .list_transactions(key.account, key.statement.id())
                    .await
                    .map(|rows| {
                        rows.into_iter()
                            .filter(|t| t.in_category(&key.category))
                            .collect()
                    });
                FetchOutcome::CategoryTransactions {
                    generation,
                    key,
                    result,
                }
            }
        }
    }
}

impl std::fmt::Debug for DashboardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardController")
            .field("dashboard", &self.dashboard)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientOptions;
    use crate::auth::MemorySessionStore;

    fn offline_controller() -> DashboardController {
        // Nothing listens on port 9, and no fetch below reaches the network.
        let api = ApiClient::new(
            ClientOptions::default().with_base_url("http://127.0.0.1:9/api"),
            MemorySessionStore::new(),
        )
        .unwrap();
        DashboardController::new(api, Preferences::in_memory())
    }

    #[tokio::test]
    async fn test_unauthenticated_start_expires_session() {
        let mut controller = offline_controller();
        controller.start();
        assert_eq!(controller.in_flight(), 1);

        let err = controller.settle().await.unwrap_err();
        assert!(err.requires_login());
        assert_eq!(controller.in_flight(), 0);
        assert_eq!(controller.dashboard().accounts(), None);
    }

    #[tokio::test]
    async fn test_operations_need_a_selected_account() {
        let mut controller = offline_controller();
        assert!(matches!(
            controller.upload_statement("jan.csv", Vec::new(), None).await,
            Err(DashboardError::NoAccountSelected)
        ));
        assert!(matches!(
            controller.export_dashboard().await,
            Err(DashboardError::NoAccountSelected)
        ));
        assert!(matches!(
            controller.delete_statement(1).await,
            Err(DashboardError::NoAccountSelected)
        ));
    }

    #[tokio::test]
    async fn test_check_background_tasks_with_nothing_pending() {
        let mut controller = offline_controller();
        assert_eq!(controller.check_background_tasks().unwrap(), 0);
    }
}
