//! The dashboard state machine.
//!
//! `Dashboard` owns the selection and the derived-data slots. It performs no
//! I/O: transitions return the `FetchRequest`s to run, and completions come
//! back through [`Dashboard::apply`] as `FetchOutcome`s carrying the ticket
//! they were issued with.

use tracing::{debug, warn};

use crate::api::ApiError;
use crate::models::{Account, AccountId, AnalyticsSnapshot, Statement, StatementId, Transaction};

use super::selection::{CategoryFilter, SelectionState, StatementFilter};
use super::slot::{Generation, Slot};
use super::DashboardError;

/// Key of the analytics slot.
pub type AnalyticsKey = (AccountId, StatementFilter);

/// Key of the category transactions slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryKey {
    pub account: AccountId,
    pub statement: StatementFilter,
    pub category: String,
}

/// Where the dashboard is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the account list.
    Initial,
    /// The user has no bank accounts yet.
    Onboarding,
    /// An account is selected.
    Ready,
}

/// A fetch to run, stamped with the ticket of its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Accounts {
        generation: Generation,
    },
    Statements {
        generation: Generation,
        account: AccountId,
    },
    Analytics {
        generation: Generation,
        key: AnalyticsKey,
    },
    CategoryTransactions {
        generation: Generation,
        key: CategoryKey,
    },
}

/// A finished fetch, handed back to [`Dashboard::apply`].
#[derive(Debug)]
pub enum FetchOutcome {
    Accounts {
        generation: Generation,
        result: Result<Vec<Account>, ApiError>,
    },
    Statements {
        generation: Generation,
        account: AccountId,
        result: Result<Vec<Statement>, ApiError>,
    },
    Analytics {
        generation: Generation,
        key: AnalyticsKey,
        result: Result<AnalyticsSnapshot, ApiError>,
    },
    CategoryTransactions {
        generation: Generation,
        key: CategoryKey,
        result: Result<Vec<Transaction>, ApiError>,
    },
}

/// What applying an outcome did.
#[derive(Debug, Default)]
pub struct Applied {
    /// The outcome matched its slot's generation and was recorded.
    pub committed: bool,
    /// Fetches triggered by the transition the outcome caused.
    pub follow_up: Vec<FetchRequest>,
    /// The fetch failed because the session is gone.
    pub session_expired: bool,
}

impl Applied {
    fn discarded() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
pub struct Dashboard {
    phase: Phase,
    selection: SelectionState,
    preferred_account: Option<AccountId>,
    accounts: Slot<(), Vec<Account>>,
    statements: Slot<AccountId, Vec<Statement>>,
    analytics: Slot<AnalyticsKey, AnalyticsSnapshot>,
    category_transactions: Slot<CategoryKey, Vec<Transaction>>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            phase: Phase::Initial,
            selection: SelectionState::default(),
            preferred_account: None,
            accounts: Slot::new(),
            statements: Slot::new(),
            analytics: Slot::new(),
            category_transactions: Slot::new(),
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Enter `Initial`: forget the selection and fetch the account list.
    /// `remembered` is picked as the default account when it still exists.
    pub fn start(&mut self, remembered: Option<AccountId>) -> Vec<FetchRequest> {
        debug!(?remembered, "Dashboard starting");
        self.phase = Phase::Initial;
        self.preferred_account = remembered;
        self.selection.clear();
        self.statements.invalidate();
        self.analytics.invalidate();
        self.category_transactions.clear();
        vec![self.begin_accounts()]
    }

    /// Re-fetch the account list, keeping the current selection if the
    /// account still exists.
    pub fn refresh_accounts(&mut self) -> Vec<FetchRequest> {
        vec![self.begin_accounts()]
    }

    /// Switch to another account. Statement and category go back to "all"
    /// and anything in flight for the previous account is superseded.
    pub fn select_account(&mut self, account: AccountId) -> Result<Vec<FetchRequest>, DashboardError> {
        if let Some(accounts) = self.accounts() {
            if !accounts.iter().any(|a| a.id == account) {
                return Err(DashboardError::UnknownAccount(account));
            }
        }
        Ok(self.enter_account(account))
    }

    /// Narrow the dashboard to one statement or back to "all".
    pub fn select_statement(
        &mut self,
        statement: StatementFilter,
    ) -> Result<Vec<FetchRequest>, DashboardError> {
        let account = self.require_account()?;
        if let (StatementFilter::Statement(id), Some(statements)) = (statement, self.statements()) {
            if !statements.iter().any(|s| s.id == id) {
                return Err(DashboardError::UnknownStatement(id));
            }
        }

        debug!(account, %statement, "Statement selected");
        self.selection.select_statement(statement);
        self.category_transactions.clear();
        Ok(vec![self.begin_analytics(account, statement)])
    }

    /// Show the transactions of one category. Selecting "all" drops the
    /// category transactions without fetching anything.
    pub fn select_category(
        &mut self,
        category: CategoryFilter,
    ) -> Result<Vec<FetchRequest>, DashboardError> {
        let account = self.require_account()?;
        self.selection.select_category(category.clone());

        match category {
            CategoryFilter::All => {
                self.category_transactions.clear();
                Ok(Vec::new())
            }
            CategoryFilter::Category(name) => {
                let key = CategoryKey {
                    account,
                    statement: self.selection.statement(),
                    category: name,
                };
                let generation = self.category_transactions.begin(key.clone());
                Ok(vec![FetchRequest::CategoryTransactions { generation, key }])
            }
        }
    }

    /// Check that `statement` may be deleted: it must be the selected one.
    pub fn check_statement_deletable(&self, statement: StatementId) -> Result<AccountId, DashboardError> {
        let account = self.require_account()?;
        match self.selection.statement() {
            StatementFilter::Statement(selected) if selected == statement => Ok(account),
            _ => Err(DashboardError::StatementNotSelected(statement)),
        }
    }

    /// Ticket for re-fetching the statement list of the selected account.
    pub fn refresh_statements(&mut self) -> Result<FetchRequest, DashboardError> {
        let account = self.require_account()?;
        Ok(self.begin_statements(account))
    }

    /// After a successful delete and statement re-fetch: force "all" and
    /// re-fetch analytics for the whole account.
    pub fn statement_deleted(&mut self, statement: StatementId) -> Result<Vec<FetchRequest>, DashboardError> {
        let account = self.require_account()?;
        debug!(account, statement, "Statement deleted, showing whole account");
        self.selection.select_statement(StatementFilter::All);
        self.category_transactions.clear();
        Ok(vec![self.begin_analytics(account, StatementFilter::All)])
    }

    /// After an upload to `account`: re-fetch what the new statement changes.
    pub fn statement_uploaded(&mut self, account: AccountId) -> Vec<FetchRequest> {
        if self.selection.account() != Some(account) {
            return Vec::new();
        }
        let mut requests = vec![
            self.begin_statements(account),
            self.begin_analytics(account, self.selection.statement()),
        ];
        if let Some(category) = self.selection.category().category() {
            let key = CategoryKey {
                account,
                statement: self.selection.statement(),
                category: category.to_string(),
            };
            let generation = self.category_transactions.begin(key.clone());
            requests.push(FetchRequest::CategoryTransactions { generation, key });
        }
        requests
    }

    /// After an account was deleted: drop it as the remembered default and
    /// re-enter `Initial`. Another selected account stays selected.
    pub fn account_deleted(&mut self, account: AccountId) -> Vec<FetchRequest> {
        let keep = self.selection.account().filter(|id| *id != account);
        self.start(keep)
    }

    /// Stop applying completions of everything currently in flight.
    pub fn teardown(&mut self) {
        self.accounts.invalidate();
        self.statements.invalidate();
        self.analytics.invalidate();
        self.category_transactions.invalidate();
    }

    /// Drop all state, e.g. on logout. Generations keep counting so tickets
    /// issued before the reset stay stale.
    pub fn reset(&mut self) {
        self.phase = Phase::Initial;
        self.preferred_account = None;
        self.selection.clear();
        self.accounts.clear();
        self.statements.clear();
        self.analytics.clear();
        self.category_transactions.clear();
    }

    // =========================================================================
    // Completions
    // =========================================================================

    /// Commit a completion if its ticket is still current.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        match outcome {
            FetchOutcome::Accounts { generation, result } => match result {
                Ok(accounts) => {
                    if !self.accounts.commit(generation, (), accounts) {
                        debug!(generation, "Discarding stale accounts response");
                        return Applied::discarded();
                    }
                    Applied {
                        committed: true,
                        follow_up: self.accounts_loaded(),
                        session_expired: false,
                    }
                }
                Err(e) => Self::record_failure(&mut self.accounts, "accounts", generation, e),
            },
            FetchOutcome::Statements {
                generation,
                account,
                result,
            } => match result {
                Ok(statements) => {
                    if !self.statements.commit(generation, account, statements) {
                        debug!(generation, account, "Discarding stale statements response");
                        return Applied::discarded();
                    }
                    Applied {
                        committed: true,
                        ..Default::default()
                    }
                }
                Err(e) => Self::record_failure(&mut self.statements, "statements", generation, e),
            },
            FetchOutcome::Analytics {
                generation,
                key,
                result,
            } => match result {
                Ok(snapshot) => {
                    if !self.analytics.commit(generation, key, snapshot) {
                        debug!(generation, account = key.0, statement = %key.1, "Discarding stale analytics response");
                        return Applied::discarded();
                    }
                    Applied {
                        committed: true,
                        ..Default::default()
                    }
                }
                Err(e) => Self::record_failure(&mut self.analytics, "analytics", generation, e),
            },
            FetchOutcome::CategoryTransactions {
                generation,
                key,
                result,
            } => match result {
                Ok(transactions) => {
                    if !self.category_transactions.commit(generation, key, transactions) {
                        debug!(generation, "Discarding stale category transactions response");
                        return Applied::discarded();
                    }
                    Applied {
                        committed: true,
                        ..Default::default()
                    }
                }
                Err(e) => Self::record_failure(
                    &mut self.category_transactions,
                    "category_transactions",
                    generation,
                    e,
                ),
            },
        }
    }

    fn record_failure<K: Clone + PartialEq, T>(
        slot: &mut Slot<K, T>,
        name: &str,
        generation: Generation,
        error: ApiError,
    ) -> Applied {
        if !slot.fail(generation, error.to_string()) {
            debug!(slot = name, generation, error = %error, "Discarding stale failure");
            // The session is gone whichever selection asked
            return Applied {
                session_expired: error.requires_login(),
                ..Applied::discarded()
            };
        }
        warn!(slot = name, error = %error, "Fetch failed, keeping previous data");
        Applied {
            committed: true,
            follow_up: Vec::new(),
            session_expired: error.requires_login(),
        }
    }

    /// The account list arrived: pick an account or go to onboarding.
    fn accounts_loaded(&mut self) -> Vec<FetchRequest> {
        let ids: Vec<AccountId> = match self.accounts() {
            Some(accounts) => accounts.iter().map(|a| a.id).collect(),
            None => return Vec::new(),
        };
        if ids.is_empty() {
            debug!("No bank accounts, onboarding");
            self.phase = Phase::Onboarding;
            self.selection.clear();
            self.statements.clear();
            self.analytics.clear();
            self.category_transactions.clear();
            return Vec::new();
        }

        let still_selected = self
            .selection
            .account()
            .filter(|id| ids.contains(id));
        if self.phase == Phase::Ready && still_selected.is_some() {
            return Vec::new();
        }

        let default = self
            .preferred_account
            .filter(|id| ids.contains(id))
            .unwrap_or(ids[0]);
        self.enter_account(default)
    }

    fn enter_account(&mut self, account: AccountId) -> Vec<FetchRequest> {
        debug!(account, "Account selected");
        self.phase = Phase::Ready;
        self.preferred_account = Some(account);
        self.selection.select_account(account);
        self.category_transactions.clear();
        vec![
            self.begin_statements(account),
            self.begin_analytics(account, StatementFilter::All),
        ]
    }

    fn begin_accounts(&mut self) -> FetchRequest {
        FetchRequest::Accounts {
            generation: self.accounts.begin(()),
        }
    }

    fn begin_statements(&mut self, account: AccountId) -> FetchRequest {
        FetchRequest::Statements {
            generation: self.statements.begin(account),
            account,
        }
    }

    fn begin_analytics(&mut self, account: AccountId, statement: StatementFilter) -> FetchRequest {
        let key = (account, statement);
        FetchRequest::Analytics {
            generation: self.analytics.begin(key),
            key,
        }
    }

    fn require_account(&self) -> Result<AccountId, DashboardError> {
        self.selection
            .account()
            .ok_or(DashboardError::NoAccountSelected)
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn preferred_account(&self) -> Option<AccountId> {
        self.preferred_account
    }

    pub fn accounts(&self) -> Option<&[Account]> {
        self.accounts.value_for(&()).map(Vec::as_slice)
    }

    /// Statements of the selected account.
    pub fn statements(&self) -> Option<&[Statement]> {
        let account = self.selection.account()?;
        self.statements.value_for(&account).map(Vec::as_slice)
    }

    /// Analytics for the current account and statement.
    pub fn analytics(&self) -> Option<&AnalyticsSnapshot> {
        let account = self.selection.account()?;
        self.analytics.value_for(&(account, self.selection.statement()))
    }

    /// Transactions of the selected category, for the current account and
    /// statement.
    pub fn category_transactions(&self) -> Option<&[Transaction]> {
        let key = CategoryKey {
            account: self.selection.account()?,
            statement: self.selection.statement(),
            category: self.selection.category().category()?.to_string(),
        };
        self.category_transactions.value_for(&key).map(Vec::as_slice)
    }

    pub fn selected_account(&self) -> Option<&Account> {
        let id = self.selection.account()?;
        self.accounts()?.iter().find(|a| a.id == id)
    }

    pub fn selected_statement(&self) -> Option<&Statement> {
        let id = self.selection.statement().id()?;
        self.statements()?.iter().find(|s| s.id == id)
    }

    pub fn accounts_slot(&self) -> &Slot<(), Vec<Account>> {
        &self.accounts
    }

    pub fn statements_slot(&self) -> &Slot<AccountId, Vec<Statement>> {
        &self.statements
    }

    pub fn analytics_slot(&self) -> &Slot<AnalyticsKey, AnalyticsSnapshot> {
        &self.analytics
    }

    pub fn category_transactions_slot(&self) -> &Slot<CategoryKey, Vec<Transaction>> {
        &self.category_transactions
    }

    /// True while any slot waits for a completion.
    pub fn is_loading(&self) -> bool {
        self.accounts.is_loading()
            || self.statements.is_loading()
            || self.analytics.is_loading()
            || self.category_transactions.is_loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::slot::SlotStatus;
    use crate::models::{AnalyticsSummary, FileType};

    fn account(id: AccountId) -> Account {
        Account {
            id,
            bank_name: format!("Bank {}", id),
            account_nickname: String::new(),
            currency: "USD".to_string(),
            created_at: None,
            statement_count: 0,
            total_spending: 0.0,
        }
    }

    fn statement(id: StatementId) -> Statement {
        Statement {
            id,
            file: None,
            name: format!("Statement {}", id),
            file_type: FileType::Csv,
            uploaded_at: None,
            processed: true,
            total_amount: 0.0,
            transaction_count: 0,
        }
    }

    fn snapshot(total_spending: f64) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            summary: AnalyticsSummary {
                total_spending,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn transaction(id: i64, category: &str) -> Transaction {
        Transaction {
            id,
            date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            description: "row".to_string(),
            amount: 10.0,
            category: category.to_string(),
            created_at: None,
        }
    }

    fn accounts_generation(requests: &[FetchRequest]) -> Generation {
        match requests {
            [FetchRequest::Accounts { generation }] => *generation,
            other => panic!("expected a single accounts fetch, got {other:?}"),
        }
    }

    /// Start, load `ids` as the account list, and return the follow-ups.
    fn load_accounts(dashboard: &mut Dashboard, remembered: Option<AccountId>, ids: &[AccountId]) -> Vec<FetchRequest> {
        let generation = accounts_generation(&dashboard.start(remembered));
        let applied = dashboard.apply(FetchOutcome::Accounts {
            generation,
            result: Ok(ids.iter().copied().map(account).collect()),
        });
        assert!(applied.committed);
        applied.follow_up
    }

    fn complete(dashboard: &mut Dashboard, request: &FetchRequest, statements: &[StatementId], total: f64) -> Applied {
        match request.clone() {
            FetchRequest::Statements { generation, account } => dashboard.apply(FetchOutcome::Statements {
                generation,
                account,
                result: Ok(statements.iter().copied().map(statement).collect()),
            }),
            FetchRequest::Analytics { generation, key } => dashboard.apply(FetchOutcome::Analytics {
                generation,
                key,
                result: Ok(snapshot(total)),
            }),
            other => panic!("unexpected request {other:?}"),
        }
    }

    fn ready_dashboard(account_id: AccountId, statements: &[StatementId]) -> Dashboard {
        let mut dashboard = Dashboard::new();
        let follow_up = load_accounts(&mut dashboard, None, &[account_id]);
        for request in &follow_up {
            assert!(complete(&mut dashboard, request, statements, 100.0).committed);
        }
        dashboard
    }

    #[test]
    fn test_empty_account_list_goes_to_onboarding() {
        let mut dashboard = Dashboard::new();
        let follow_up = load_accounts(&mut dashboard, None, &[]);
        assert!(follow_up.is_empty());
        assert_eq!(dashboard.phase(), Phase::Onboarding);
        assert_eq!(dashboard.selection().account(), None);
    }

    #[test]
    fn test_first_account_selected_with_concurrent_fetches() {
        let mut dashboard = Dashboard::new();
        let follow_up = load_accounts(&mut dashboard, None, &[5, 6]);

        assert_eq!(dashboard.phase(), Phase::Ready);
        assert_eq!(dashboard.selection().account(), Some(5));
        assert_eq!(follow_up.len(), 2);
        assert!(matches!(follow_up[0], FetchRequest::Statements { account: 5, .. }));
        assert!(matches!(
            follow_up[1],
            FetchRequest::Analytics { key: (5, StatementFilter::All), .. }
        ));

        // Completion order does not matter
        assert!(complete(&mut dashboard, &follow_up[1], &[], 42.0).committed);
        assert!(complete(&mut dashboard, &follow_up[0], &[1, 2], 0.0).committed);
        assert_eq!(dashboard.accounts().map(|a| a.len()), Some(2));
        assert_eq!(dashboard.statements().map(|s| s.len()), Some(2));
        assert_eq!(dashboard.analytics().map(|a| a.summary.total_spending), Some(42.0));
        assert!(!dashboard.is_loading());
    }

    #[test]
    fn test_remembered_account_preferred_when_present() {
        let mut dashboard = Dashboard::new();
        load_accounts(&mut dashboard, Some(6), &[5, 6]);
        assert_eq!(dashboard.selection().account(), Some(6));

        let mut dashboard = Dashboard::new();
        load_accounts(&mut dashboard, Some(99), &[5, 6]);
        assert_eq!(dashboard.selection().account(), Some(5));
    }

    #[test]
    fn test_account_change_resets_selection_and_supersedes_fetches() {
        let mut dashboard = ready_dashboard(1, &[10, 11]);
        let requests = dashboard.select_statement(StatementFilter::Statement(10)).unwrap();
        let old_analytics = requests[0].clone();
        dashboard
            .select_category(CategoryFilter::Category("Travel".to_string()))
            .unwrap();

        // Second account appears after a refresh
        let generation = accounts_generation(&dashboard.refresh_accounts());
        dashboard.apply(FetchOutcome::Accounts {
            generation,
            result: Ok(vec![account(1), account(2)]),
        });

        let requests = dashboard.select_account(2).unwrap();
        assert_eq!(dashboard.selection().account(), Some(2));
        assert_eq!(dashboard.selection().statement(), StatementFilter::All);
        assert_eq!(dashboard.selection().category(), &CategoryFilter::All);
        assert_eq!(dashboard.category_transactions_slot().status(), SlotStatus::Absent);
        assert_eq!(requests.len(), 2);

        // The late response for account 1 is dropped
        assert!(!complete(&mut dashboard, &old_analytics, &[], 1.0).committed);
        assert_eq!(dashboard.analytics(), None);
    }

    #[test]
    fn test_select_unknown_account_or_statement_is_rejected() {
        let mut dashboard = ready_dashboard(1, &[10]);
        assert!(matches!(dashboard.select_account(7), Err(DashboardError::UnknownAccount(7))));
        assert!(matches!(
            dashboard.select_statement(StatementFilter::Statement(99)),
            Err(DashboardError::UnknownStatement(99))
        ));
        assert_eq!(dashboard.selection().statement(), StatementFilter::All);
    }

    #[test]
    fn test_late_response_for_previous_statement_is_discarded() {
        let mut dashboard = ready_dashboard(1, &[10, 11]);
        let first = dashboard.select_statement(StatementFilter::Statement(10)).unwrap();
        let second = dashboard.select_statement(StatementFilter::Statement(11)).unwrap();

        // stmt 10 arrives late, after stmt 11 was selected
        assert!(!complete(&mut dashboard, &first[0], &[], 10.0).committed);
        assert_eq!(dashboard.analytics(), None);
        assert!(dashboard.analytics_slot().is_loading());

        assert!(complete(&mut dashboard, &second[0], &[], 11.0).committed);
        assert_eq!(dashboard.analytics().map(|a| a.summary.total_spending), Some(11.0));

        // Even later, still discarded
        assert!(!complete(&mut dashboard, &first[0], &[], 10.0).committed);
        assert_eq!(dashboard.analytics().map(|a| a.summary.total_spending), Some(11.0));
    }

    #[test]
    fn test_statement_change_discards_category_transactions() {
        let mut dashboard = ready_dashboard(1, &[10]);
        let requests = dashboard
            .select_category(CategoryFilter::Category("Travel".to_string()))
            .unwrap();
        let FetchRequest::CategoryTransactions { generation, key } = requests[0].clone() else {
            panic!("expected category fetch");
        };
        assert_eq!(key.statement, StatementFilter::All);
        dashboard.apply(FetchOutcome::CategoryTransactions {
            generation,
            key,
            result: Ok(vec![transaction(1, "Travel")]),
        });
        assert_eq!(dashboard.category_transactions().map(|t| t.len()), Some(1));

        let requests = dashboard.select_statement(StatementFilter::Statement(10)).unwrap();
        assert_eq!(requests.len(), 1);
        assert!(matches!(
            requests[0],
            FetchRequest::Analytics { key: (1, StatementFilter::Statement(10)), .. }
        ));
        assert_eq!(dashboard.selection().category(), &CategoryFilter::All);
        assert_eq!(dashboard.category_transactions_slot().status(), SlotStatus::Absent);
    }

    #[test]
    fn test_selecting_all_categories_clears_without_fetch() {
        let mut dashboard = ready_dashboard(1, &[]);
        let requests = dashboard
            .select_category(CategoryFilter::Category("Travel".to_string()))
            .unwrap();
        let FetchRequest::CategoryTransactions { generation, key } = requests[0].clone() else {
            panic!("expected category fetch");
        };
        dashboard.apply(FetchOutcome::CategoryTransactions {
            generation,
            key: key.clone(),
            result: Ok(vec![transaction(1, "Travel")]),
        });

        let requests = dashboard.select_category(CategoryFilter::All).unwrap();
        assert!(requests.is_empty());
        assert_eq!(dashboard.category_transactions_slot().status(), SlotStatus::Absent);
        assert_eq!(dashboard.category_transactions(), None);
    }

    #[test]
    fn test_fetch_failure_keeps_previous_value() {
        let mut dashboard = ready_dashboard(1, &[10]);
        let requests = dashboard.select_statement(StatementFilter::All).unwrap();
        let FetchRequest::Analytics { generation, key } = requests[0].clone() else {
            panic!("expected analytics fetch");
        };
        let applied = dashboard.apply(FetchOutcome::Analytics {
            generation,
            key,
            result: Err(ApiError::ServerError("boom".to_string())),
        });
        assert!(applied.committed);
        assert!(!applied.session_expired);
        assert_eq!(dashboard.analytics().map(|a| a.summary.total_spending), Some(100.0));
        assert!(dashboard.analytics_slot().error().unwrap().contains("boom"));
        // Other slots are unaffected
        assert_eq!(dashboard.statements_slot().error(), None);
    }

    #[test]
    fn test_session_expired_failure_is_flagged() {
        let mut dashboard = Dashboard::new();
        let generation = accounts_generation(&dashboard.start(None));
        let applied = dashboard.apply(FetchOutcome::Accounts {
            generation,
            result: Err(ApiError::SessionExpired),
        });
        assert!(applied.session_expired);
        assert_eq!(dashboard.phase(), Phase::Initial);
    }

    #[test]
    fn test_deleting_selected_statement_forces_all_with_one_analytics_fetch() {
        let mut dashboard = ready_dashboard(1, &[10, 11]);
        dashboard.select_statement(StatementFilter::Statement(10)).unwrap();

        assert!(matches!(
            dashboard.check_statement_deletable(11),
            Err(DashboardError::StatementNotSelected(11))
        ));
        assert_eq!(dashboard.check_statement_deletable(10).unwrap(), 1);

        let refetch = dashboard.refresh_statements().unwrap();
        assert!(complete(&mut dashboard, &refetch, &[11], 0.0).committed);

        let requests = dashboard.statement_deleted(10).unwrap();
        assert_eq!(dashboard.selection().statement(), StatementFilter::All);
        assert_eq!(requests.len(), 1);
        assert!(matches!(
            requests[0],
            FetchRequest::Analytics { key: (1, StatementFilter::All), .. }
        ));
    }

    #[test]
    fn test_cannot_delete_when_all_selected() {
        let dashboard = ready_dashboard(1, &[10]);
        assert!(matches!(
            dashboard.check_statement_deletable(10),
            Err(DashboardError::StatementNotSelected(10))
        ));
    }

    #[test]
    fn test_upload_refetches_current_selection_only() {
        let mut dashboard = ready_dashboard(1, &[10]);
        dashboard.select_statement(StatementFilter::Statement(10)).unwrap();
        let requests = dashboard.statement_uploaded(1);
        assert_eq!(requests.len(), 2);
        assert!(matches!(
            requests[1],
            FetchRequest::Analytics { key: (1, StatementFilter::Statement(10)), .. }
        ));
        assert!(dashboard.statement_uploaded(2).is_empty());
    }

    #[test]
    fn test_refresh_accounts_keeps_existing_selection() {
        let mut dashboard = ready_dashboard(1, &[10]);
        let generation = accounts_generation(&dashboard.refresh_accounts());
        let applied = dashboard.apply(FetchOutcome::Accounts {
            generation,
            result: Ok(vec![account(1), account(2)]),
        });
        assert!(applied.follow_up.is_empty());
        assert_eq!(dashboard.selection().account(), Some(1));
    }

    #[test]
    fn test_deleting_selected_account_reselects() {
        let mut dashboard = ready_dashboard(1, &[10]);
        let generation = accounts_generation(&dashboard.account_deleted(1));
        assert_eq!(dashboard.phase(), Phase::Initial);
        assert_eq!(dashboard.preferred_account(), None);
        let applied = dashboard.apply(FetchOutcome::Accounts {
            generation,
            result: Ok(vec![account(2)]),
        });
        assert_eq!(applied.follow_up.len(), 2);
        assert_eq!(dashboard.selection().account(), Some(2));
    }

    #[test]
    fn test_deleting_other_account_keeps_selection() {
        let mut dashboard = ready_dashboard(1, &[10]);
        let generation = accounts_generation(&dashboard.account_deleted(2));
        dashboard.apply(FetchOutcome::Accounts {
            generation,
            result: Ok(vec![account(3), account(1)]),
        });
        assert_eq!(dashboard.selection().account(), Some(1));
        assert_eq!(dashboard.phase(), Phase::Ready);
    }

    #[test]
    fn test_onboarding_ends_when_an_account_appears() {
        let mut dashboard = Dashboard::new();
        load_accounts(&mut dashboard, None, &[]);
        assert_eq!(dashboard.phase(), Phase::Onboarding);

        let generation = accounts_generation(&dashboard.refresh_accounts());
        let applied = dashboard.apply(FetchOutcome::Accounts {
            generation,
            result: Ok(vec![account(3)]),
        });
        assert_eq!(applied.follow_up.len(), 2);
        assert_eq!(dashboard.phase(), Phase::Ready);
    }

    #[test]
    fn test_teardown_discards_everything_in_flight() {
        let mut dashboard = ready_dashboard(1, &[10]);
        let requests = dashboard.select_statement(StatementFilter::Statement(10)).unwrap();
        dashboard.teardown();
        assert!(!complete(&mut dashboard, &requests[0], &[], 5.0).committed);
        assert!(!dashboard.is_loading());
    }

    #[test]
    fn test_stale_session_expiry_is_still_flagged() {
        let mut dashboard = ready_dashboard(1, &[10, 11]);
        let old = dashboard.select_statement(StatementFilter::Statement(10)).unwrap();
        dashboard.select_statement(StatementFilter::Statement(11)).unwrap();
        let FetchRequest::Analytics { generation, key } = old[0].clone() else {
            panic!("expected analytics fetch");
        };

        let applied = dashboard.apply(FetchOutcome::Analytics {
            generation,
            key,
            result: Err(ApiError::SessionExpired),
        });
        assert!(!applied.committed);
        assert!(applied.session_expired);
        assert_eq!(dashboard.analytics_slot().error(), None);
    }

    #[test]
    fn test_reset_keeps_old_tickets_stale() {
        let mut dashboard = Dashboard::new();
        let old = accounts_generation(&dashboard.start(None));
        dashboard.reset();
        let applied = dashboard.apply(FetchOutcome::Accounts {
            generation: old,
            result: Ok(vec![account(1)]),
        });
        assert!(!applied.committed);
        assert_eq!(dashboard.selection().account(), None);
    }

    #[test]
    fn test_operations_without_account_fail() {
        let mut dashboard = Dashboard::new();
        assert!(matches!(
            dashboard.select_statement(StatementFilter::All),
            Err(DashboardError::NoAccountSelected)
        ));
        assert!(matches!(
            dashboard.select_category(CategoryFilter::All),
            Err(DashboardError::NoAccountSelected)
        ));
        assert!(dashboard.refresh_statements().is_err());
    }
}
