use thiserror::Error;

use crate::api::ApiError;
use crate::models::{AccountId, StatementId};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("No bank account selected")]
    NoAccountSelected,

    #[error("Unknown bank account: {0}")]
    UnknownAccount(AccountId),

    #[error("Unknown statement: {0}")]
    UnknownStatement(StatementId),

    #[error("Statement {0} is not the selected statement")]
    StatementNotSelected(StatementId),

    #[error("Unsupported statement file: {0} (expected .csv or .pdf)")]
    UnsupportedFile(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DashboardError {
    /// True when the user has to log in again before anything else works.
    pub fn requires_login(&self) -> bool {
        matches!(self, DashboardError::Api(e) if e.requires_login())
    }
}
