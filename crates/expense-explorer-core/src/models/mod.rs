//! Data models for the Expense Explorer backend.
//!
//! This module contains the wire types exchanged with the REST API:
//!
//! - `UserSummary`, `AuthTokens`: authentication responses
//! - `Account`, `NewAccount`: bank accounts a user registers
//! - `Statement`, `UploadStatement`, `UploadSummary`: uploaded statements
//! - `Transaction`: individual statement rows
//! - `AnalyticsSnapshot`: the server-computed dashboard numbers

pub mod account;
pub mod amount;
pub mod analytics;
pub mod statement;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountId, NewAccount};
pub use analytics::{
    AnalyticsSnapshot, AnalyticsSummary, CategoryShare, CategoryTotal, MonthlyTotal,
    Recommendation,
};
pub use statement::{FileType, Statement, StatementId, UploadStatement, UploadSummary};
pub use transaction::Transaction;
pub use user::{AccessToken, AuthTokens, Credentials, Registration, UserSummary};
