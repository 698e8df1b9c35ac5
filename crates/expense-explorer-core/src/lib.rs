//! Expense Explorer core library.
//!
//! - `api`: the Session Client. Bearer tokens, single-flight refresh, typed
//!   calls against the REST backend
//! - `auth`: the persisted session the client owns
//! - `dashboard`: the cascading account → statement → category selection and
//!   the generation-stamped data it fetches
//! - `models`: wire types
//! - `config`: config file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod models;

pub use api::{ApiClient, ApiError, ClientOptions};
pub use auth::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardController, DashboardError, Preferences};
