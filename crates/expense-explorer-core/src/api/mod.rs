//! Session Client for the Expense Explorer REST API.
//!
//! This module provides the `ApiClient`, which attaches the bearer token to
//! every domain request and recovers from an expired access token by running
//! a single shared refresh before retrying the request once.
//!
//! Failures other than a recovered token expiry are returned as `ApiError`.

pub mod client;
pub mod error;
pub mod refresh;
pub mod request;

pub use client::{ApiClient, ClientOptions, DEFAULT_BASE_URL};
pub use error::{ApiError, Result};
pub use refresh::RefreshOutcome;
pub use request::{ApiRequest, Attempt};
