//! Authentication state for the Session Client.
//!
//! This module provides:
//! - `Session`: the process-wide token pair and signed-in user
//! - `SessionStore`: durable storage the session is persisted to, with a
//!   file-backed and an in-memory implementation
//!
//! The session is read once at startup and written on every mutation. Only
//! the API client mutates it.

pub mod session;
pub mod store;

pub use session::{Session, SessionData};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
