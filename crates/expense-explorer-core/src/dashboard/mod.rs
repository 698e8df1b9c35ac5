//! Dashboard Controller.
//!
//! The cascading account → statement → category selection and the data it
//! derives. [`Dashboard`] is the synchronous state machine; [`DashboardController`]
//! drives it against the Session Client.

pub mod controller;
pub mod error;
pub mod preferences;
pub mod selection;
pub mod slot;
pub mod state;

pub use controller::DashboardController;
pub use error::DashboardError;
pub use preferences::Preferences;
pub use selection::{CategoryFilter, SelectionState, StatementFilter};
pub use slot::{Generation, Slot, SlotStatus};
pub use state::{AnalyticsKey, Applied, CategoryKey, Dashboard, FetchOutcome, FetchRequest, Phase};
