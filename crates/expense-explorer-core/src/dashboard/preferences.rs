//! Remembered dashboard choices.
//!
//! Stored as `preferences.json` in the data directory, next to the session
//! file. Only the last selected bank account is kept.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::AccountId;

const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default)]
    last_bank_account: Option<AccountId>,
}

#[derive(Debug, Clone)]
pub struct Preferences {
    path: Option<PathBuf>,
    stored: StoredPreferences,
}

impl Preferences {
    /// Load preferences from `dir`. A missing or unreadable file yields
    /// empty preferences.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(PREFERENCES_FILE);
        let stored = match Self::read(&path) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Ignoring unreadable preferences");
                StoredPreferences::default()
            }
        };
        Self {
            path: Some(path),
            stored,
        }
    }

    /// Preferences that live only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            stored: StoredPreferences::default(),
        }
    }

    fn read(path: &Path) -> Result<StoredPreferences> {
        if !path.exists() {
            return Ok(StoredPreferences::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.stored)?)?;
        Ok(())
    }

    pub fn last_account(&self) -> Option<AccountId> {
        self.stored.last_bank_account
    }

    pub fn remember_account(&mut self, account: AccountId) {
        if self.stored.last_bank_account == Some(account) {
            return;
        }
        debug!(account, "Remembering bank account");
        self.stored.last_bank_account = Some(account);
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save preferences");
        }
    }

    /// Forget everything, e.g. on logout.
    pub fn forget(&mut self) {
        self.stored = StoredPreferences::default();
        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(error = %e, "Failed to remove preferences");
                }
            }
        }
    }
}
