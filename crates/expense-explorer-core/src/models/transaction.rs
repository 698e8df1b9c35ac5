use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single categorized row of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub amount: f64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    "Other".to_string()
}

impl Transaction {
    pub fn in_category(&self, category: &str) -> bool {
        self.category == category
    }
}
