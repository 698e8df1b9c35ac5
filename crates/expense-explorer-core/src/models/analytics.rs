use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Weekday keys used by `spending_by_day`, in display order.
pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Server-computed dashboard numbers for an account, optionally narrowed to
/// one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    #[serde(default)]
    pub summary: AnalyticsSummary,
    #[serde(default)]
    pub top_expenses: Vec<CategoryTotal>,
    #[serde(default)]
    pub lowest_expenses: Vec<CategoryTotal>,
    #[serde(default)]
    pub spending_by_day: HashMap<String, f64>,
    #[serde(default)]
    pub monthly_trend: Vec<MonthlyTotal>,
    #[serde(default)]
    pub category_distribution: Vec<CategoryShare>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    #[serde(default, deserialize_with = "super::amount::deserialize")]
    pub total_spending: f64,
    #[serde(default, deserialize_with = "super::amount::deserialize")]
    pub total_income: f64,
    #[serde(default)]
    pub total_transactions: u64,
    #[serde(default)]
    pub total_categories: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub total: f64,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: String,
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    #[serde(deserialize_with = "super::amount::deserialize")]
    pub amount: f64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub amount: Option<String>,
}

impl AnalyticsSnapshot {
    /// Spending per weekday in Sun..Sat order; missing days are zero.
    pub fn spending_by_weekday(&self) -> Vec<(&'static str, f64)> {
        WEEKDAYS
            .iter()
            .map(|day| (*day, self.spending_by_day.get(*day).copied().unwrap_or(0.0)))
            .collect()
    }

    /// Net of income minus spending for the snapshot.
    pub fn net(&self) -> f64 {
        self.summary.total_income - self.summary.total_spending
    }

    /// Category names present in the distribution, used to offer category filters.
    pub fn categories(&self) -> Vec<&str> {
        self.category_distribution
            .iter()
            .map(|c| c.category.as_str())
            .collect()
    }
}
