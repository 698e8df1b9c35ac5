use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AccountId = i64;

/// A bank account the user uploads statements into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub bank_name: String,
    #[serde(default)]
    pub account_nickname: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub statement_count: u32,
    #[serde(default, deserialize_with = "super::amount::deserialize")]
    pub total_spending: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Account {
    /// Nickname if set, otherwise the bank name.
    pub fn display_name(&self) -> &str {
        if self.account_nickname.trim().is_empty() {
            &self.bank_name
        } else {
            &self.account_nickname
        }
    }
}

/// Body of `POST /bank-accounts/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub bank_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_nickname: Option<String>,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account_with_decimal_string() {
        let json = r#"{"id": 3, "bank_name": "Chase", "account_nickname": "", "currency": "USD", "created_at": "2025-01-04T10:00:00Z", "statement_count": 2, "total_spending": "431.10"}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.id, 3);
        assert_eq!(account.statement_count, 2);
        assert!((account.total_spending - 431.10).abs() < 1e-9);
        assert_eq!(account.display_name(), "Chase");
    }

    #[test]
    fn test_display_name_prefers_nickname() {
        let json = r#"{"id": 1, "bank_name": "Chase", "account_nickname": "Sapphire"}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.display_name(), "Sapphire");
        assert_eq!(account.currency, "USD");
    }

    #[test]
    fn test_new_account_skips_missing_nickname() {
        let body = NewAccount {
            bank_name: "Amex".to_string(),
            account_nickname: None,
            currency: "EUR".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"bank_name": "Amex", "currency": "EUR"})
        );
    }
}
