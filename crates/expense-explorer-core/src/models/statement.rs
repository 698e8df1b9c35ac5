use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;

pub type StatementId = i64;

/// Format of an uploaded statement file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Pdf,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Pdf => "pdf",
        }
    }

    /// Guess the file type from a file name extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileType::Csv),
            "pdf" => Some(FileType::Pdf),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FileType::Csv => "text/csv",
            FileType::Pdf => "application/pdf",
        }
    }
}

/// An uploaded statement belonging to one bank account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub name: String,
    pub file_type: FileType,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, deserialize_with = "super::amount::deserialize")]
    pub total_amount: f64,
    #[serde(default)]
    pub transaction_count: u32,
}

impl Statement {
    /// User label when given, otherwise "Statement #id (date)".
    pub fn label(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        match self.uploaded_at {
            Some(at) => format!("Statement #{} ({})", self.id, at.format("%Y-%m-%d")),
            None => format!("Statement #{}", self.id),
        }
    }
}

/// Multipart upload to `POST /statements/upload/`.
#[derive(Debug, Clone)]
pub struct UploadStatement {
    pub bank_account: AccountId,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub file_type: FileType,
    pub name: Option<String>,
}

/// What the backend reports after parsing an uploaded statement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadSummary {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub transaction_count: u32,
    #[serde(default, deserialize_with = "super::amount::deserialize")]
    pub total_amount: f64,
    #[serde(default)]
    pub total_income: Option<f64>,
}
