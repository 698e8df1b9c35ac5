use std::fmt;

use crate::models::{AccountId, StatementId};

/// The `statement` filter: one statement or the whole account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatementFilter {
    #[default]
    All,
    Statement(StatementId),
}

impl StatementFilter {
    /// The statement id to send to the backend, `None` for "all".
    pub fn id(&self) -> Option<StatementId> {
        match self {
            StatementFilter::All => None,
            StatementFilter::Statement(id) => Some(*id),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, StatementFilter::All)
    }

    /// Parse `"all"` or a numeric id.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            Some(StatementFilter::All)
        } else {
            value.parse().ok().map(StatementFilter::Statement)
        }
    }
}

impl From<Option<StatementId>> for StatementFilter {
    fn from(id: Option<StatementId>) -> Self {
        id.map(StatementFilter::Statement).unwrap_or_default()
    }
}

impl fmt::Display for StatementFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementFilter::All => write!(f, "all"),
            StatementFilter::Statement(id) => write!(f, "{}", id),
        }
    }
}

/// The category filter: one category name or every category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    pub fn category(&self) -> Option<&str> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Category(name) => Some(name),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CategoryFilter::All)
    }

    /// `"all"` (any case) or an empty string selects every category.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(value.to_string())
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "all"),
            CategoryFilter::Category(name) => write!(f, "{}", name),
        }
    }
}

/// The cascading account → statement → category selection.
///
/// Downstream filters only mean something relative to the account above
/// them, so the setters reset them together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    account: Option<AccountId>,
    statement: StatementFilter,
    category: CategoryFilter,
}

impl SelectionState {
    pub fn account(&self) -> Option<AccountId> {
        self.account
    }

    pub fn statement(&self) -> StatementFilter {
        self.statement
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    /// Select an account, resetting statement and category to "all".
    pub(crate) fn select_account(&mut self, account: AccountId) {
        self.account = Some(account);
        self.statement = StatementFilter::All;
        self.category = CategoryFilter::All;
    }

    /// Select a statement, resetting category to "all".
    pub(crate) fn select_statement(&mut self, statement: StatementFilter) {
        self.statement = statement;
        self.category = CategoryFilter::All;
    }

    pub(crate) fn select_category(&mut self, category: CategoryFilter) {
        self.category = category;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_change_resets_downstream() {
        let mut selection = SelectionState::default();
        selection.select_account(1);
        selection.select_statement(StatementFilter::Statement(10));
        selection.select_category(CategoryFilter::Category("Travel".to_string()));

        selection.select_account(2);
        assert_eq!(selection.account(), Some(2));
        assert_eq!(selection.statement(), StatementFilter::All);
        assert_eq!(selection.category(), &CategoryFilter::All);
    }

    #[test]
    fn test_statement_change_resets_category_only() {
        let mut selection = SelectionState::default();
        selection.select_account(1);
        selection.select_category(CategoryFilter::Category("Travel".to_string()));
        selection.select_statement(StatementFilter::Statement(10));
        assert_eq!(selection.account(), Some(1));
        assert_eq!(selection.category(), &CategoryFilter::All);
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!(StatementFilter::parse("ALL"), Some(StatementFilter::All));
        assert_eq!(StatementFilter::parse(" 12 "), Some(StatementFilter::Statement(12)));
        assert_eq!(StatementFilter::parse("twelve"), None);
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(""), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse("Food & Dining"),
            CategoryFilter::Category("Food & Dining".to_string())
        );
    }

    #[test]
    fn test_statement_filter_id() {
        assert_eq!(StatementFilter::All.id(), None);
        assert_eq!(StatementFilter::Statement(4).id(), Some(4));
        assert_eq!(StatementFilter::from(None), StatementFilter::All);
        assert_eq!(StatementFilter::from(Some(4)).to_string(), "4");
    }
}
