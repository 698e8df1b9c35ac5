//! Plain-text rendering of accounts, statements and the dashboard.

use expense_explorer_core::dashboard::Dashboard;
use expense_explorer_core::models::{Account, AccountId, AnalyticsSnapshot, Statement, Transaction};

/// Width of the label column in the dashboard summary
const LABEL_WIDTH: usize = 16;

/// Width of description columns before truncation
const DESCRIPTION_WIDTH: usize = 32;

/// Format an amount with two decimals and thousands separators.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative && fixed != "0.00" {
        format!("-{}.{}", grouped, cents)
    } else {
        format!("{}.{}", grouped, cents)
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn render_accounts(accounts: &[Account], remembered: Option<AccountId>) -> String {
    if accounts.is_empty() {
        return "No bank accounts yet. Add one with `expense-explorer create-account`.\n".to_string();
    }
    let mut out = String::new();
    for account in accounts {
        let marker = if remembered == Some(account.id) { "*" } else { " " };
        out.push_str(&format!(
            "{} {:>4}  {:<24} {:<4} {:>3} statements  {:>14}\n",
            marker,
            account.id,
            truncate_string(account.display_name(), 24),
            account.currency,
            account.statement_count,
            format_amount(account.total_spending),
        ));
    }
    out
}

pub fn render_statements(statements: &[Statement]) -> String {
    if statements.is_empty() {
        return "No statements uploaded for this account.\n".to_string();
    }
    let mut out = String::new();
    for statement in statements {
        let uploaded = statement
            .uploaded_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let status = if statement.processed { "" } else { " (processing)" };
        out.push_str(&format!(
            "{:>5}  {:<32} {:<4} {:<10} {:>5} tx  {:>14}{}\n",
            statement.id,
            truncate_string(&statement.label(), 32),
            statement.file_type.as_str(),
            uploaded,
            statement.transaction_count,
            format_amount(statement.total_amount),
            status,
        ));
    }
    out
}

pub fn render_transactions(transactions: &[Transaction]) -> String {
    let mut out = String::new();
    for t in transactions {
        out.push_str(&format!(
            "  {}  {:<width$} {:>12}\n",
            t.date.format("%Y-%m-%d"),
            truncate_string(&t.description, DESCRIPTION_WIDTH),
            format_amount(t.amount),
            width = DESCRIPTION_WIDTH,
        ));
    }
    out
}

fn render_snapshot(snapshot: &AnalyticsSnapshot, out: &mut String) {
    let summary = &snapshot.summary;
    for (label, value) in [
        ("Spending", summary.total_spending),
        ("Income", summary.total_income),
        ("Net", snapshot.net()),
    ] {
        out.push_str(&format!("{:<LABEL_WIDTH$}{:>14}\n", label, format_amount(value)));
    }
    out.push_str(&format!(
        "{:<LABEL_WIDTH$}{:>14}\n{:<LABEL_WIDTH$}{:>14}\n",
        "Transactions", summary.total_transactions, "Categories", summary.total_categories
    ));

    if !snapshot.category_distribution.is_empty() {
        out.push_str("\nCategories\n");
        for share in &snapshot.category_distribution {
            out.push_str(&format!(
                "  {:<24}{:>14}  {:>5.1}%\n",
                truncate_string(&share.category, 24),
                format_amount(share.amount),
                share.percentage
            ));
        }
    }

    for (title, totals) in [
        ("Top expenses", &snapshot.top_expenses),
        ("Lowest expenses", &snapshot.lowest_expenses),
    ] {
        if totals.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}\n", title));
        for total in totals {
            out.push_str(&format!(
                "  {:<24}{:>14}  ({} tx)\n",
                truncate_string(&total.category, 24),
                format_amount(total.total),
                total.count
            ));
        }
    }

    if !snapshot.spending_by_day.is_empty() {
        out.push_str("\nSpending by weekday\n");
        for (day, amount) in snapshot.spending_by_weekday() {
            out.push_str(&format!("  {:<6}{:>14}\n", day, format_amount(amount)));
        }
    }

    if !snapshot.monthly_trend.is_empty() {
        out.push_str("\nMonthly trend\n");
        for month in &snapshot.monthly_trend {
            out.push_str(&format!("  {:<10}{:>14}\n", month.month, format_amount(month.total)));
        }
    }

    if !snapshot.recommendations.is_empty() {
        out.push_str("\nRecommendations\n");
        for rec in &snapshot.recommendations {
            match &rec.amount {
                Some(amount) => out.push_str(&format!("  - [{}] {} ({})\n", rec.kind, rec.message, amount)),
                None => out.push_str(&format!("  - [{}] {}\n", rec.kind, rec.message)),
            }
        }
    }
}

/// Count, total and average of the rows shown for one category.
pub fn render_category_summary(transactions: &[Transaction]) -> String {
    let total: f64 = transactions.iter().map(|t| t.amount).sum();
    let average = if transactions.is_empty() {
        0.0
    } else {
        total / transactions.len() as f64
    };
    format!(
        "  {:<LABEL_WIDTH$}{:>14}\n  {:<LABEL_WIDTH$}{:>14}\n  {:<LABEL_WIDTH$}{:>14}\n",
        "Transactions",
        transactions.len(),
        "Total",
        format_amount(total),
        "Average",
        format_amount(average),
    )
}

/// The whole dashboard for the current selection.
pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    let account = dashboard
        .selected_account()
        .map(|a| format!("{} ({})", a.display_name(), a.currency))
        .unwrap_or_else(|| "No account selected".to_string());
    let statement = match dashboard.selected_statement() {
        Some(s) => s.label(),
        None => "All statements".to_string(),
    };
    out.push_str(&format!("{} - {}\n\n", account, statement));

    match dashboard.analytics() {
        Some(snapshot) => render_snapshot(snapshot, &mut out),
        None => out.push_str("Analytics unavailable.\n"),
    }

    if let Some(category) = dashboard.selection().category().category() {
        match dashboard.category_transactions() {
            Some([]) => out.push_str(&format!("\n{}: no transactions found.\n", category)),
            Some(rows) => {
                out.push_str(&format!("\n{}\n", category));
                out.push_str(&render_transactions(rows));
                out.push('\n');
                out.push_str(&render_category_summary(rows));
            }
            None => out.push_str(&format!("\n{}: transactions unavailable.\n", category)),
        }
    }
    out
}
