//! Subcommand implementations.
//!
//! Every command builds an `ApiClient` over the session file in the data
//! directory. Commands that show dashboard data go through a
//! `DashboardController` so account defaults and selection rules are the
//! same as in any other front end.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use expense_explorer_core::config::ENV_PASSWORD;
use expense_explorer_core::dashboard::{CategoryFilter, DashboardController, Phase, StatementFilter};
use expense_explorer_core::models::{AccountId, NewAccount, Registration, StatementId};
use expense_explorer_core::{ApiClient, Config, FileSessionStore, Preferences};
use tracing::{debug, info, warn};

use crate::format;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 150;

/// Shared state for one command invocation.
pub struct Context {
    pub config: Config,
    pub data_dir: PathBuf,
}

impl Context {
    pub fn load(api_url: Option<String>) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(url) = api_url {
            config.api_base_url = Some(url);
        }
        let data_dir = config.data_dir()?;
        debug!(data_dir = %data_dir.display(), "Context loaded");
        Ok(Self { config, data_dir })
    }

    pub fn client(&self) -> Result<ApiClient> {
        let store = FileSessionStore::new(&self.data_dir);
        Ok(ApiClient::new(self.config.client_options(), store)?)
    }

    pub fn preferences(&self) -> Preferences {
        Preferences::load(&self.data_dir)
    }

    /// Drop everything remembered for the current session.
    pub fn forget_session(&self) {
        self.preferences().forget();
        match self.client() {
            Ok(client) => client.logout(),
            Err(e) => warn!(error = %e, "Could not clear session"),
        }
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_username(default: Option<&str>) -> Result<String> {
    let username = match default {
        Some(default) => {
            let entered = prompt_line(&format!("Username [{}]", default))?;
            if entered.is_empty() {
                default.to_string()
            } else {
                entered
            }
        }
        None => prompt_line("Username")?,
    };
    if username.is_empty() {
        bail!("Username is required");
    }
    if username.len() > MAX_USERNAME_LENGTH {
        bail!("Username is longer than {} characters", MAX_USERNAME_LENGTH);
    }
    Ok(username)
}

fn password_from_env_or_prompt() -> Result<String> {
    if let Ok(password) = std::env::var(ENV_PASSWORD) {
        if !password.is_empty() {
            debug!("Using password from environment");
            return Ok(password);
        }
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}

// ============================================================================
// Authentication
// ============================================================================

pub async fn login(ctx: &Context, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt_username(ctx.config.last_username.as_deref())?,
    };
    let password = password_from_env_or_prompt()?;

    let client = ctx.client()?;
    let user = client.login(&username, &password).await?;
    // A new login starts from a clean slate
    ctx.preferences().forget();
    if let Err(e) = Config::remember_username(&username) {
        warn!(error = %e, "Failed to save username");
    }

    println!("Logged in as {}", user.display_name());
    Ok(())
}

pub async fn register(
    ctx: &Context,
    username: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<()> {
    let password = password_from_env_or_prompt()?;
    if std::env::var(ENV_PASSWORD).is_err() {
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if confirm != password {
            bail!("Passwords do not match");
        }
    }

    let registration = Registration {
        username: username.clone(),
        password,
        email: email.unwrap_or_default(),
        first_name: first_name.unwrap_or_default(),
        last_name: last_name.unwrap_or_default(),
    };
    let client = ctx.client()?;
    let user = client.register(&registration).await?;
    ctx.preferences().forget();
    if let Err(e) = Config::remember_username(&username) {
        warn!(error = %e, "Failed to save username");
    }

    println!("Registered and logged in as {}", user.display_name());
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    DashboardController::new(ctx.client()?, ctx.preferences()).logout();
    println!("Logged out");
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    match client.current_user() {
        Some(user) => {
            println!("{} ({})", user.display_name(), user.username);
            if !user.email.is_empty() {
                println!("{}", user.email);
            }
        }
        None if client.is_authenticated() => println!("Logged in"),
        None => println!("Not logged in"),
    }
    println!("API: {}", client.base_url());
    Ok(())
}

// ============================================================================
// Bank accounts
// ============================================================================

pub async fn accounts(ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let accounts = client.list_accounts().await?;
    print!("{}", format::render_accounts(&accounts, ctx.preferences().last_account()));
    Ok(())
}

pub async fn create_account(
    ctx: &Context,
    bank_name: String,
    nickname: Option<String>,
    currency: String,
) -> Result<()> {
    let mut controller = DashboardController::new(ctx.client()?, ctx.preferences());
    let account = controller
        .create_account(&NewAccount {
            bank_name,
            account_nickname: nickname.filter(|n| !n.trim().is_empty()),
            currency: currency.to_uppercase(),
        })
        .await?;
    controller.settle().await?;
    println!("Created account {} ({})", account.id, account.display_name());
    if let Some(selected) = controller.dashboard().selected_account() {
        println!("Dashboard account: {}", selected.display_name());
    }
    Ok(())
}

pub async fn delete_account(ctx: &Context, account: AccountId) -> Result<()> {
    let mut controller = open_dashboard(ctx, None).await?;
    controller.delete_account(account).await?;
    controller.settle().await?;
    println!("Deleted account {}", account);
    Ok(())
}

// ============================================================================
// Dashboard
// ============================================================================

/// Load accounts and select `account`, or the remembered/first one.
async fn open_dashboard(ctx: &Context, account: Option<AccountId>) -> Result<DashboardController> {
    let mut controller = DashboardController::new(ctx.client()?, ctx.preferences());
    controller.start();
    controller.settle().await?;

    if controller.dashboard().phase() == Phase::Onboarding {
        bail!("No bank accounts yet. Add one with `expense-explorer create-account`.");
    }
    if let Some(error) = controller.dashboard().accounts_slot().error() {
        bail!("Could not load bank accounts: {}", error);
    }

    if let Some(account) = account {
        if controller.dashboard().selection().account() != Some(account) {
            controller.select_account(account)?;
            controller.settle().await?;
        }
    }
    Ok(controller)
}

fn parse_statement(value: &str) -> Result<StatementFilter> {
    StatementFilter::parse(value)
        .with_context(|| format!("Invalid statement '{}': expected an id or \"all\"", value))
}

/// Print slot errors that left stale data on screen.
fn report_slot_errors(controller: &DashboardController) {
    let dashboard = controller.dashboard();
    for (name, error) in [
        ("statements", dashboard.statements_slot().error()),
        ("analytics", dashboard.analytics_slot().error()),
        ("transactions", dashboard.category_transactions_slot().error()),
    ] {
        if let Some(error) = error {
            eprintln!("Warning: could not refresh {}: {}", name, error);
        }
    }
}

pub async fn statements(ctx: &Context, account: Option<AccountId>) -> Result<()> {
    let controller = open_dashboard(ctx, account).await?;
    if let Some(selected) = controller.dashboard().selected_account() {
        println!("{}\n", selected.display_name());
    }
    match controller.dashboard().statements() {
        Some(statements) => print!("{}", format::render_statements(statements)),
        None => report_slot_errors(&controller),
    }
    Ok(())
}

pub async fn upload(
    ctx: &Context,
    path: &Path,
    account: Option<AccountId>,
    name: Option<String>,
) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file: {}", path.display()))?
        .to_string();
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut controller = open_dashboard(ctx, account).await?;
    let summary = controller.upload_statement(&file_name, bytes, name).await?;
    info!(file = %file_name, transactions = summary.transaction_count, "Upload finished");

    if let Some(message) = &summary.message {
        println!("{}", message);
    }
    println!(
        "{} transactions, total {}",
        summary.transaction_count,
        format::format_amount(summary.total_amount)
    );
    if let Some(income) = summary.total_income {
        println!("Income {}", format::format_amount(income));
    }

    controller.settle().await?;
    report_slot_errors(&controller);
    Ok(())
}

pub async fn delete_statement(
    ctx: &Context,
    statement: StatementId,
    account: Option<AccountId>,
) -> Result<()> {
    let mut controller = open_dashboard(ctx, account).await?;
    controller.select_statement(StatementFilter::Statement(statement))?;
    controller.settle().await?;

    controller.delete_statement(statement).await?;
    controller.settle().await?;
    println!("Deleted statement {}", statement);

    if let Some(statements) = controller.dashboard().statements() {
        print!("{}", format::render_statements(statements));
    }
    report_slot_errors(&controller);
    Ok(())
}

pub async fn dashboard(
    ctx: &Context,
    account: Option<AccountId>,
    statement: Option<String>,
    category: Option<String>,
) -> Result<()> {
    let mut controller = open_dashboard(ctx, account).await?;

    if let Some(statement) = statement.as_deref() {
        let filter = parse_statement(statement)?;
        if !filter.is_all() {
            controller.select_statement(filter)?;
            controller.settle().await?;
        }
    }
    if let Some(category) = category.as_deref() {
        controller.select_category(CategoryFilter::parse(category))?;
        controller.settle().await?;
    }

    print!("{}", format::render_dashboard(controller.dashboard()));
    report_slot_errors(&controller);
    Ok(())
}

pub async fn export(
    ctx: &Context,
    account: Option<AccountId>,
    statement: Option<String>,
    output: &Path,
) -> Result<()> {
    let mut controller = open_dashboard(ctx, account).await?;
    if let Some(statement) = statement.as_deref() {
        let filter = parse_statement(statement)?;
        if !filter.is_all() {
            controller.select_statement(filter)?;
            controller.settle().await?;
        }
    }

    let pdf = controller.export_dashboard().await?;
    std::fs::write(output, &pdf).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} ({} bytes)", output.display(), pdf.len());
    Ok(())
}
