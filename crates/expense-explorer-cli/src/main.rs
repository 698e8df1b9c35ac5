//! Expense Explorer - command line client for the personal-finance dashboard.
//!
//! Log in once, then explore bank accounts, statements and spending
//! analytics served by the Expense Explorer backend.

mod commands;
mod format;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use expense_explorer_core::{ApiError, DashboardError};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Context;

#[derive(Parser)]
#[command(name = "expense-explorer", version)]
#[command(about = "Explore spending across your bank statements", long_about = None)]
struct Cli {
    /// API root, e.g. http://localhost:8000/api (overrides config and environment)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Create a user and log in
    Register {
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged in user
    Whoami,
    /// List bank accounts
    Accounts,
    /// Add a bank account
    CreateAccount {
        bank_name: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// Delete a bank account and its statements
    DeleteAccount { id: i64 },
    /// List statements of an account
    Statements {
        #[arg(long)]
        account: Option<i64>,
    },
    /// Upload a CSV or PDF statement
    Upload {
        path: PathBuf,
        #[arg(long)]
        account: Option<i64>,
        /// Label shown instead of the upload date
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a statement
    DeleteStatement {
        id: i64,
        #[arg(long)]
        account: Option<i64>,
    },
    /// Show spending analytics
    Dashboard {
        #[arg(long)]
        account: Option<i64>,
        /// Statement id or "all"
        #[arg(long)]
        statement: Option<String>,
        /// Category name or "all"
        #[arg(long)]
        category: Option<String>,
    },
    /// Save the dashboard as a PDF report
    Export {
        #[arg(long)]
        account: Option<i64>,
        #[arg(long)]
        statement: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(path.as_os_str());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// True when the failure means the user must log in again.
fn requires_login(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<ApiError>() {
        return e.requires_login();
    }
    if let Some(e) = error.downcast_ref::<DashboardError>() {
        return e.requires_login();
    }
    false
}

async fn run(cli: Cli, ctx: &Context) -> Result<()> {
    match cli.command {
        Commands::Login { username } => commands::login(ctx, username).await,
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
        } => commands::register(ctx, username, email, first_name, last_name).await,
        Commands::Logout => commands::logout(ctx),
        Commands::Whoami => commands::whoami(ctx),
        Commands::Accounts => commands::accounts(ctx).await,
        Commands::CreateAccount {
            bank_name,
            nickname,
            currency,
        } => commands::create_account(ctx, bank_name, nickname, currency).await,
        Commands::DeleteAccount { id } => commands::delete_account(ctx, id).await,
        Commands::Statements { account } => commands::statements(ctx, account).await,
        Commands::Upload {
            path,
            account,
            name,
        } => commands::upload(ctx, &path, account, name).await,
        Commands::DeleteStatement { id, account } => {
            commands::delete_statement(ctx, id, account).await
        }
        Commands::Dashboard {
            account,
            statement,
            category,
        } => commands::dashboard(ctx, account, statement, category).await,
        Commands::Export {
            account,
            statement,
            output,
        } => commands::export(ctx, account, statement, &output).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());
    info!("Expense Explorer starting");

    let ctx = match Context::load(cli.api_url.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if requires_login(&e) => {
            warn!(error = %e, "Session is no longer valid");
            ctx.forget_session();
            eprintln!("Session expired, please log in with `expense-explorer login`.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_dashboard_filters() {
        let cli = Cli::try_parse_from([
            "expense-explorer",
            "dashboard",
            "--account",
            "3",
            "--statement",
            "all",
            "--category",
            "Groceries",
        ])
        .unwrap();
        match cli.command {
            Commands::Dashboard {
                account,
                statement,
                category,
            } => {
                assert_eq!(account, Some(3));
                assert_eq!(statement.as_deref(), Some("all"));
                assert_eq!(category.as_deref(), Some("Groceries"));
            }
            _ => panic!("expected dashboard command"),
        }
    }

    #[test]
    fn test_export_requires_output() {
        assert!(Cli::try_parse_from(["expense-explorer", "export"]).is_err());
    }

    #[test]
    fn test_session_errors_require_login() {
        assert!(requires_login(&anyhow::Error::new(ApiError::SessionExpired)));
        assert!(requires_login(&anyhow::Error::new(DashboardError::Api(
            ApiError::NotAuthenticated
        ))));
        assert!(!requires_login(&anyhow::Error::new(ApiError::RateLimited)));
        assert!(!requires_login(&anyhow::anyhow!("disk full")));
    }
}
