//! Bankline CLI - demo bank ledger from the terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;
mod server;

use bankline_core::LogEvent;
use commands::{
    accounts, admin, history, logs, notifications, register, serve, status, transfer, verify,
};

/// Bankline - demo bank ledger
#[derive(Parser)]
#[command(name = "bankline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user (opens Checking and Savings accounts)
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        /// Prompted for when omitted
        #[arg(long, env = "BANKLINE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a user's accounts
    Accounts {
        /// User ID
        user_id: String,
        #[arg(long)]
        json: bool,
    },

    /// Show who owns an account number
    Verify {
        account_number: String,
        #[arg(long)]
        json: bool,
    },

    /// Send money from an account
    Transfer {
        /// Source account ID
        #[arg(long)]
        from: String,
        /// Destination account number; omit for a payment leaving the bank
        #[arg(long)]
        to: Option<String>,
        /// Amount, e.g. 40 or 12.50
        amount: String,
        /// internal, external or wire
        #[arg(long = "type", default_value = "internal")]
        kind: String,
        #[arg(long)]
        description: Option<String>,
        /// Recipient name for payments leaving the bank
        #[arg(long)]
        recipient: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show a user's transactions, newest first
    History {
        /// User ID
        user_id: String,
        /// Show at most N transactions
        #[arg(short, long)]
        limit: Option<usize>,
        /// Write a CSV statement to this file instead of printing
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Manage notifications
    Notifications {
        #[command(subcommand)]
        command: notifications::NotificationsCommands,
    },

    /// Administrative adjustments and reports
    Admin {
        #[command(subcommand)]
        command: admin::AdminCommands,
    },

    /// Show store summary
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Address to listen on (defaults to server.listenAddr)
        #[arg(long)]
        listen: Option<String>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Name recorded in the event log; never includes arguments
    fn log_name(&self) -> &'static str {
        match self {
            Commands::Register { .. } => "register",
            Commands::Accounts { .. } => "accounts",
            Commands::Verify { .. } => "verify",
            Commands::Transfer { .. } => "transfer",
            Commands::History { .. } => "history",
            Commands::Notifications { .. } => "notifications",
            Commands::Admin { .. } => "admin",
            Commands::Status { .. } => "status",
            Commands::Serve { .. } => "serve",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.log_name();

    let result = run(cli);

    // Opened after the command so it never shares logs.duckdb with `serve`
    let logger = commands::get_logger();
    match result {
        Ok(()) => {
            commands::log_event(&logger, LogEvent::new("command_executed").with_command(command));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let mut event = LogEvent::new("command_failed").with_command(command);
            if let Some(ledger_err) = e.downcast_ref::<bankline_core::Error>() {
                event = event.with_ledger_error(ledger_err);
            }
            commands::log_event(&logger, event);
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register {
            first_name,
            last_name,
            email,
            phone,
            password,
            json,
        } => register::run(register::RegisterArgs {
            first_name,
            last_name,
            email,
            phone,
            password,
            json,
        }),
        Commands::Accounts { user_id, json } => accounts::run(&user_id, json),
        Commands::Verify {
            account_number,
            json,
        } => verify::run(&account_number, json),
        Commands::Transfer {
            from,
            to,
            amount,
            kind,
            description,
            recipient,
            json,
        } => transfer::run(transfer::TransferArgs {
            from,
            to,
            amount,
            kind,
            description,
            recipient,
            json,
        }),
        Commands::History {
            user_id,
            limit,
            csv,
            json,
        } => history::run(&user_id, limit, csv, json),
        Commands::Notifications { command } => notifications::run(command),
        Commands::Admin { command } => admin::run(command),
        Commands::Status { json } => status::run(json),
        Commands::Serve { listen } => serve::run(listen),
        Commands::Logs { command } => logs::run(command),
    }
}
