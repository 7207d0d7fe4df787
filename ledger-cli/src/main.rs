//! Ledger CLI - savings accounts in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;
mod output;

use commands::{
    balance, close, deposit, list, logs, menu, open, register, status, transfer, withdraw,
    UserArgs,
};
use ledger_core::AccountNumber;

/// Ledger - savings accounts in your terminal
#[derive(Parser)]
#[command(name = "ledger", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user who can log in
    Register {
        /// Username (matched exactly)
        username: String,
        /// Contact email
        #[arg(long)]
        email: String,
        /// Login password (or LEDGER_USER_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open a savings account
    Open(open::OpenArgs),

    /// Deposit into an account
    Deposit {
        #[command(flatten)]
        user: UserArgs,
        /// Account number
        account: AccountNumber,
        /// Amount to deposit
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Withdraw from an account
    Withdraw {
        #[command(flatten)]
        user: UserArgs,
        /// Account number
        account: AccountNumber,
        /// Amount to withdraw
        amount: Decimal,
        /// Account password (or LEDGER_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move money between accounts
    Transfer {
        #[command(flatten)]
        user: UserArgs,
        /// Source account number
        from: AccountNumber,
        /// Destination account number
        to: AccountNumber,
        /// Amount to move
        amount: Decimal,
        /// Source account password (or LEDGER_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account balance
    Balance {
        #[command(flatten)]
        user: UserArgs,
        /// Account number
        account: AccountNumber,
        /// Account password (or LEDGER_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Close an account
    Close {
        #[command(flatten)]
        user: UserArgs,
        /// Account number
        account: AccountNumber,
        /// Account password (or LEDGER_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all accounts
    List {
        #[command(flatten)]
        user: UserArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the database and show totals
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive menu
    Menu {
        /// Username to log in as
        #[arg(long, short = 'u')]
        user: Option<String>,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { username, email, password, json } => {
            register::run(username, email, password, json)
        }
        Commands::Open(args) => open::run(args),
        Commands::Deposit { user, account, amount, json } => {
            deposit::run(user, account, amount, json)
        }
        Commands::Withdraw { user, account, amount, password, json } => {
            withdraw::run(user, account, amount, password, json)
        }
        Commands::Transfer { user, from, to, amount, password, json } => {
            transfer::run(user, from, to, amount, password, json)
        }
        Commands::Balance { user, account, password, json } => {
            balance::run(user, account, password, json)
        }
        Commands::Close { user, account, password, force, json } => {
            close::run(user, account, password, force, json)
        }
        Commands::List { user, json } => list::run(user, json),
        Commands::Status { json } => status::run(json),
        Commands::Menu { user } => menu::run(user),
        Commands::Logs { command } => logs::run(command),
    }
}
