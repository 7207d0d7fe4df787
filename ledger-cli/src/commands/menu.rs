//! Menu command - interactive terminal session
//!
//! Log in (or register) first; the ledger actions are only offered while the
//! session is active.

use anyhow::{bail, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input, Password, Select};
use rust_decimal::Decimal;

use ledger_core::{
    AccountNumber, EntryPoint, LedgerContext, LogEvent, LoggingService, NewAccount, NewUser,
    Session,
};

use super::{get_context, get_logger, log_event, logged};
use crate::output;

const START_ITEMS: &[&str] = &["Log in", "Register", "Quit"];

const LEDGER_ITEMS: &[&str] = &[
    "Open account",
    "Deposit",
    "Withdraw",
    "Transfer",
    "Check balance",
    "Close account",
    "List accounts",
    "Status",
    "Log out",
];

/// Command name logged for each ledger menu item
const LEDGER_COMMANDS: &[&str] = &[
    "open", "deposit", "withdraw", "transfer", "balance", "close", "list", "status",
];

fn input_account(prompt: &str) -> Result<AccountNumber> {
    Ok(Input::<AccountNumber>::new().with_prompt(prompt).interact_text()?)
}

fn input_amount(prompt: &str) -> Result<Decimal> {
    Ok(Input::<Decimal>::new().with_prompt(prompt).interact_text()?)
}

fn input_text(prompt: &str) -> Result<String> {
    Ok(Input::<String>::new().with_prompt(prompt).interact_text()?)
}

fn input_password(prompt: &str) -> Result<String> {
    Ok(Password::new().with_prompt(prompt).interact()?)
}

pub fn run(user: Option<String>) -> Result<()> {
    if atty::isnt(atty::Stream::Stdin) {
        bail!("The menu needs an interactive terminal");
    }

    let logger = get_logger(EntryPoint::Menu);
    let ctx = get_context()?;
    log_event(&logger, LogEvent::new("menu_opened"));

    let mut preset_user = user;
    loop {
        let choice = Select::new()
            .with_prompt("Ledger")
            .items(START_ITEMS)
            .default(0)
            .interact()?;

        match choice {
            0 => {
                let username = match preset_user.take() {
                    Some(username) => username,
                    None => input_text("Username")?,
                };
                let password = input_password("Password")?;

                let login = logged(&logger, "login", || {
                    Ok(ctx.auth_service.login(&username, &password)?)
                });
                match login {
                    Ok(mut session) => ledger_menu(&ctx, &logger, &mut session)?,
                    Err(e) => output::error(&e.to_string()),
                }
            }
            1 => {
                let result = logged(&logger, "register", || register(&ctx));
                if let Err(e) = result {
                    output::error(&e.to_string());
                }
            }
            _ => break,
        }
    }

    log_event(&logger, LogEvent::new("menu_closed"));
    Ok(())
}

fn ledger_menu(
    ctx: &LedgerContext,
    logger: &Option<LoggingService>,
    session: &mut Session,
) -> Result<()> {
    let started = session.started_at().with_timezone(&chrono::Local);
    output::success(&format!(
        "Logged in as {} at {}",
        session.username(),
        started.format("%H:%M")
    ));

    loop {
        let choice = Select::new()
            .with_prompt(format!("{} @ ledger", session.username()))
            .items(LEDGER_ITEMS)
            .default(0)
            .interact()?;

        let Some(command) = LEDGER_COMMANDS.get(choice) else {
            ctx.auth_service.logout(session);
            log_event(logger, LogEvent::new("logout_completed"));
            output::info("Logged out.");
            return Ok(());
        };

        let session: &Session = session;
        let result = logged(logger, command, || match choice {
            0 => open_account(ctx, session),
            1 => deposit(ctx, session),
            2 => withdraw(ctx, session),
            3 => transfer(ctx, session),
            4 => check_balance(ctx, session),
            5 => close_account(ctx, session),
            6 => list_accounts(ctx, session),
            _ => status(ctx),
        });
        if let Err(e) = result {
            output::error(&e.to_string());
        }
        println!();
    }
}

fn register(ctx: &LedgerContext) -> Result<()> {
    let username = input_text("Username")?;
    let email = input_text("Email")?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;

    let user = ctx
        .auth_service
        .register_user(&NewUser::new(username, password, email))?;
    output::success(&format!("Registered user {}. You can log in now.", user.username));
    Ok(())
}

fn open_account(ctx: &LedgerContext, session: &Session) -> Result<()> {
    let holder = input_text("Holder name")?;
    let phone = input_text("Phone number")?;
    let balance = input_amount("Opening balance")?;
    let minimum = Input::<Decimal>::new()
        .with_prompt("Minimum balance")
        .default(ctx.config.ledger.default_minimum_balance)
        .interact_text()?;
    let limit = input_amount("Max withdraw limit")?;
    let password = Password::new()
        .with_prompt("Account password")
        .with_confirmation("Confirm account password", "Passwords do not match")
        .interact()?;

    let request = NewAccount::new(holder, balance, limit, phone, password).with_minimum_balance(minimum);
    let number = ctx.ledger_service.open_account(session, &request)?;
    output::success(&format!("Opened account {}", number));
    Ok(())
}

fn deposit(ctx: &LedgerContext, session: &Session) -> Result<()> {
    let account = input_account("Account number")?;
    let amount = input_amount("Amount")?;

    let balance = ctx.ledger_service.deposit(session, account, amount)?;
    output::success(&format!("New balance: {}", output::format_amount(balance)));
    Ok(())
}

fn withdraw(ctx: &LedgerContext, session: &Session) -> Result<()> {
    let account = input_account("Account number")?;
    let amount = input_amount("Amount")?;
    let password = input_password("Account password")?;

    let balance = ctx.ledger_service.withdraw(session, account, amount, &password)?;
    output::success(&format!("New balance: {}", output::format_amount(balance)));
    Ok(())
}

fn transfer(ctx: &LedgerContext, session: &Session) -> Result<()> {
    let from = input_account("From account")?;
    let to = input_account("To account")?;
    let amount = input_amount("Amount")?;
    let password = input_password("Password for the source account")?;

    let receipt = ctx.ledger_service.transfer(session, from, to, amount, &password)?;
    output::success(&format!(
        "Transferred {}. {} now holds {}, {} holds {}",
        output::format_amount(receipt.amount),
        receipt.from,
        output::format_amount(receipt.from_balance),
        receipt.to,
        output::format_amount(receipt.to_balance)
    ));
    Ok(())
}

fn check_balance(ctx: &LedgerContext, session: &Session) -> Result<()> {
    let account = input_account("Account number")?;
    let password = input_password("Account password")?;

    let balance = ctx.ledger_service.check_balance(session, account, &password)?;
    println!("Balance: {}", output::format_amount(balance).bold());
    Ok(())
}

fn close_account(ctx: &LedgerContext, session: &Session) -> Result<()> {
    let account = input_account("Account number")?;
    if !Confirm::new()
        .with_prompt(format!("Close account {}?", account))
        .default(false)
        .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }
    let password = input_password("Account password")?;

    ctx.ledger_service.close_account(session, account, &password)?;
    output::success(&format!("Closed account {}", account));
    Ok(())
}

fn list_accounts(ctx: &LedgerContext, session: &Session) -> Result<()> {
    let accounts = ctx.ledger_service.list_accounts(session)?;
    if accounts.is_empty() {
        output::warning("No accounts yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Number", "Holder", "Balance", "Max Withdraw", "Phone"]);
    for account in &accounts {
        table.add_row(vec![
            account.number.to_string(),
            account.holder_name.clone(),
            output::format_amount(account.balance),
            output::format_amount(account.max_withdraw_limit),
            account.phone_number.clone(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn status(ctx: &LedgerContext) -> Result<()> {
    let status = ctx.status_service.get_status()?;
    if status.reachable {
        output::success("Database reachable");
    } else {
        output::error("Database unreachable");
    }
    println!(
        "{} accounts, {} users, {} held",
        status.total_accounts,
        status.total_users,
        output::format_amount(status.total_balance)
    );
    Ok(())
}
