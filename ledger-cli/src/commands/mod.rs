//! CLI command implementations

pub mod balance;
pub mod close;
pub mod deposit;
pub mod list;
pub mod logs;
pub mod menu;
pub mod open;
pub mod register;
pub mod status;
pub mod transfer;
pub mod withdraw;

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Password;
use serde::Serialize;

use ledger_core::domain::OperationResult;
use ledger_core::{EntryPoint, Error, LedgerContext, LogEvent, LoggingService, Session};

/// Environment variable holding account passwords for non-interactive use
pub const ACCOUNT_PASSWORD_ENV: &str = "LEDGER_PASSWORD";

/// Environment variable holding the login password of `--user`
pub const USER_PASSWORD_ENV: &str = "LEDGER_USER_PASSWORD";

/// Login options shared by every account command
#[derive(Args, Debug, Clone)]
pub struct UserArgs {
    /// Username to log in as
    #[arg(long, short = 'u', env = "LEDGER_USER")]
    pub user: String,
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger(entry_point: EntryPoint) -> Option<LoggingService> {
    let ledger_dir = get_ledger_dir().ok()?;
    std::fs::create_dir_all(&ledger_dir).ok()?;
    LoggingService::new(&ledger_dir, entry_point, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Run `f` between `<command>_started` and `<command>_completed` /
/// `<command>_failed` log events. Only the error code is logged for ledger
/// errors, since their messages carry amounts and account numbers.
pub fn logged<T>(
    logger: &Option<LoggingService>,
    command: &str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    log_event(
        logger,
        LogEvent::new(format!("{}_started", command)).with_command(command),
    );

    let result = f();

    let event = match &result {
        Ok(_) => LogEvent::new(format!("{}_completed", command)).with_command(command),
        Err(e) => {
            let failed = LogEvent::new(format!("{}_failed", command)).with_command(command);
            match e.downcast_ref::<Error>() {
                Some(ledger_error) => failed.with_error_code(ledger_error.code()),
                None => failed
                    .with_error(e.to_string())
                    .with_error_details(format!("{:#}", e)),
            }
        }
    };
    log_event(logger, event);

    result
}

/// Get the ledger directory from LEDGER_DIR or ~/.ledger
pub fn get_ledger_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".ledger"))
}

/// Open the ledger in the configured directory
pub fn get_context() -> Result<LedgerContext> {
    let ledger_dir = get_ledger_dir()?;
    LedgerContext::new(&ledger_dir).context("Failed to initialize ledger")
}

/// Read a secret from, in order: the flag, the environment variable, one
/// line of piped stdin, or a hidden prompt
pub fn read_secret(flag: Option<String>, env_var: &str, prompt: &str) -> Result<String> {
    if let Some(secret) = flag {
        return Ok(secret);
    }

    if let Ok(secret) = std::env::var(env_var) {
        return Ok(secret);
    }

    if atty::isnt(atty::Stream::Stdin) {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read password from stdin")?;
        return Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string());
    }

    let secret = Password::new().with_prompt(prompt).interact()?;
    Ok(secret)
}

/// Log `user` in. The login password comes from LEDGER_USER_PASSWORD,
/// stdin or a prompt.
pub fn login(ctx: &LedgerContext, user: &UserArgs) -> Result<Session> {
    let password = read_secret(None, USER_PASSWORD_ENV, &format!("Password for {}", user.user))?;
    let session = ctx.auth_service.login(&user.user, &password)?;
    Ok(session)
}

/// Log in, run `f` with the session, then log out
pub fn with_session<T>(
    ctx: &LedgerContext,
    user: &UserArgs,
    f: impl FnOnce(&Session) -> Result<T>,
) -> Result<T> {
    let mut session = login(ctx, user)?;
    let result = f(&session);
    ctx.auth_service.logout(&mut session);
    result
}

/// Print a core result. In JSON mode the result is wrapped in an
/// `OperationResult` envelope; failures still return `Err` so the exit code
/// is non-zero.
pub fn emit<T: Serialize>(
    json: bool,
    result: ledger_core::domain::Result<T>,
    render: impl FnOnce(&T),
) -> Result<()> {
    if json {
        let failure = result.as_ref().err().cloned();
        let envelope: OperationResult<T> = result.into();
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        };
    }

    let value = result?;
    render(&value);
    Ok(())
}
