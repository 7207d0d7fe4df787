//! Register command - create a login user

use anyhow::Result;
use dialoguer::Password;

use ledger_core::{EntryPoint, NewUser};

use super::{emit, get_context, get_logger, logged, read_secret, USER_PASSWORD_ENV};
use crate::output;

/// Ask twice when the password is typed interactively
fn choose_password(flag: Option<String>) -> Result<String> {
    if flag.is_none() && std::env::var(USER_PASSWORD_ENV).is_err() && atty::is(atty::Stream::Stdin)
    {
        let password = Password::new()
            .with_prompt("Choose a password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?;
        return Ok(password);
    }
    read_secret(flag, USER_PASSWORD_ENV, "Choose a password")
}

pub fn run(username: String, email: String, password: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "register", || {
        let ctx = get_context()?;
        let password = choose_password(password)?;
        let result = ctx
            .auth_service
            .register_user(&NewUser::new(username, password, email));

        emit(json, result, |user| {
            output::success(&format!("Registered user {}", user.username));
        })
    })
}
