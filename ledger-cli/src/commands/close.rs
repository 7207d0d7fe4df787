//! Close command - delete an account

use anyhow::Result;
use dialoguer::Confirm;
use serde::Serialize;

use ledger_core::{AccountNumber, EntryPoint};

use super::{emit, get_context, get_logger, logged, read_secret, with_session, UserArgs, ACCOUNT_PASSWORD_ENV};
use crate::output;

#[derive(Serialize)]
struct CloseResult {
    closed: AccountNumber,
}

pub fn run(
    user: UserArgs,
    account: AccountNumber,
    password: Option<String>,
    force: bool,
    json: bool,
) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "close", || {
        let ctx = get_context()?;
        with_session(&ctx, &user, |session| {
            if !force
                && !json
                && atty::is(atty::Stream::Stdin)
                && !Confirm::new()
                    .with_prompt(format!("Close account {}? This cannot be undone.", account))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let password = read_secret(password, ACCOUNT_PASSWORD_ENV, "Account password")?;
            let result = ctx
                .ledger_service
                .close_account(session, account, &password)
                .map(|()| CloseResult { closed: account });

            emit(json, result, |r| {
                output::success(&format!("Closed account {}", r.closed));
            })
        })
    })
}
