//! Balance command - show one account's balance

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;

use ledger_core::{AccountNumber, EntryPoint};

use super::{emit, get_context, get_logger, logged, read_secret, with_session, UserArgs, ACCOUNT_PASSWORD_ENV};
use crate::output;

#[derive(Serialize)]
struct BalanceResult {
    account: AccountNumber,
    balance: Decimal,
}

pub fn run(user: UserArgs, account: AccountNumber, password: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "balance", || {
        let ctx = get_context()?;
        with_session(&ctx, &user, |session| {
            let password = read_secret(password, ACCOUNT_PASSWORD_ENV, "Account password")?;
            let result = ctx
                .ledger_service
                .check_balance(session, account, &password)
                .map(|balance| BalanceResult { account, balance });

            emit(json, result, |r| {
                println!(
                    "Account {}: {}",
                    r.account,
                    output::format_amount(r.balance).bold()
                );
            })
        })
    })
}
