//! Withdraw command

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;

use ledger_core::{AccountNumber, EntryPoint};

use super::{emit, get_context, get_logger, logged, read_secret, with_session, UserArgs, ACCOUNT_PASSWORD_ENV};
use crate::output;

#[derive(Serialize)]
struct WithdrawResult {
    account: AccountNumber,
    balance: Decimal,
}

pub fn run(
    user: UserArgs,
    account: AccountNumber,
    amount: Decimal,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "withdraw", || {
        let ctx = get_context()?;
        with_session(&ctx, &user, |session| {
            let password = read_secret(password, ACCOUNT_PASSWORD_ENV, "Account password")?;
            let result = ctx
                .ledger_service
                .withdraw(session, account, amount, &password)
                .map(|balance| WithdrawResult { account, balance });

            emit(json, result, |r| {
                output::success(&format!(
                    "Withdrew {} from {}. New balance: {}",
                    output::format_amount(amount),
                    r.account,
                    output::format_amount(r.balance)
                ));
            })
        })
    })
}
