//! Deposit command

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;

use ledger_core::{AccountNumber, EntryPoint};

use super::{emit, get_context, get_logger, logged, with_session, UserArgs};
use crate::output;

#[derive(Serialize)]
struct DepositResult {
    account: AccountNumber,
    balance: Decimal,
}

pub fn run(user: UserArgs, account: AccountNumber, amount: Decimal, json: bool) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "deposit", || {
        let ctx = get_context()?;
        with_session(&ctx, &user, |session| {
            let result = ctx
                .ledger_service
                .deposit(session, account, amount)
                .map(|balance| DepositResult { account, balance });

            emit(json, result, |r| {
                output::success(&format!(
                    "Deposited {} into {}. New balance: {}",
                    output::format_amount(amount),
                    r.account,
                    output::format_amount(r.balance)
                ));
            })
        })
    })
}
