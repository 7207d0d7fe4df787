//! Transfer command

use anyhow::Result;
use rust_decimal::Decimal;

use ledger_core::{AccountNumber, EntryPoint};

use super::{emit, get_context, get_logger, logged, read_secret, with_session, UserArgs, ACCOUNT_PASSWORD_ENV};
use crate::output;

pub fn run(
    user: UserArgs,
    from: AccountNumber,
    to: AccountNumber,
    amount: Decimal,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "transfer", || {
        let ctx = get_context()?;
        with_session(&ctx, &user, |session| {
            let password =
                read_secret(password, ACCOUNT_PASSWORD_ENV, &format!("Password for account {}", from))?;
            let result = ctx.ledger_service.transfer(session, from, to, amount, &password);

            emit(json, result, |receipt| {
                output::success(&format!(
                    "Transferred {} from {} to {}",
                    output::format_amount(receipt.amount),
                    receipt.from,
                    receipt.to
                ));
                println!(
                    "  {}: {}",
                    receipt.from,
                    output::format_amount(receipt.from_balance)
                );
                println!("  {}: {}", receipt.to, output::format_amount(receipt.to_balance));
            })
        })
    })
}
