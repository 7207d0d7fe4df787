//! List command - all accounts

use anyhow::Result;

use ledger_core::EntryPoint;

use super::{emit, get_context, get_logger, logged, with_session, UserArgs};
use crate::output;

pub fn run(user: UserArgs, json: bool) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "list", || {
        let ctx = get_context()?;
        with_session(&ctx, &user, |session| {
            emit(json, ctx.ledger_service.list_accounts(session), |accounts| {
                if accounts.is_empty() {
                    output::warning("No accounts yet. Use 'ledger open' to add one.");
                    return;
                }

                let mut table = output::create_table();
                table.set_header(vec!["Number", "Holder", "Balance", "Max Withdraw", "Phone"]);
                for account in accounts {
                    table.add_row(vec![
                        account.number.to_string(),
                        account.holder_name.clone(),
                        output::format_amount(account.balance),
                        output::format_amount(account.max_withdraw_limit),
                        account.phone_number.clone(),
                    ]);
                }
                println!("{}", table);
            })
        })
    })
}
