//! Open command - open a savings account

use anyhow::Result;
use clap::Args;
use rust_decimal::Decimal;

use ledger_core::{AccountNumber, EntryPoint, NewAccount};

use super::{emit, get_context, get_logger, logged, read_secret, with_session, UserArgs, ACCOUNT_PASSWORD_ENV};
use crate::output;

#[derive(Args, Debug)]
pub struct OpenArgs {
    #[command(flatten)]
    pub user: UserArgs,
    /// Account holder name
    #[arg(long)]
    pub name: String,
    /// Holder phone number
    #[arg(long)]
    pub phone: String,
    /// Opening balance
    #[arg(long, default_value = "0")]
    pub balance: Decimal,
    /// Minimum balance (defaults to the configured savings minimum)
    #[arg(long)]
    pub min_balance: Option<Decimal>,
    /// Largest single withdrawal
    #[arg(long)]
    pub max_withdraw: Decimal,
    /// Account number to use instead of the next free one
    #[arg(long)]
    pub number: Option<AccountNumber>,
    /// Account password (or LEDGER_PASSWORD)
    #[arg(short, long)]
    pub password: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: OpenArgs) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "open", || {
        let ctx = get_context()?;
        with_session(&ctx, &args.user, |session| {
            let password = read_secret(args.password, ACCOUNT_PASSWORD_ENV, "Account password")?;

            let mut request =
                NewAccount::new(args.name, args.balance, args.max_withdraw, args.phone, password);
            if let Some(number) = args.number {
                request = request.with_number(number);
            }
            if let Some(minimum) = args.min_balance {
                request = request.with_minimum_balance(minimum);
            }

            emit(args.json, ctx.ledger_service.open_account(session, &request), |number| {
                output::success(&format!("Opened account {}", number));
            })
        })
    })
}
