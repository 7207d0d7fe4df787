//! Status command - datastore reachability and ledger totals

use anyhow::Result;
use colored::Colorize;

use ledger_core::EntryPoint;

use super::{get_context, get_logger, logged};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger(EntryPoint::Cli);

    logged(&logger, "status", || {
        let ctx = get_context()?;
        let status = ctx.status_service.get_status()?;

        if json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        println!("{}", "Ledger Status".bold());
        println!();

        let mut table = output::create_table();
        let reachable = if status.reachable {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        };
        table.add_row(vec!["Database".to_string(), status.db_path.clone().unwrap_or_default()]);
        table.add_row(vec!["Reachable".to_string(), reachable]);
        table.add_row(vec!["Accounts".to_string(), status.total_accounts.to_string()]);
        table.add_row(vec!["Users".to_string(), status.total_users.to_string()]);
        table.add_row(vec![
            "Total balance".to_string(),
            output::format_amount(status.total_balance),
        ]);
        println!("{}", table);

        if status.total_users == 0 {
            println!();
            output::info("No users yet. Use 'ledger register <username> --email <email>' first.");
        }

        Ok(())
    })
}
