//! Status service - datastore reachability and ledger totals

use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::Result;
use crate::ports::Datastore;

/// Status service for ledger summaries
pub struct StatusService {
    store: Arc<dyn Datastore>,
    db_path: Option<PathBuf>,
}

impl StatusService {
    pub fn new(store: Arc<dyn Datastore>, db_path: Option<PathBuf>) -> Self {
        Self { store, db_path }
    }

    /// Get overall status summary. An unreachable datastore is reported,
    /// not returned as an error.
    pub fn get_status(&self) -> Result<StatusSummary> {
        let db_path = self.db_path.as_ref().map(|p| p.display().to_string());

        if self.store.ping().is_err() {
            return Ok(StatusSummary {
                db_path,
                reachable: false,
                total_accounts: 0,
                total_users: 0,
                total_balance: Decimal::ZERO,
            });
        }

        let mut tx = self.store.begin()?;
        let accounts = tx.list_accounts()?;
        let total_users = tx.count_users()?;
        tx.commit()?;

        Ok(StatusSummary {
            db_path,
            reachable: true,
            total_accounts: accounts.len() as i64,
            total_users,
            total_balance: accounts.iter().map(|a| a.balance).sum(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub db_path: Option<String>,
    pub reachable: bool,
    pub total_accounts: i64,
    pub total_users: i64,
    pub total_balance: Decimal,
}
