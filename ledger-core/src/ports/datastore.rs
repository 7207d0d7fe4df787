//! Datastore port - transactional persistence for accounts and users

use rust_decimal::Decimal;

use crate::domain::{Account, AccountNumber, Result, User};

/// Persistent storage for the ledger.
///
/// All reads and writes happen through a [`StoreTransaction`]. A transaction
/// that is dropped without `commit` is rolled back.
pub trait Datastore: Send + Sync {
    /// Create tables and apply pending migrations
    fn ensure_schema(&self) -> Result<()>;

    /// Start a unit of work
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;

    /// Cheap connectivity check
    fn ping(&self) -> Result<()>;
}

/// One open transaction against the datastore.
///
/// Row-affecting writes return the number of affected rows so callers can
/// detect missing rows without a separate read.
pub trait StoreTransaction {
    // === Accounts ===

    fn find_account(&mut self, number: AccountNumber) -> Result<Option<Account>>;

    fn insert_account(&mut self, account: &Account) -> Result<usize>;

    /// Highest account number in use, if any
    fn max_account_number(&mut self) -> Result<Option<AccountNumber>>;

    /// Overwrite the balance with a value computed by the caller
    fn set_balance(&mut self, number: AccountNumber, balance: Decimal) -> Result<usize>;

    /// Add `delta` (may be negative) to the stored balance
    fn adjust_balance(&mut self, number: AccountNumber, delta: Decimal) -> Result<usize>;

    fn delete_account(&mut self, number: AccountNumber) -> Result<usize>;

    /// All accounts ordered by number
    fn list_accounts(&mut self) -> Result<Vec<Account>>;

    // === Users ===

    fn find_user(&mut self, username: &str) -> Result<Option<User>>;

    fn insert_user(&mut self, user: &User) -> Result<usize>;

    fn count_users(&mut self) -> Result<i64>;

    // === Lifecycle ===

    /// Make all writes durable
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all writes. Dropping the transaction has the same effect.
    fn rollback(self: Box<Self>) -> Result<()>;
}
