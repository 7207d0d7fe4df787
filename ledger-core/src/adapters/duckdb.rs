//! DuckDB datastore implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::{Account, AccountKind, AccountNumber, Error, Result, User};
use crate::ports::{Datastore, StoreTransaction};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Columns read for every account query. Decimals are read back as text so
/// they round-trip exactly into `Decimal`.
const ACCOUNT_COLUMNS: &str = "acc_num, name, CAST(balance AS VARCHAR), CAST(min_balance AS VARCHAR),
     CAST(max_withdraw AS VARCHAR), phone_number, password_hash, kind, created_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB datastore.
///
/// Holds a single connection; a transaction keeps the connection locked
/// until it is committed or dropped, so units of work never interleave.
pub struct DuckDbDatastore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbDatastore {
    /// Open (or create) a database file.
    ///
    /// Retries with exponential backoff when another process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[ledger] Database busy, retrying in {}ms (attempt {}/{})",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error
            .map(Error::from)
            .unwrap_or_else(|| Error::storage(format!("Failed to open database after {} retries", MAX_RETRIES))))
    }

    /// Open a private in-memory database (tests, demos)
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extensions are never needed; autoloading them can fail on signed binaries
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }
}

impl Datastore for DuckDbDatastore {
    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()?;
        Ok(())
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(Box::new(DuckDbTransaction {
            conn,
            finished: false,
        }))
    }

    fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
        Ok(())
    }
}

/// An open DuckDB transaction. Rolls back on drop unless committed.
struct DuckDbTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl DuckDbTransaction<'_> {
    fn query_accounts(&self, sql: &str, params: &[&dyn duckdb::ToSql]) -> Result<Vec<Account>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, AccountRow::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        rows.into_iter().map(AccountRow::into_account).collect()
    }
}

impl StoreTransaction for DuckDbTransaction<'_> {
    fn find_account(&mut self, number: AccountNumber) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE acc_num = ?", ACCOUNT_COLUMNS);
        let mut accounts = self.query_accounts(&sql, &[&number.value()])?;
        Ok(accounts.pop())
    }

    fn insert_account(&mut self, account: &Account) -> Result<usize> {
        let inserted = self.conn.execute(
            "INSERT INTO accounts (acc_num, name, balance, min_balance, max_withdraw,
                                   phone_number, password_hash, kind, created_at)
             VALUES (?, ?, CAST(? AS DECIMAL(18,2)), CAST(? AS DECIMAL(18,2)),
                     CAST(? AS DECIMAL(18,2)), ?, ?, ?, ?)",
            params![
                account.number.value(),
                account.holder_name,
                account.balance.to_string(),
                account.minimum_balance.to_string(),
                account.max_withdraw_limit.to_string(),
                account.phone_number,
                account.credential_hash,
                account.kind.as_str(),
                account.created_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted)
    }

    fn max_account_number(&mut self) -> Result<Option<AccountNumber>> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(acc_num) FROM accounts", [], |row| row.get(0))?;
        Ok(max.map(AccountNumber::new))
    }

    fn set_balance(&mut self, number: AccountNumber, balance: Decimal) -> Result<usize> {
        let updated = self.conn.execute(
            "UPDATE accounts SET balance = CAST(? AS DECIMAL(18,2)) WHERE acc_num = ?",
            params![balance.to_string(), number.value()],
        )?;
        Ok(updated)
    }

    fn adjust_balance(&mut self, number: AccountNumber, delta: Decimal) -> Result<usize> {
        let updated = self.conn.execute(
            "UPDATE accounts SET balance = balance + CAST(? AS DECIMAL(18,2)) WHERE acc_num = ?",
            params![delta.to_string(), number.value()],
        )?;
        Ok(updated)
    }

    fn delete_account(&mut self, number: AccountNumber) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM accounts WHERE acc_num = ?", params![number.value()])?;
        Ok(deleted)
    }

    fn list_accounts(&mut self) -> Result<Vec<Account>> {
        let sql = format!("SELECT {} FROM accounts ORDER BY acc_num", ACCOUNT_COLUMNS);
        self.query_accounts(&sql, &[])
    }

    fn find_user(&mut self, username: &str) -> Result<Option<User>> {
        let result = self.conn.query_row(
            "SELECT username, password_hash, email, created_at FROM users WHERE username = ?",
            params![username],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        );
        let row = match result {
            Ok(row) => Some(row),
            Err(duckdb::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        row.map(|(username, credential_hash, email, created_at)| {
            Ok(User {
                username,
                credential_hash,
                email,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    fn insert_user(&mut self, user: &User) -> Result<usize> {
        let inserted = self.conn.execute(
            "INSERT INTO users (username, password_hash, email, created_at) VALUES (?, ?, ?, ?)",
            params![
                user.username,
                user.credential_hash,
                user.email,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted)
    }

    fn count_users(&mut self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for DuckDbTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Nothing useful to do with a failed rollback while unwinding
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

/// Raw account columns as read from DuckDB
struct AccountRow {
    number: i64,
    holder_name: String,
    balance: String,
    minimum_balance: String,
    max_withdraw_limit: String,
    phone_number: String,
    credential_hash: String,
    kind: String,
    created_at: String,
}

impl AccountRow {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            number: row.get(0)?,
            holder_name: row.get(1)?,
            balance: row.get(2)?,
            minimum_balance: row.get(3)?,
            max_withdraw_limit: row.get(4)?,
            phone_number: row.get(5)?,
            credential_hash: row.get(6)?,
            kind: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        let kind = AccountKind::parse(&self.kind)
            .ok_or_else(|| Error::storage(format!("Unknown account kind: {}", self.kind)))?;

        Ok(Account {
            number: AccountNumber::new(self.number),
            holder_name: self.holder_name,
            balance: parse_decimal(&self.balance)?,
            minimum_balance: parse_decimal(&self.minimum_balance)?,
            max_withdraw_limit: parse_decimal(&self.max_withdraw_limit)?,
            phone_number: self.phone_number,
            credential_hash: self.credential_hash,
            kind,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|_| Error::storage("Invalid decimal in accounts table"))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::storage(format!("Invalid timestamp: {}", e)))
}
