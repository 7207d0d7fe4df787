//! Result and error types for the core library

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AccountNumber;

/// Which account an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Account,
    Source,
    Destination,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountRole::Account => "account",
            AccountRole::Source => "source account",
            AccountRole::Destination => "destination account",
        };
        f.write_str(s)
    }
}

/// Core library error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {role} {account}")]
    AccountNotFound {
        account: AccountNumber,
        role: AccountRole,
    },

    #[error("Account already exists: {0}")]
    DuplicateAccount(AccountNumber),

    #[error("Insufficient balance: requested {requested}, available {available}, minimum {minimum}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
        minimum: Decimal,
    },

    #[error("Withdrawal of {requested} exceeds limit of {limit}")]
    MaxWithdrawExceeded { requested: Decimal, limit: Decimal },

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Session is no longer active")]
    SessionExpired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Account missing outside of a transfer
    pub fn account_not_found(account: AccountNumber) -> Self {
        Self::AccountNotFound {
            account,
            role: AccountRole::Account,
        }
    }

    /// Stable machine-readable code, used for logs and JSON output
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidAmount(_) => "invalid_amount",
            Error::Validation(_) => "validation",
            Error::AccountNotFound { .. } => "account_not_found",
            Error::DuplicateAccount(_) => "duplicate_account",
            Error::InsufficientBalance { .. } => "insufficient_balance",
            Error::MaxWithdrawExceeded { .. } => "max_withdraw_exceeded",
            Error::AuthenticationFailed => "authentication_failed",
            Error::DuplicateUsername(_) => "duplicate_username",
            Error::SessionExpired => "session_expired",
            Error::Config(_) => "config",
            Error::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

/// Only the failure class is kept; DuckDB messages quote the statement and
/// its bound values
impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        let reason = match &e {
            duckdb::Error::DuckDBFailure(failure, _) => format!("{:?}", failure.code),
            duckdb::Error::QueryReturnedNoRows => "query returned no rows".to_string(),
            _ => "datastore error".to_string(),
        };
        Self::StorageUnavailable(reason)
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_code: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut failed = Self::fail(e.to_string());
                failed.error_code = Some(e.code().to_string());
                failed
            }
        }
    }
}
