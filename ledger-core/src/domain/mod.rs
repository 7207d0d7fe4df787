//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

mod account;
mod credential;
mod session;
mod user;
pub mod result;

pub use account::{
    Account, AccountKind, AccountNumber, AccountSummary, NewAccount, TransferReceipt,
};
pub use credential::Argon2Params;
pub use result::{AccountRole, Error, OperationResult, Result};
pub use session::Session;
pub use user::{NewUser, User};
