//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account number as shown to customers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(i64);

impl AccountNumber {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The number following this one, `None` once numbers run out
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Kind of account. Only savings accounts exist today; the tag replaces a
/// class hierarchy so new kinds only add capability rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    Savings,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Savings => "savings",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "savings" => Some(AccountKind::Savings),
            _ => None,
        }
    }

    /// Whether withdrawals are held above a minimum balance
    pub fn has_minimum_balance(&self) -> bool {
        matches!(self, AccountKind::Savings)
    }

    /// Whether single withdrawals are capped
    pub fn has_max_withdraw_limit(&self) -> bool {
        matches!(self, AccountKind::Savings)
    }
}

/// A persisted ledger account
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub number: AccountNumber,
    pub holder_name: String,
    pub balance: Decimal,
    pub minimum_balance: Decimal,
    pub max_withdraw_limit: Decimal,
    pub phone_number: String,
    /// PHC-formatted credential hash, never the password itself
    pub credential_hash: String,
    pub kind: AccountKind,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Balance left after withdrawing `amount`, or `None` if that would
    /// break the minimum balance floor.
    pub fn balance_after_withdrawal(&self, amount: Decimal) -> Option<Decimal> {
        let remaining = self.balance.checked_sub(amount)?;
        if self.kind.has_minimum_balance() && remaining < self.minimum_balance {
            return None;
        }
        Some(remaining)
    }

    /// Whether a single withdrawal of `amount` is within the limit
    pub fn within_withdraw_limit(&self, amount: Decimal) -> bool {
        !self.kind.has_max_withdraw_limit() || amount <= self.max_withdraw_limit
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            number: self.number,
            holder_name: self.holder_name.clone(),
            balance: self.balance,
            max_withdraw_limit: self.max_withdraw_limit,
            phone_number: self.phone_number.clone(),
            kind: self.kind,
        }
    }
}

/// Request to open an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Explicit number; the ledger assigns the next free one when absent
    pub number: Option<AccountNumber>,
    pub holder_name: String,
    pub opening_balance: Decimal,
    /// Defaults to the configured savings minimum when absent
    pub minimum_balance: Option<Decimal>,
    pub max_withdraw_limit: Decimal,
    pub phone_number: String,
    pub password: String,
    pub kind: AccountKind,
}

impl NewAccount {
    pub fn new(
        holder_name: impl Into<String>,
        opening_balance: Decimal,
        max_withdraw_limit: Decimal,
        phone_number: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            number: None,
            holder_name: holder_name.into(),
            opening_balance,
            minimum_balance: None,
            max_withdraw_limit,
            phone_number: phone_number.into(),
            password: password.into(),
            kind: AccountKind::Savings,
        }
    }

    pub fn with_number(mut self, number: AccountNumber) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_minimum_balance(mut self, minimum_balance: Decimal) -> Self {
        self.minimum_balance = Some(minimum_balance);
        self
    }

    /// Validate request fields (amount rules are checked by the ledger)
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.holder_name.trim().is_empty() {
            return Err("holder name cannot be empty");
        }
        if self.phone_number.trim().is_empty() {
            return Err("phone number cannot be empty");
        }
        if self.password.is_empty() {
            return Err("password cannot be empty");
        }
        Ok(())
    }
}

/// Listing view of an account, without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub number: AccountNumber,
    pub holder_name: String,
    pub balance: Decimal,
    pub max_withdraw_limit: Decimal,
    pub phone_number: String,
    pub kind: AccountKind,
}

/// Outcome of a completed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: AccountNumber,
    pub to: AccountNumber,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn savings(balance: i64, minimum: i64, limit: i64) -> Account {
        Account {
            number: AccountNumber::new(1001),
            holder_name: "Ada".to_string(),
            balance: Decimal::new(balance, 0),
            minimum_balance: Decimal::new(minimum, 0),
            max_withdraw_limit: Decimal::new(limit, 0),
            phone_number: "555-0100".to_string(),
            credential_hash: "hash".to_string(),
            kind: AccountKind::Savings,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_withdrawal_respects_minimum_balance() {
        let account = savings(1500, 1000, 5000);
        assert_eq!(
            account.balance_after_withdrawal(Decimal::new(500, 0)),
            Some(Decimal::new(1000, 0))
        );
        assert_eq!(account.balance_after_withdrawal(Decimal::new(501, 0)), None);
    }

    #[test]
    fn test_balance_already_below_minimum_blocks_any_withdrawal() {
        let account = savings(500, 1000, 5000);
        assert_eq!(account.balance_after_withdrawal(Decimal::new(1, 2)), None);
    }

    #[test]
    fn test_withdraw_limit() {
        let account = savings(10_000, 0, 200);
        assert!(account.within_withdraw_limit(Decimal::new(200, 0)));
        assert!(!account.within_withdraw_limit(Decimal::new(20001, 2)));
    }

    #[test]
    fn test_new_account_validation() {
        let request = NewAccount::new("Ada", Decimal::ZERO, Decimal::ONE, "555", "pw");
        assert!(request.validate().is_ok());

        let mut blank_name = request.clone();
        blank_name.holder_name = "   ".to_string();
        assert!(blank_name.validate().is_err());

        let mut no_password = request;
        no_password.password = String::new();
        assert!(no_password.validate().is_err());
    }

    #[test]
    fn test_account_number_parse_and_next() {
        let number: AccountNumber = " 1001 ".parse().unwrap();
        assert_eq!(number, AccountNumber::new(1001));
        assert_eq!(number.next(), Some(AccountNumber::new(1002)));
        assert_eq!(AccountNumber::new(i64::MAX).next(), None);
        assert!("abc".parse::<AccountNumber>().is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(AccountKind::parse("Savings"), Some(AccountKind::Savings));
        assert_eq!(AccountKind::Savings.as_str(), "savings");
        assert_eq!(AccountKind::parse("checking"), None);
    }
}
