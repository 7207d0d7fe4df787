//! Ledger service - account lifecycle and balance movements
//!
//! Every write runs inside a single datastore transaction. Early returns
//! drop the transaction uncommitted, which rolls it back. Password checks
//! run before that transaction is opened, and the row is re-read inside it.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::LedgerSettings;
use crate::domain::{
    Account, AccountNumber, AccountRole, AccountSummary, Error, NewAccount, Result, Session,
    TransferReceipt,
};
use crate::ports::{CredentialHasher, Datastore};

/// Amounts are kept to cents
const MAX_SCALE: u32 = 2;

/// Largest magnitude the `DECIMAL(18,2)` balance column holds
pub const MAX_BALANCE: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, 2);

/// Verified against when an account does not exist, so a missing account
/// costs the same hashing work as a wrong password
const DUMMY_PASSWORD: &str = "ledger-dummy-credential";

/// A movement amount must be positive, storable and representable in cents
fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO
        || amount > MAX_BALANCE
        || amount.normalize().scale() > MAX_SCALE
    {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}

fn validate_non_negative(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO
        || amount > MAX_BALANCE
        || amount.normalize().scale() > MAX_SCALE
    {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}

/// `balance + delta`, failing with `InvalidAmount` when the result would not
/// fit the balance column
fn shifted_balance(balance: Decimal, delta: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(delta)
        .filter(|b| b.abs() <= MAX_BALANCE)
        .ok_or(Error::InvalidAmount(amount))
}

/// Account ledger
pub struct LedgerService {
    store: Arc<dyn Datastore>,
    hasher: Arc<dyn CredentialHasher>,
    settings: LedgerSettings,
    dummy_hash: String,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn Datastore>,
        hasher: Arc<dyn CredentialHasher>,
        settings: LedgerSettings,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            settings,
            dummy_hash,
        })
    }

    /// Open a savings account and return its number
    pub fn open_account(&self, session: &Session, request: &NewAccount) -> Result<AccountNumber> {
        session.require_active()?;
        request.validate().map_err(Error::validation)?;
        validate_non_negative(request.opening_balance)?;

        let minimum_balance = request
            .minimum_balance
            .unwrap_or(self.settings.default_minimum_balance);
        validate_non_negative(minimum_balance)?;
        validate_amount(request.max_withdraw_limit)?;

        // Hash before taking the store so the slow part does not block others
        let credential_hash = self.hasher.hash(&request.password)?;

        let mut tx = self.store.begin()?;

        let number = match request.number {
            Some(number) => {
                if tx.find_account(number)?.is_some() {
                    return Err(Error::DuplicateAccount(number));
                }
                number
            }
            None => match tx.max_account_number()? {
                Some(max) if max >= self.settings.starting_account_number => max
                    .next()
                    .ok_or_else(|| Error::validation("account numbers exhausted"))?,
                _ => self.settings.starting_account_number,
            },
        };

        let account = Account {
            number,
            holder_name: request.holder_name.trim().to_string(),
            balance: request.opening_balance,
            minimum_balance,
            max_withdraw_limit: request.max_withdraw_limit,
            phone_number: request.phone_number.trim().to_string(),
            credential_hash,
            kind: request.kind,
            created_at: chrono::Utc::now(),
        };
        tx.insert_account(&account)?;
        tx.commit()?;

        Ok(number)
    }

    /// Add `amount` to the balance and return the new balance
    pub fn deposit(
        &self,
        session: &Session,
        number: AccountNumber,
        amount: Decimal,
    ) -> Result<Decimal> {
        session.require_active()?;
        validate_amount(amount)?;

        let mut tx = self.store.begin()?;
        let account = tx
            .find_account(number)?
            .ok_or_else(|| Error::account_not_found(number))?;

        let new_balance = shifted_balance(account.balance, amount, amount)?;
        if tx.set_balance(number, new_balance)? == 0 {
            return Err(Error::account_not_found(number));
        }
        tx.commit()?;

        Ok(new_balance)
    }

    /// Withdraw `amount` and return the new balance.
    ///
    /// Checks run in a fixed order: session, amount, existence, password,
    /// minimum balance, then the per-withdrawal limit. The minimum balance rule is
    /// `balance - amount >= minimum_balance`.
    pub fn withdraw(
        &self,
        session: &Session,
        number: AccountNumber,
        amount: Decimal,
        password: &str,
    ) -> Result<Decimal> {
        session.require_active()?;
        validate_amount(amount)?;

        let verified = self.verify_account_password(number, AccountRole::Account, password)?;

        let mut tx = self.store.begin()?;
        let account = tx
            .find_account(number)?
            .ok_or_else(|| Error::account_not_found(number))?;
        ensure_same_credential(&account, &verified)?;

        let new_balance =
            account
                .balance_after_withdrawal(amount)
                .ok_or(Error::InsufficientBalance {
                    requested: amount,
                    available: account.balance,
                    minimum: account.minimum_balance,
                })?;

        if !account.within_withdraw_limit(amount) {
            return Err(Error::MaxWithdrawExceeded {
                requested: amount,
                limit: account.max_withdraw_limit,
            });
        }

        if tx.set_balance(number, new_balance)? == 0 {
            return Err(Error::account_not_found(number));
        }
        tx.commit()?;

        Ok(new_balance)
    }

    /// Move `amount` from one account to another, all or nothing.
    ///
    /// Only the source password is checked. The debit side is not held to
    /// the minimum balance or the withdraw limit.
    pub fn transfer(
        &self,
        session: &Session,
        from: AccountNumber,
        to: AccountNumber,
        amount: Decimal,
        password: &str,
    ) -> Result<TransferReceipt> {
        session.require_active()?;
        validate_amount(amount)?;

        let verified = self.verify_account_password(from, AccountRole::Source, password)?;

        let mut tx = self.store.begin()?;
        let source = tx.find_account(from)?.ok_or(Error::AccountNotFound {
            account: from,
            role: AccountRole::Source,
        })?;
        ensure_same_credential(&source, &verified)?;

        if from != to {
            shifted_balance(source.balance, -amount, amount)?;
            if let Some(destination) = tx.find_account(to)? {
                shifted_balance(destination.balance, amount, amount)?;
            }
        }

        if tx.adjust_balance(from, -amount)? == 0 {
            return Err(Error::AccountNotFound {
                account: from,
                role: AccountRole::Source,
            });
        }
        if tx.adjust_balance(to, amount)? == 0 {
            return Err(Error::AccountNotFound {
                account: to,
                role: AccountRole::Destination,
            });
        }

        let from_balance = tx
            .find_account(from)?
            .map(|a| a.balance)
            .ok_or(Error::AccountNotFound {
                account: from,
                role: AccountRole::Source,
            })?;
        let to_balance = tx
            .find_account(to)?
            .map(|a| a.balance)
            .ok_or(Error::AccountNotFound {
                account: to,
                role: AccountRole::Destination,
            })?;
        tx.commit()?;

        Ok(TransferReceipt {
            from,
            to,
            amount,
            from_balance,
            to_balance,
        })
    }

    /// Delete an account after checking its password
    pub fn close_account(
        &self,
        session: &Session,
        number: AccountNumber,
        password: &str,
    ) -> Result<()> {
        session.require_active()?;

        let verified = self.verify_account_password(number, AccountRole::Account, password)?;

        let mut tx = self.store.begin()?;
        let account = tx
            .find_account(number)?
            .ok_or_else(|| Error::account_not_found(number))?;
        ensure_same_credential(&account, &verified)?;

        if tx.delete_account(number)? == 0 {
            return Err(Error::account_not_found(number));
        }
        tx.commit()
    }

    /// Current balance. A missing account and a wrong password both fail
    /// with `AuthenticationFailed`.
    pub fn check_balance(
        &self,
        session: &Session,
        number: AccountNumber,
        password: &str,
    ) -> Result<Decimal> {
        session.require_active()?;

        let mut tx = self.store.begin()?;
        let account = tx.find_account(number)?;
        tx.commit()?;

        match account {
            Some(account) if self.hasher.verify(password, &account.credential_hash) => {
                Ok(account.balance)
            }
            Some(_) => Err(Error::AuthenticationFailed),
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                Err(Error::AuthenticationFailed)
            }
        }
    }

    /// All accounts ordered by number, without credentials
    pub fn list_accounts(&self, session: &Session) -> Result<Vec<AccountSummary>> {
        session.require_active()?;

        let mut tx = self.store.begin()?;
        let accounts = tx.list_accounts()?;
        tx.commit()?;
        Ok(accounts.iter().map(Account::summary).collect())
    }

    /// Check `password` against the stored hash outside any write
    /// transaction. Returns the hash that matched.
    fn verify_account_password(
        &self,
        number: AccountNumber,
        role: AccountRole,
        password: &str,
    ) -> Result<String> {
        let mut tx = self.store.begin()?;
        let account = tx.find_account(number)?;
        tx.commit()?;

        let account = account.ok_or(Error::AccountNotFound {
            account: number,
            role,
        })?;
        if !self.hasher.verify(password, &account.credential_hash) {
            return Err(Error::AuthenticationFailed);
        }
        Ok(account.credential_hash)
    }
}

/// The account was closed and reopened under the same number between the
/// password check and the write
fn ensure_same_credential(account: &Account, verified: &str) -> Result<()> {
    if account.credential_hash != verified {
        return Err(Error::AuthenticationFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::argon2::Argon2Hasher;
    use crate::adapters::duckdb::DuckDbDatastore;
    use crate::domain::Argon2Params;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn service() -> LedgerService {
        let store = DuckDbDatastore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        let hasher = Argon2Hasher::new(&Argon2Params::insecure_fast()).unwrap();
        LedgerService::new(Arc::new(store), Arc::new(hasher), LedgerSettings::default()).unwrap()
    }

    fn teller() -> Session {
        Session::start("teller")
    }

    fn open(service: &LedgerService, balance: i64, minimum: i64, limit: i64) -> AccountNumber {
        let request = NewAccount::new("Ada Lovelace", dec(balance), dec(limit), "555-0100", "secret")
            .with_minimum_balance(dec(minimum));
        service.open_account(&teller(), &request).unwrap()
    }

    struct BrokenHasher;

    impl CredentialHasher for BrokenHasher {
        fn hash(&self, _plaintext: &str) -> Result<String> {
            Err(Error::Config("hasher unavailable".to_string()))
        }

        fn verify(&self, _plaintext: &str, _hash: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_new_fails_when_hashing_fails() {
        let store = DuckDbDatastore::open_in_memory().unwrap();
        let result = LedgerService::new(
            Arc::new(store),
            Arc::new(BrokenHasher),
            LedgerSettings::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    // ==================== Amounts ====================

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Decimal::new(1, 2)).is_ok());
        assert!(validate_amount(Decimal::new(1000, 3)).is_ok());
        assert!(validate_amount(MAX_BALANCE).is_ok());
        assert_eq!(
            validate_amount(Decimal::ZERO),
            Err(Error::InvalidAmount(Decimal::ZERO))
        );
        assert!(validate_amount(dec(-5)).is_err());
        assert!(validate_amount(Decimal::new(1, 3)).is_err());
        assert!(validate_amount(MAX_BALANCE + Decimal::new(1, 2)).is_err());
        assert!(validate_amount(Decimal::MAX).is_err());
    }

    #[test]
    fn test_max_balance_matches_column() {
        assert_eq!(MAX_BALANCE.to_string(), "9999999999999999.99");
    }

    #[test]
    fn test_shifted_balance() {
        assert_eq!(shifted_balance(dec(10), dec(5), dec(5)), Ok(dec(15)));
        assert_eq!(shifted_balance(dec(10), dec(-15), dec(15)), Ok(dec(-5)));
        assert_eq!(
            shifted_balance(MAX_BALANCE, Decimal::new(1, 2), Decimal::new(1, 2)),
            Err(Error::InvalidAmount(Decimal::new(1, 2)))
        );
        assert_eq!(
            shifted_balance(Decimal::MAX, Decimal::MAX, Decimal::MAX),
            Err(Error::InvalidAmount(Decimal::MAX))
        );
    }

    // ==================== Open ====================

    #[test]
    fn test_open_assigns_sequential_numbers() {
        let service = service();
        assert_eq!(open(&service, 2000, 1000, 500), AccountNumber::new(1001));
        assert_eq!(open(&service, 2000, 1000, 500), AccountNumber::new(1002));
    }

    #[test]
    fn test_open_uses_configured_minimum() {
        let service = service();
        let request = NewAccount::new("Ada", dec(5000), dec(500), "555", "secret");
        let number = service.open_account(&teller(), &request).unwrap();

        // 5000 - 4001 would leave 999, below the default 1000 floor
        let err = service
            .withdraw(&teller(), number, dec(4001), "secret")
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
    }

    #[test]
    fn test_open_with_explicit_number() {
        let service = service();
        let request = NewAccount::new("Ada", dec(10), dec(5), "555", "secret")
            .with_number(AccountNumber::new(4242));
        assert_eq!(service.open_account(&teller(), &request).unwrap(), AccountNumber::new(4242));
        assert_eq!(
            service.open_account(&teller(), &request),
            Err(Error::DuplicateAccount(AccountNumber::new(4242)))
        );

        // Auto numbering continues after the highest number in use
        assert_eq!(open(&service, 10, 0, 5), AccountNumber::new(4243));
    }

    #[test]
    fn test_open_rejects_bad_input() {
        let service = service();

        let negative = NewAccount::new("Ada", dec(-1), dec(5), "555", "secret");
        assert_eq!(
            service.open_account(&teller(), &negative),
            Err(Error::InvalidAmount(dec(-1)))
        );

        let no_limit = NewAccount::new("Ada", dec(10), Decimal::ZERO, "555", "secret");
        assert!(matches!(
            service.open_account(&teller(), &no_limit),
            Err(Error::InvalidAmount(_))
        ));

        let no_phone = NewAccount::new("Ada", dec(10), dec(5), " ", "secret");
        assert!(matches!(
            service.open_account(&teller(), &no_phone),
            Err(Error::Validation(_))
        ));

        assert!(service.list_accounts(&teller()).unwrap().is_empty());
    }

    // ==================== Deposit / Withdraw ====================

    #[test]
    fn test_deposit() {
        let service = service();
        let number = open(&service, 300, 0, 100);

        assert_eq!(service.deposit(&teller(), number, dec(200)).unwrap(), dec(500));
        assert_eq!(service.check_balance(&teller(), number, "secret").unwrap(), dec(500));
    }

    #[test]
    fn test_deposit_overflow_keeps_store_usable() {
        let service = service();
        let number = open(&service, 300, 0, 100);

        assert_eq!(
            service.deposit(&teller(), number, Decimal::MAX),
            Err(Error::InvalidAmount(Decimal::MAX))
        );
        assert_eq!(service.deposit(&teller(), number, dec(1)).unwrap(), dec(301));
    }

    #[test]
    fn test_open_after_highest_number() {
        let service = service();
        let request = NewAccount::new("Ada", dec(10), dec(5), "555", "secret")
            .with_number(AccountNumber::new(i64::MAX));
        service.open_account(&teller(), &request).unwrap();

        let next = NewAccount::new("Grace", dec(10), dec(5), "555", "secret");
        assert_eq!(
            service.open_account(&teller(), &next),
            Err(Error::validation("account numbers exhausted"))
        );
        assert_eq!(service.list_accounts(&teller()).unwrap().len(), 1);
    }

    #[test]
    fn test_ended_session_is_rejected() {
        let service = service();
        let number = open(&service, 300, 0, 100);
        let mut session = teller();
        session.end();

        assert_eq!(
            service.deposit(&session, number, dec(1)),
            Err(Error::SessionExpired)
        );
        assert_eq!(
            service.withdraw(&session, number, dec(1), "secret"),
            Err(Error::SessionExpired)
        );
        assert_eq!(service.check_balance(&teller(), number, "secret").unwrap(), dec(300));
    }

    #[test]
    fn test_deposit_errors() {
        let service = service();
        let number = open(&service, 300, 0, 100);

        assert!(matches!(
            service.deposit(&teller(), number, Decimal::ZERO),
            Err(Error::InvalidAmount(_))
        ));
        assert_eq!(
            service.deposit(&teller(), AccountNumber::new(9999), dec(1)),
            Err(Error::account_not_found(AccountNumber::new(9999)))
        );
        assert_eq!(service.check_balance(&teller(), number, "secret").unwrap(), dec(300));
    }

    #[test]
    fn test_withdraw_success() {
        let service = service();
        let number = open(&service, 3000, 1000, 1500);

        assert_eq!(service.withdraw(&teller(), number, dec(1500), "secret").unwrap(), dec(1500));
        assert_eq!(service.withdraw(&teller(), number, dec(500), "secret").unwrap(), dec(1000));
    }

    #[test]
    fn test_withdraw_check_order() {
        let service = service();
        let number = open(&service, 3000, 1000, 500);

        // Amount before existence
        assert!(matches!(
            service.withdraw(&teller(), AccountNumber::new(1), dec(-1), "secret"),
            Err(Error::InvalidAmount(_))
        ));
        // Existence before password
        assert!(matches!(
            service.withdraw(&teller(), AccountNumber::new(1), dec(10), "wrong"),
            Err(Error::AccountNotFound { .. })
        ));
        // Password before balance
        assert_eq!(
            service.withdraw(&teller(), number, dec(100_000), "wrong"),
            Err(Error::AuthenticationFailed)
        );
        // Balance before limit: 2600 breaks both rules
        assert!(matches!(
            service.withdraw(&teller(), number, dec(2600), "secret"),
            Err(Error::InsufficientBalance { .. })
        ));
        // Limit alone
        assert_eq!(
            service.withdraw(&teller(), number, dec(600), "secret"),
            Err(Error::MaxWithdrawExceeded {
                requested: dec(600),
                limit: dec(500),
            })
        );

        assert_eq!(service.check_balance(&teller(), number, "secret").unwrap(), dec(3000));
    }

    #[test]
    fn test_withdraw_cents() {
        let service = service();
        let number = open(&service, 100, 0, 100);

        let left = service
            .withdraw(&teller(), number, Decimal::new(1050, 2), "secret")
            .unwrap();
        assert_eq!(left, Decimal::new(8950, 2));
    }

    // ==================== Transfer ====================

    #[test]
    fn test_transfer_moves_money() {
        let service = service();
        let from = open(&service, 1000, 0, 100);
        let to = open(&service, 50, 0, 100);

        let receipt = service.transfer(&teller(), from, to, dec(250), "secret").unwrap();
        assert_eq!(receipt.from_balance, dec(750));
        assert_eq!(receipt.to_balance, dec(300));
        assert_eq!(service.check_balance(&teller(), to, "secret").unwrap(), dec(300));
    }

    #[test]
    fn test_transfer_ignores_withdraw_rules() {
        let service = service();
        let from = open(&service, 1200, 1000, 100);
        let to = open(&service, 0, 0, 100);

        let receipt = service.transfer(&teller(), from, to, dec(1200), "secret").unwrap();
        assert_eq!(receipt.from_balance, Decimal::ZERO);
    }

    #[test]
    fn test_transfer_missing_destination_rolls_back() {
        let service = service();
        let from = open(&service, 150, 0, 100);
        let missing = AccountNumber::new(7777);

        assert_eq!(
            service.transfer(&teller(), from, missing, dec(100), "secret"),
            Err(Error::AccountNotFound {
                account: missing,
                role: AccountRole::Destination,
            })
        );
        assert_eq!(service.check_balance(&teller(), from, "secret").unwrap(), dec(150));
    }

    #[test]
    fn test_transfer_errors() {
        let service = service();
        let from = open(&service, 150, 0, 100);
        let to = open(&service, 150, 0, 100);

        assert_eq!(
            service.transfer(&teller(), AccountNumber::new(1), to, dec(10), "secret"),
            Err(Error::AccountNotFound {
                account: AccountNumber::new(1),
                role: AccountRole::Source,
            })
        );
        assert_eq!(
            service.transfer(&teller(), from, to, dec(10), "wrong"),
            Err(Error::AuthenticationFailed)
        );
        assert!(matches!(
            service.transfer(&teller(), from, to, Decimal::ZERO, "secret"),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_transfer_to_self_is_net_zero() {
        let service = service();
        let number = open(&service, 150, 0, 100);

        let receipt = service.transfer(&teller(), number, number, dec(100), "secret").unwrap();
        assert_eq!(receipt.from_balance, dec(150));
        assert_eq!(receipt.to_balance, dec(150));
    }

    // ==================== Close / Balance / List ====================

    #[test]
    fn test_close_account() {
        let service = service();
        let number = open(&service, 150, 0, 100);

        assert_eq!(
            service.close_account(&teller(), number, "wrong"),
            Err(Error::AuthenticationFailed)
        );
        service.close_account(&teller(), number, "secret").unwrap();
        assert_eq!(
            service.close_account(&teller(), number, "secret"),
            Err(Error::account_not_found(number))
        );
    }

    #[test]
    fn test_check_balance_hides_missing_accounts() {
        let service = service();
        let number = open(&service, 150, 0, 100);

        let missing = service.check_balance(&teller(), AccountNumber::new(9999), "secret");
        let wrong = service.check_balance(&teller(), number, "wrong");
        assert_eq!(missing, Err(Error::AuthenticationFailed));
        assert_eq!(missing, wrong);
    }

    #[test]
    fn test_list_accounts() {
        let service = service();
        open(&service, 150, 0, 100);
        open(&service, 250, 0, 100);

        let accounts = service.list_accounts(&teller()).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].number, AccountNumber::new(1001));
        assert_eq!(accounts[1].balance, dec(250));

        let json = serde_json::to_string(&accounts).unwrap();
        assert!(!json.contains("argon2"));
    }
}
