//! Auth service - user registration, login and sessions

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{Error, NewUser, Result, Session, User};
use crate::ports::{CredentialHasher, Datastore};

/// Verified against for unknown usernames
const DUMMY_PASSWORD: &str = "ledger-dummy-user";

/// Registers users and turns successful logins into sessions
pub struct AuthService {
    store: Arc<dyn Datastore>,
    hasher: Arc<dyn CredentialHasher>,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(store: Arc<dyn Datastore>, hasher: Arc<dyn CredentialHasher>) -> Result<Self> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            dummy_hash,
        })
    }

    /// Create a user. Usernames are matched exactly.
    pub fn register_user(&self, request: &NewUser) -> Result<User> {
        request.validate().map_err(Error::validation)?;

        let credential_hash = self.hasher.hash(&request.password)?;

        let mut tx = self.store.begin()?;
        if tx.find_user(&request.username)?.is_some() {
            return Err(Error::DuplicateUsername(request.username.clone()));
        }

        let user = User {
            username: request.username.clone(),
            credential_hash,
            email: request.email.clone(),
            created_at: Utc::now(),
        };
        tx.insert_user(&user)?;
        tx.commit()?;

        Ok(user)
    }

    /// Check a username/password pair. An unknown user and a wrong password
    /// both return `false`.
    pub fn authenticate_user(&self, username: &str, password: &str) -> Result<bool> {
        let mut tx = self.store.begin()?;
        let user = tx.find_user(username)?;
        tx.commit()?;

        match user {
            Some(user) => Ok(self.hasher.verify(password, &user.credential_hash)),
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                Ok(false)
            }
        }
    }

    /// Start a session for valid credentials
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        if self.authenticate_user(username, password)? {
            Ok(Session::start(username))
        } else {
            Err(Error::AuthenticationFailed)
        }
    }

    /// End a session. Further `require_active` calls fail.
    pub fn logout(&self, session: &mut Session) {
        session.end();
    }

    pub fn user_count(&self) -> Result<i64> {
        let mut tx = self.store.begin()?;
        let count = tx.count_users()?;
        tx.commit()?;
        Ok(count)
    }
}
