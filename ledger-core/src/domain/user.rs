//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A login identity. Users are independent of accounts: logging in opens
/// the menu, it does not grant ownership of any account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Registration request
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
        }
    }

    /// All three fields are required
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.is_empty() {
            return Err("username cannot be empty");
        }
        if self.password.is_empty() {
            return Err("password cannot be empty");
        }
        if self.email.is_empty() {
            return Err("email cannot be empty");
        }
        Ok(())
    }
}
