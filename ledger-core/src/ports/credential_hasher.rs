//! Credential hasher port - one-way salted password hashing

use crate::domain::Result;

/// Hashes and verifies passwords.
///
/// `hash` must salt every call, so hashing the same password twice yields
/// different strings that both verify.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing hash string
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash.
    /// Malformed hashes verify as `false`.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}
