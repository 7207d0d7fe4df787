//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod credential_hasher;
mod datastore;

pub use credential_hasher::CredentialHasher;
pub use datastore::{Datastore, StoreTransaction};
