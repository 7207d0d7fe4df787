//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Datastore port
//! - Argon2id for the CredentialHasher port

pub mod argon2;
pub mod duckdb;
