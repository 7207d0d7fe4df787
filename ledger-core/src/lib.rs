//! Ledger Core - account ledger for a small savings bank
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, User, Session, errors)
//! - **ports**: Trait definitions for external dependencies (Datastore, CredentialHasher)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, Argon2)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::argon2::Argon2Hasher;
use adapters::duckdb::DuckDbDatastore;
use config::Config;
use ports::{CredentialHasher, Datastore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Account, AccountKind, AccountNumber, AccountSummary, NewAccount, NewUser, Session,
    TransferReceipt, User,
};
pub use domain::result::{Error, OperationResult};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Name of the ledger database inside the data directory
pub const DB_FILENAME: &str = "ledger.duckdb";

/// Main context for ledger operations
///
/// Built once by the caller and passed by reference; it holds the datastore,
/// configuration and all services.
pub struct LedgerContext {
    pub config: Config,
    pub datastore: Arc<dyn Datastore>,
    pub ledger_service: LedgerService,
    pub auth_service: AuthService,
    pub status_service: StatusService,
}

impl LedgerContext {
    /// Create a context from settings.json in `ledger_dir`
    pub fn new(ledger_dir: &Path) -> Result<Self> {
        let config = Config::load(ledger_dir)?;
        Self::with_config(ledger_dir, config)
    }

    /// Create a context with an explicit configuration
    pub fn with_config(ledger_dir: &Path, config: Config) -> Result<Self> {
        std::fs::create_dir_all(ledger_dir)
            .with_context(|| format!("Failed to create {}", ledger_dir.display()))?;

        let db_path = ledger_dir.join(DB_FILENAME);
        let datastore: Arc<dyn Datastore> = Arc::new(DuckDbDatastore::new(&db_path)?);

        Self::from_parts(config, datastore, Some(db_path))
    }

    /// Assemble a context around an existing datastore, applying pending
    /// migrations to it
    pub fn from_parts(
        config: Config,
        datastore: Arc<dyn Datastore>,
        db_path: Option<std::path::PathBuf>,
    ) -> Result<Self> {
        datastore.ensure_schema()?;
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new(&config.argon2)?);

        let ledger_service = LedgerService::new(
            Arc::clone(&datastore),
            Arc::clone(&hasher),
            config.ledger.clone(),
        )?;
        let auth_service = AuthService::new(Arc::clone(&datastore), Arc::clone(&hasher))?;
        let status_service = StatusService::new(Arc::clone(&datastore), db_path);

        Ok(Self {
            config,
            datastore,
            ledger_service,
            auth_service,
            status_service,
        })
    }
}
