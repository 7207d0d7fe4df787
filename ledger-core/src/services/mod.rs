//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod auth;
mod ledger;
pub mod logging;
pub mod migration;
mod status;

pub use auth::AuthService;
pub use ledger::{LedgerService, MAX_BALANCE};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{StatusService, StatusSummary};
