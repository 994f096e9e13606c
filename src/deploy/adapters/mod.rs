//! Adapter implementations for deployment collaborators.

mod approver;
mod logging;
mod postgres_manager;

pub use approver::StaticApprover;
pub use logging::{LogLevel, NullLogger, RecordingLogger, TracingLogger};
pub use postgres_manager::PostgresDatabaseManager;
