//! Deployment orchestration.
//!
//! The orchestrator drives the full two-phase run: precondition workflow
//! against the maintenance database, session assembly, macro expansion,
//! the planning round-trip, and the ordered drain of the command queue.
//! External collaborators (logger, approver, database manager) enter
//! through the port contracts in [`ports`].

pub mod adapters;
mod config;
mod orchestrator;
pub mod ports;
mod preprocess;

pub use config::{DeploymentConfig, TestConfig};
pub use orchestrator::{DeploymentReport, DeploymentService};

#[cfg(test)]
mod tests;
