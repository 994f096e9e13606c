//! pgmi: session-scoped migration and test engine for `PostgreSQL`.
//!
//! Given a directory of SQL sources and a set of key/value parameters, pgmi
//! prepares a single database session, makes the files and parameters
//! addressable from inside the database, executes a user-authored
//! `deploy.sql` that plans an ordered queue of SQL commands, drains that
//! queue, and optionally runs a hierarchical, savepoint-isolated test suite.
//!
//! # Architecture
//!
//! pgmi follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, filesystem)
//!
//! # Modules
//!
//! - [`catalog`]: Source-file scanning, checksums, metadata, and parameters
//! - [`script`]: Comment-aware lexing, macro detection, and source mapping
//! - [`session`]: Session assembly on a pinned database connection
//! - [`testing`]: Test planning and the savepoint-isolated test runner
//! - [`deploy`]: Deployment orchestration, collaborator ports, and retries
//!
//! # Savepoint visibility
//!
//! Test callbacks run inside savepoint regions: any transactional
//! side-effect of a fixture, a test, or a callback fired between a
//! directory savepoint and its teardown is rolled back with that savepoint.
//! Only `suite_start`, the root directory's `teardown_end`, and `suite_end`
//! fire outside all savepoints. Non-transactional side-effects (server
//! notices, log lines) always survive. This follows directly from the
//! isolation guarantee and is relied upon by the test runner.

pub mod catalog;
pub mod deploy;
pub mod error;
pub mod script;
pub mod session;
pub mod testing;
