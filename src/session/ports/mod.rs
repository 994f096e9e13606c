//! Port contracts for session assembly.

mod connector;

pub use connector::{AuthMethod, ConnectionConfig, ConnectorFactory};
