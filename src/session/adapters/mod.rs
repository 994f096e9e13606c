//! Adapter implementations for session assembly.

mod r2d2_connector;

pub use r2d2_connector::R2d2ConnectorFactory;
