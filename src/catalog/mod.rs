//! Source catalog for pgmi.
//!
//! The catalog context scans a source directory into an in-memory model
//! (canonical paths, checksums, structured metadata, parameters) that the
//! session context later installs into the database. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use domain::{
    CatalogError, CatalogResult, FileMetadata, Parameter, ParameterType, ScanResult, ScannedFile,
    checksum, param_file, path,
};
pub use ports::{SourceScanner, SourceScannerResult};

#[cfg(test)]
mod tests;
