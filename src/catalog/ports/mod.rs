//! Port contracts for the source catalog.

mod scanner;

pub use scanner::{SourceScanner, SourceScannerResult};
