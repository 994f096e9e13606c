//! Approval port for destructive operations.

use async_trait::async_trait;

/// Result type for approver operations.
pub type ApproverResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Asks the operator before an existing database is dropped.
#[async_trait]
pub trait Approver: Send + Sync {
    /// Requests approval to overwrite `database`.
    ///
    /// A denial is `Ok(false)`, not an error; errors mean the approval
    /// channel itself failed.
    ///
    /// # Errors
    ///
    /// Returns the underlying channel failure.
    async fn request_approval(&self, database: &str) -> ApproverResult<bool>;
}
