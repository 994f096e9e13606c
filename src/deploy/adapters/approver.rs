//! Approver adapters.

use crate::deploy::ports::{Approver, ApproverResult};
use async_trait::async_trait;

/// Approver returning a fixed decision.
///
/// Interactive approval belongs to the caller (a TTY prompt is a CLI
/// concern); the engine ships the two fixed policies.
#[derive(Debug, Clone, Copy)]
pub struct StaticApprover {
    decision: bool,
}

impl StaticApprover {
    /// Approves every request.
    #[must_use]
    pub const fn approve_all() -> Self {
        Self { decision: true }
    }

    /// Denies every request.
    #[must_use]
    pub const fn deny_all() -> Self {
        Self { decision: false }
    }
}

#[async_trait]
impl Approver for StaticApprover {
    async fn request_approval(&self, _database: &str) -> ApproverResult<bool> {
        Ok(self.decision)
    }
}
