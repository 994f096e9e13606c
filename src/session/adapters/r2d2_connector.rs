//! Production connector building r2d2 pools.

use crate::session::ports::{ConnectionConfig, ConnectorFactory};
use crate::session::retry::{RetryPolicy, run_with_retry};
use crate::session::{PgPool, SessionError, SessionResult};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Connections a session pool holds: the pinned connection plus one spare
/// so `Close` never blocks on a checkout race.
const POOL_SIZE: u32 = 2;

/// Connector backed by `diesel::r2d2`, with transient-failure retries.
#[derive(Debug, Clone)]
pub struct R2d2ConnectorFactory {
    policy: RetryPolicy,
    connection_timeout: Duration,
}

impl Default for R2d2ConnectorFactory {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl R2d2ConnectorFactory {
    /// Creates a connector with the default retry policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl ConnectorFactory for R2d2ConnectorFactory {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        database: &str,
        cancel: &CancellationToken,
    ) -> SessionResult<PgPool> {
        let url = config.url_for(database);
        let timeout = self.connection_timeout;
        let during = format!("connecting to database {database}");

        run_with_retry(&self.policy, cancel, &during, || {
            let url = url.clone();
            let database = database.to_owned();
            async move {
                tokio::task::spawn_blocking(move || build_pool(&url, &database, timeout))
                    .await
                    .map_err(|err| SessionError::Runtime(err.to_string()))?
            }
        })
        .await
    }
}

fn build_pool(url: &str, database: &str, timeout: Duration) -> SessionResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(url);
    Pool::builder()
        .max_size(POOL_SIZE)
        .connection_timeout(timeout)
        .build(manager)
        .map_err(|err| SessionError::pool(format!("building the pool for {database}"), err))
}
