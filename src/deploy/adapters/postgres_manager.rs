//! Production maintenance-database manager.

use crate::deploy::ports::{DatabaseManager, MaintenanceDatabase};
use crate::session::ports::{ConnectionConfig, ConnectorFactory};
use crate::session::{PgPool, SessionError, SessionResult, quote_ident};
use async_trait::async_trait;
use diesel::RunQueryDsl;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Manager producing handles over a connector-built maintenance pool.
#[derive(Debug)]
pub struct PostgresDatabaseManager<C> {
    connector: Arc<C>,
}

impl<C: ConnectorFactory> PostgresDatabaseManager<C> {
    /// Creates a manager sharing the engine's connector.
    #[must_use]
    pub const fn new(connector: Arc<C>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl<C: ConnectorFactory + 'static> DatabaseManager for PostgresDatabaseManager<C> {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        maintenance_db: &str,
        cancel: &CancellationToken,
    ) -> SessionResult<Box<dyn MaintenanceDatabase>> {
        let pool = self
            .connector
            .connect(config, maintenance_db, cancel)
            .await?;
        Ok(Box::new(PostgresMaintenanceDatabase { pool }))
    }
}

/// Handle bound to one maintenance pool; dropping it closes the pool.
struct PostgresMaintenanceDatabase {
    pool: PgPool,
}

impl PostgresMaintenanceDatabase {
    async fn run<T, F>(&self, context: &str, f: F) -> SessionResult<T>
    where
        F: FnOnce(&mut PgConnection) -> SessionResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let context_owned = context.to_owned();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| SessionError::pool(context_owned, err))?;
            f(&mut conn)
        })
        .await
        .map_err(|err| SessionError::Runtime(err.to_string()))?
    }
}

#[derive(diesel::QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[async_trait]
impl MaintenanceDatabase for PostgresMaintenanceDatabase {
    async fn exists(&self, database: &str) -> SessionResult<bool> {
        let name = database.to_owned();
        self.run("checking whether the database exists", move |conn| {
            let row: CountRow =
                sql_query("SELECT count(*) AS count FROM pg_database WHERE datname = $1")
                    .bind::<Text, _>(&name)
                    .get_result(conn)
                    .map_err(|source| {
                        SessionError::database("checking whether the database exists", source)
                    })?;
            Ok(row.count > 0)
        })
        .await
    }

    async fn create(&self, database: &str) -> SessionResult<()> {
        let statement = format!("CREATE DATABASE {}", quote_ident(database));
        self.run("creating the database", move |conn| {
            conn.batch_execute(&statement)
                .map_err(|source| SessionError::database("creating the database", source))
        })
        .await
    }

    async fn drop_database(&self, database: &str) -> SessionResult<()> {
        let statement = format!("DROP DATABASE IF EXISTS {}", quote_ident(database));
        self.run("dropping the database", move |conn| {
            conn.batch_execute(&statement)
                .map_err(|source| SessionError::database("dropping the database", source))
        })
        .await
    }

    async fn terminate_connections(&self, database: &str) -> SessionResult<()> {
        let name = database.to_owned();
        self.run("terminating connections", move |conn| {
            sql_query(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                 WHERE datname = $1 AND pid <> pg_backend_pid()",
            )
            .bind::<Text, _>(&name)
            .execute(conn)
            .map_err(|source| SessionError::database("terminating connections", source))?;
            Ok(())
        })
        .await
    }
}
