//! Session manager.
//!
//! Single entry point for session assembly: scan, connect, pin one
//! connection, install the schema, load the catalogs, apply the latest API
//! contract. Each step's failure short-circuits and releases everything
//! acquired so far; the step order is load-bearing (see the schema and
//! contract modules for the dependency chain).

use super::connection::SessionConn;
use super::loader::{DieselSessionLoader, SessionLoader};
use super::ports::{ConnectionConfig, ConnectorFactory};
use super::{PgPool, SessionError, contract, schema};
use crate::catalog::domain::{Parameter, ScanResult};
use crate::catalog::ports::SourceScanner;
use crate::error::{EngineError, EngineResult};
use camino::Utf8PathBuf;
use diesel::connection::SimpleConnection;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Request to assemble a session against a target database.
#[derive(Debug, Clone)]
pub struct PrepareSession {
    connection: ConnectionConfig,
    database: String,
    source_path: Utf8PathBuf,
    parameters: Vec<Parameter>,
    verbose: bool,
}

impl PrepareSession {
    /// Creates a request with no parameters and verbosity off.
    #[must_use]
    pub fn new(
        connection: ConnectionConfig,
        database: impl Into<String>,
        source_path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            connection,
            database: database.into(),
            source_path: source_path.into(),
            parameters: Vec::new(),
            verbose: false,
        }
    }

    /// Sets the deployment parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Raises the server-side message verbosity on the pinned connection.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The target database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The source directory.
    #[must_use]
    pub fn source_path(&self) -> &Utf8PathBuf {
        &self.source_path
    }
}

/// An assembled session: the pool, the pinned connection, and the scan.
#[derive(Debug)]
pub struct Session {
    pool: Option<PgPool>,
    conn: SessionConn,
    scan: Arc<ScanResult>,
    api_version: String,
}

impl Session {
    /// The pinned connection; every session-scoped statement goes through
    /// it.
    pub fn conn_mut(&mut self) -> &mut SessionConn {
        &mut self.conn
    }

    /// The scan result the session was assembled from.
    #[must_use]
    pub fn scan(&self) -> &ScanResult {
        &self.scan
    }

    /// The applied public API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Releases the pinned connection and closes the pool.
    ///
    /// Idempotent; the temporary namespace and everything in it vanish
    /// with the connection.
    pub fn close(&mut self) {
        self.conn.release();
        self.pool = None;
    }

    /// Whether `close` has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.pool.is_none()
    }
}

/// Assembles sessions from injected scanner and connector collaborators.
///
/// Safe for concurrent use across independent requests; each call builds
/// its own session and holds no shared mutable state.
#[derive(Debug)]
pub struct SessionManager<S, C, L = DieselSessionLoader> {
    scanner: Arc<S>,
    connector: Arc<C>,
    loader: Arc<L>,
}

impl<S, C> SessionManager<S, C, DieselSessionLoader>
where
    S: SourceScanner,
    C: ConnectorFactory,
{
    /// Creates a manager with the production loader.
    #[must_use]
    pub fn new(scanner: Arc<S>, connector: Arc<C>) -> Self {
        Self {
            scanner,
            connector,
            loader: Arc::new(DieselSessionLoader::new()),
        }
    }
}

impl<S, C, L> SessionManager<S, C, L>
where
    S: SourceScanner,
    C: ConnectorFactory,
    L: SessionLoader + 'static,
{
    /// Creates a manager with a custom loader.
    #[must_use]
    pub const fn with_loader(scanner: Arc<S>, connector: Arc<C>, loader: Arc<L>) -> Self {
        Self {
            scanner,
            connector,
            loader,
        }
    }

    /// Prepares a session against the target database.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DeploySqlNotFound`] when the root script is
    /// missing, [`EngineError::Cancelled`] when the token fires between
    /// steps, and scanner/connector/loader errors otherwise. On failure
    /// every acquired resource is released before returning.
    pub async fn prepare(
        &self,
        request: PrepareSession,
        cancel: &CancellationToken,
    ) -> EngineResult<Session> {
        self.scanner
            .validate_deploy_sql(&request.source_path)
            .await?;

        check(cancel, "scanning the source directory")?;
        let scan = Arc::new(self.scanner.scan_directory(&request.source_path).await?);

        check(cancel, "connecting to the target database")?;
        let pool = self
            .connector
            .connect(&request.connection, &request.database, cancel)
            .await?;

        check(cancel, "acquiring the pinned connection")?;
        let mut conn = acquire_pinned(&pool).await?;

        if request.verbose {
            conn.run(|c| {
                c.batch_execute("SET client_min_messages = debug1")
                    .map_err(|source| SessionError::database("raising message verbosity", source))
            })
            .await?;
        }

        check(cancel, "installing the session schema")?;
        conn.run(schema::install).await?;

        check(cancel, "loading the file catalog")?;
        let file_loader = Arc::clone(&self.loader);
        let files = Arc::clone(&scan);
        conn.run(move |c| file_loader.load_files(c, files.files()))
            .await?;

        check(cancel, "loading parameters")?;
        let parameter_loader = Arc::clone(&self.loader);
        let parameters = request.parameters.clone();
        conn.run(move |c| parameter_loader.load_parameters(c, &parameters))
            .await?;

        check(cancel, "applying the API contract")?;
        let api_version = conn.run(|c| contract::apply(c, "")).await?;

        tracing::debug!(
            target: "pgmi",
            database = %request.database,
            files = scan.files().len(),
            api_version = %api_version,
            "session prepared"
        );

        Ok(Session {
            pool: Some(pool),
            conn,
            scan,
            api_version,
        })
    }
}

async fn acquire_pinned(pool: &PgPool) -> EngineResult<SessionConn> {
    let acquiring = pool.clone();
    let pinned = tokio::task::spawn_blocking(move || acquiring.get())
        .await
        .map_err(|err| EngineError::Session(SessionError::Runtime(err.to_string())))?
        .map_err(|err| {
            EngineError::Session(SessionError::pool("acquiring the pinned connection", err))
        })?;
    Ok(SessionConn::new(pinned))
}

fn check(cancel: &CancellationToken, during: &str) -> EngineResult<()> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled {
            during: format!("before {during}"),
        })
    } else {
        Ok(())
    }
}
