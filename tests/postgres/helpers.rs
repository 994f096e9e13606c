//! Shared cluster lifecycle and service wiring for the postgres suite.

use camino::Utf8PathBuf;
use diesel::Connection;
use diesel::pg::PgConnection;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use pgmi::catalog::adapters::FsSourceScanner;
use pgmi::deploy::adapters::{
    NullLogger, PostgresDatabaseManager, RecordingLogger, StaticApprover,
};
use pgmi::deploy::ports::Logger;
use pgmi::deploy::{DeploymentConfig, DeploymentService, TestConfig};
use pgmi::session::ConnectionConfig;
use pgmi::session::adapters::R2d2ConnectorFactory;
use pgmi::testing::TestRunner;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

static SHARED_CLUSTER: OnceLock<TestCluster> = OnceLock::new();
static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// The shared embedded cluster, started on first use.
pub fn cluster() -> &'static TestCluster {
    SHARED_CLUSTER.get_or_init(|| TestCluster::new().expect("embedded cluster should start"))
}

/// Server-level connection settings for the shared cluster.
pub fn server_connection() -> ConnectionConfig {
    let url = cluster().connection().database_url("postgres");
    let base = url
        .rsplit_once('/')
        .map(|(server, _db)| server.to_owned())
        .expect("cluster URL has a database path");
    ConnectionConfig::new(base).with_application_name("pgmi-tests")
}

/// A database name unique within this test process.
pub fn unique_database(prefix: &str) -> String {
    let id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}_{}_{id}", std::process::id())
}

/// Service type used across the suite.
pub type Service = DeploymentService<
    FsSourceScanner,
    R2d2ConnectorFactory,
    PostgresDatabaseManager<R2d2ConnectorFactory>,
    StaticApprover,
    DefaultClock,
>;

/// Wires a deployment service with production adapters.
pub fn deployment_service(approver: StaticApprover) -> Service {
    let connector = Arc::new(R2d2ConnectorFactory::new());
    DeploymentService::new(
        Arc::new(FsSourceScanner::new()),
        Arc::clone(&connector),
        Arc::new(PostgresDatabaseManager::new(connector)),
        Arc::new(approver),
        Arc::new(NullLogger) as Arc<dyn Logger>,
        Arc::new(DefaultClock),
    )
}

/// Wires a test runner recording its logger output.
pub fn test_runner() -> (
    TestRunner<FsSourceScanner, R2d2ConnectorFactory, DefaultClock>,
    Arc<RecordingLogger>,
) {
    let logger = Arc::new(RecordingLogger::new());
    let runner = TestRunner::new(
        Arc::new(FsSourceScanner::new()),
        Arc::new(R2d2ConnectorFactory::new()),
        Arc::clone(&logger) as Arc<dyn Logger>,
        Arc::new(DefaultClock),
    );
    (runner, logger)
}

/// Materializes a source tree in a temp directory.
///
/// Paths are relative to the root; parent directories are created as
/// needed.
pub fn write_sources(files: &[(&str, &str)]) -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp dir");
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&full, content).expect("write source file");
    }
    (temp, root)
}

/// Deployment config for a fresh target with overwrite+force defaults.
pub fn deploy_config(root: &Utf8PathBuf, database: &str) -> DeploymentConfig {
    DeploymentConfig::new(server_connection(), database, root.clone())
        .overwrite(true)
        .force(true)
}

/// Test config against an existing target.
pub fn test_config(root: &Utf8PathBuf, database: &str) -> TestConfig {
    TestConfig::new(server_connection(), database, root.clone())
}

/// Opens a plain connection to a database on the shared cluster.
pub fn open_connection(database: &str) -> PgConnection {
    let url = cluster().connection().database_url(database);
    PgConnection::establish(&url).expect("connect to cluster database")
}
