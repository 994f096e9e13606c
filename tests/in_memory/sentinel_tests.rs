//! Sentinel error identities reachable through the public API.

use pgmi::catalog::adapters::InMemorySourceScanner;
use pgmi::deploy::adapters::{NullLogger, StaticApprover};
use pgmi::deploy::ports::{DatabaseManager, Logger, MaintenanceDatabase};
use pgmi::deploy::{DeploymentConfig, DeploymentService};
use pgmi::error::EngineError;
use pgmi::session::ports::{ConnectionConfig, ConnectorFactory};
use pgmi::session::{PgPool, SessionError, SessionResult};
use pgmi::testing::callback::validate_callback_name;
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct ExistingDatabaseManager;

#[async_trait]
impl DatabaseManager for ExistingDatabaseManager {
    async fn connect(
        &self,
        _config: &ConnectionConfig,
        _maintenance_db: &str,
        _cancel: &CancellationToken,
    ) -> SessionResult<Box<dyn MaintenanceDatabase>> {
        Ok(Box::new(AlwaysExists))
    }
}

struct AlwaysExists;

#[async_trait]
impl MaintenanceDatabase for AlwaysExists {
    async fn exists(&self, _database: &str) -> SessionResult<bool> {
        Ok(true)
    }
    async fn create(&self, _database: &str) -> SessionResult<()> {
        Ok(())
    }
    async fn drop_database(&self, _database: &str) -> SessionResult<()> {
        Ok(())
    }
    async fn terminate_connections(&self, _database: &str) -> SessionResult<()> {
        Ok(())
    }
}

struct NeverConnect;

#[async_trait]
impl ConnectorFactory for NeverConnect {
    async fn connect(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
        _cancel: &CancellationToken,
    ) -> SessionResult<PgPool> {
        Err(SessionError::pool("connecting", "no server in this suite"))
    }
}

fn service(
    scanner: InMemorySourceScanner,
    approver: StaticApprover,
) -> DeploymentService<InMemorySourceScanner, NeverConnect, ExistingDatabaseManager, StaticApprover>
{
    DeploymentService::new(
        Arc::new(scanner),
        Arc::new(NeverConnect),
        Arc::new(ExistingDatabaseManager),
        Arc::new(approver),
        Arc::new(NullLogger) as Arc<dyn Logger>,
        Arc::new(DefaultClock),
    )
}

fn config() -> DeploymentConfig {
    DeploymentConfig::new(
        ConnectionConfig::new("postgres://localhost:5432"),
        "appdb",
        "./sources",
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn approval_denial_is_identity_testable() {
    let svc = service(
        InMemorySourceScanner::new().with_deploy_sql("SELECT 1;"),
        StaticApprover::deny_all(),
    );
    let err = svc
        .deploy(config().overwrite(true), &CancellationToken::new())
        .await
        .expect_err("must fail");
    assert!(matches!(err, EngineError::ApprovalDenied { ref database } if database == "appdb"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_root_script_is_identity_testable() {
    let svc = service(InMemorySourceScanner::new(), StaticApprover::approve_all());
    let err = svc
        .deploy(config(), &CancellationToken::new())
        .await
        .expect_err("must fail");
    assert!(matches!(err, EngineError::DeploySqlNotFound { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_short_circuits_with_its_sentinel() {
    let svc = service(
        InMemorySourceScanner::new().with_deploy_sql("SELECT 1;"),
        StaticApprover::approve_all(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = svc
        .deploy(config(), &cancel)
        .await
        .expect_err("must fail");
    assert!(matches!(err, EngineError::Cancelled { .. }));
}

#[rstest]
#[case("foo", true)]
#[case("pg_temp.foo", true)]
#[case("foo.bar.baz", false)]
#[case(".foo", false)]
#[case("foo.", false)]
#[case("1foo", false)]
#[case("foo-bar", false)]
#[case("foo;DROP", false)]
fn callback_validation_matches_the_contract(#[case] name: &str, #[case] accepted: bool) {
    let result = validate_callback_name(name);
    if accepted {
        result.expect("name should validate");
    } else {
        assert!(matches!(
            result.expect_err("must fail"),
            EngineError::InvalidCallbackName { .. }
        ));
    }
}
