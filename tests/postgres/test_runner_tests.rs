//! Hierarchical test plans and savepoint isolation.

use super::helpers::{
    deploy_config, deployment_service, open_connection, test_config, test_runner,
    unique_database, write_sources,
};
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::BigInt;
use pgmi::deploy::adapters::{LogLevel, StaticApprover};
use pgmi::error::EngineError;
use tokio_util::sync::CancellationToken;

#[derive(diesel::QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Creates the target database with a trivial deployment.
async fn provision(database: &str) {
    let (_temp, root) = write_sources(&[("deploy.sql", "SELECT 1;\n")]);
    deployment_service(StaticApprover::approve_all())
        .deploy(deploy_config(&root, database), &CancellationToken::new())
        .await
        .expect("provisioning deploy succeeds");
}

fn multi_level_tree() -> Vec<(&'static str, &'static str)> {
    vec![
        ("deploy.sql", "SELECT 1;\n"),
        ("__test__/_setup.sql", "CREATE TABLE fx(id int);\n"),
        ("__test__/test_a.sql", "SELECT count(*) FROM fx;\n"),
        ("__test__/b/_setup.sql", "CREATE TABLE fx_b(id int);\n"),
        ("__test__/b/test_c.sql", "SELECT count(*) FROM fx_b;\n"),
        ("__test__/b/d/test_e.sql", "SELECT count(*) FROM fx;\n"),
    ]
}

#[tokio::test(flavor = "multi_thread")]
async fn the_plan_lists_in_preorder_depth_first_order() {
    let (_temp, root) = write_sources(&multi_level_tree());
    let database = unique_database("pgmi_plan");
    provision(&database).await;

    let (runner, logger) = test_runner();
    let report = runner
        .execute(
            test_config(&root, &database).list_only(true),
            &CancellationToken::new(),
        )
        .await
        .expect("listing succeeds");

    assert!(report.listed);
    assert_eq!(report.steps_executed, 8);

    let lines = logger.messages_at(LogLevel::Info);
    let expected = [
        ("fixture", "./__test__/_setup.sql"),
        ("test", "./__test__/test_a.sql"),
        ("fixture", "./__test__/b/_setup.sql"),
        ("test", "./__test__/b/test_c.sql"),
        ("test", "./__test__/b/d/test_e.sql"),
        ("teardown", "./__test__/b/d/"),
        ("teardown", "./__test__/b/"),
        ("teardown", "./__test__/"),
    ];
    assert_eq!(lines.len(), expected.len());
    for (line, (kind, path)) in lines.iter().zip(expected) {
        assert!(
            line.contains(kind) && line.contains(path),
            "line {line:?} should name {kind} {path}"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn execution_is_isolated_and_leaves_no_trace() {
    let (_temp, root) = write_sources(&multi_level_tree());
    let database = unique_database("pgmi_iso");
    provision(&database).await;

    let (runner, _logger) = test_runner();
    let report = runner
        .execute(test_config(&root, &database), &CancellationToken::new())
        .await
        .expect("run succeeds");

    assert_eq!(report.steps_executed, 8);
    assert_eq!(report.tests_passed, 3);
    assert!(!report.listed);

    let mut conn = open_connection(&database);
    let row: CountRow = sql_query(
        "SELECT count(*) AS count FROM information_schema.tables \
         WHERE table_name IN ('fx', 'fx_b')",
    )
    .get_result(&mut conn)
    .expect("count query succeeds");
    assert_eq!(row.count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn the_first_failing_test_stops_the_run_with_its_path() {
    let (_temp, root) = write_sources(&[
        ("deploy.sql", "SELECT 1;\n"),
        ("__test__/test_a.sql", "SELECT 1/0;\n"),
        (
            "__test__/test_b.sql",
            "CREATE TABLE should_not_exist(id int);\n",
        ),
    ]);
    let database = unique_database("pgmi_failfast");
    provision(&database).await;

    let (runner, _logger) = test_runner();
    let err = runner
        .execute(test_config(&root, &database), &CancellationToken::new())
        .await
        .expect_err("must fail");

    match err {
        EngineError::TestFailed { ref path, .. } => {
            assert_eq!(path, "./__test__/test_a.sql");
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut conn = open_connection(&database);
    let row: CountRow = sql_query(
        "SELECT count(*) AS count FROM information_schema.tables \
         WHERE table_name = 'should_not_exist'",
    )
    .get_result(&mut conn)
    .expect("count query succeeds");
    assert_eq!(row.count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn filters_restrict_the_plan_and_bad_patterns_fail() {
    let (_temp, root) = write_sources(&multi_level_tree());
    let database = unique_database("pgmi_filter");
    provision(&database).await;

    let (runner, logger) = test_runner();
    let report = runner
        .execute(
            test_config(&root, &database)
                .with_filter("test_c")
                .list_only(true),
            &CancellationToken::new(),
        )
        .await
        .expect("listing succeeds");

    // only the b subtree stays relevant: its fixture chain, the matching
    // test, and the teardowns of the surviving directories
    assert!(report.steps_executed < 8);
    let lines = logger.messages_at(LogLevel::Info);
    assert!(lines.iter().any(|l| l.contains("test_c")));
    assert!(!lines.iter().any(|l| l.contains("test_e")));

    let (runner, _logger) = test_runner();
    let err = runner
        .execute(
            test_config(&root, &database).with_filter("unclosed["),
            &CancellationToken::new(),
        )
        .await
        .expect_err("must fail");
    assert!(matches!(err, EngineError::InvalidPattern { .. }));
}
