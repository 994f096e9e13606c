//! Two-phase deployment against the embedded cluster.

use super::helpers::{
    deploy_config, deployment_service, open_connection, unique_database, write_sources,
};
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::BigInt;
use pgmi::deploy::adapters::StaticApprover;
use pgmi::error::EngineError;
use tokio_util::sync::CancellationToken;

#[derive(diesel::QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(diesel::QueryableByName)]
struct TextRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    value: String,
}

fn table_count(database: &str, table: &str) -> i64 {
    let mut conn = open_connection(database);
    let row: CountRow = sql_query(format!(
        "SELECT count(*) AS count FROM information_schema.tables \
         WHERE table_name = '{table}'"
    ))
    .get_result(&mut conn)
    .expect("count query succeeds");
    row.count
}

fn database_exists(database: &str) -> bool {
    let mut conn = open_connection("postgres");
    let row: CountRow = sql_query(format!(
        "SELECT count(*) AS count FROM pg_database WHERE datname = '{database}'"
    ))
    .get_result(&mut conn)
    .expect("pg_database query succeeds");
    row.count > 0
}

#[tokio::test(flavor = "multi_thread")]
async fn basic_deploy_executes_the_planned_commands() {
    let (_temp, root) = write_sources(&[(
        "deploy.sql",
        "SELECT pg_temp.pgmi_plan_command('CREATE TABLE t(id int);');\n",
    )]);
    let database = unique_database("pgmi_basic");
    let service = deployment_service(StaticApprover::approve_all());

    let report = service
        .deploy(deploy_config(&root, &database), &CancellationToken::new())
        .await
        .expect("deploy succeeds");

    assert_eq!(report.commands_executed, 1);
    assert_eq!(report.api_version, "1");
    assert_eq!(table_count(&database, "t"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn parameters_reach_the_planned_sql() {
    let (_temp, root) = write_sources(&[(
        "deploy.sql",
        "SELECT pg_temp.pgmi_declare_param('env', 'text', true);\n\
         SELECT pg_temp.pgmi_plan_command(\n\
         format('CREATE TABLE param_probe AS SELECT %L::text AS value',\n\
                current_setting('pgmi.env')));\n",
    )]);
    let database = unique_database("pgmi_params");
    let service = deployment_service(StaticApprover::approve_all());

    service
        .deploy(
            deploy_config(&root, &database).with_parameter("env", "staging"),
            &CancellationToken::new(),
        )
        .await
        .expect("deploy succeeds");

    let mut conn = open_connection(&database);
    let row: TextRow = sql_query("SELECT value FROM param_probe")
        .get_result(&mut conn)
        .expect("probe row present");
    assert_eq!(row.value, "staging");
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_parameter_keys_write_nothing() {
    let (_temp, root) = write_sources(&[("deploy.sql", "SELECT 1;\n")]);
    let database = unique_database("pgmi_badkey");
    let service = deployment_service(StaticApprover::approve_all());

    let err = service
        .deploy(
            deploy_config(&root, &database).with_parameter("env name", "staging"),
            &CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    assert!(matches!(err, EngineError::InvalidParameterKey { .. }));
    assert!(!database_exists(&database));
}

#[tokio::test(flavor = "multi_thread")]
async fn deployment_plan_schedules_files_by_sort_key() {
    let (_temp, root) = write_sources(&[
        (
            "deploy.sql",
            "SELECT pg_temp.pgmi_plan_command(\n\
             'CREATE TABLE ordering_log(id serial PRIMARY KEY, name text);');\n\
             SELECT pg_temp.pgmi_plan_file(path)\n\
             FROM pgmi_deployment_plan ORDER BY execution_order;\n",
        ),
        (
            "late.sql",
            "-- pgmi-meta: {\"sort_keys\": [\"900\"]}\n\
             INSERT INTO ordering_log(name) VALUES ('late');\n",
        ),
        (
            "early.sql",
            "-- pgmi-meta: {\"sort_keys\": [\"100\"]}\n\
             INSERT INTO ordering_log(name) VALUES ('early');\n",
        ),
    ]);
    let database = unique_database("pgmi_order");
    let service = deployment_service(StaticApprover::approve_all());

    let report = service
        .deploy(deploy_config(&root, &database), &CancellationToken::new())
        .await
        .expect("deploy succeeds");
    assert_eq!(report.commands_executed, 3);

    let mut conn = open_connection(&database);
    let rows: Vec<TextRow> = sql_query("SELECT name AS value FROM ordering_log ORDER BY id")
        .load(&mut conn)
        .expect("log rows present");
    let names: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(names, vec!["early", "late"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn macro_expansion_runs_the_suite_and_rolls_it_back() {
    let (_temp, root) = write_sources(&[
        ("deploy.sql", "BEGIN;\nCALL pgmi_test();\nCOMMIT;\n"),
        (
            "__test__/test_probe.sql",
            "CREATE TABLE macro_probe(id int);\nINSERT INTO macro_probe VALUES (1);\n",
        ),
    ]);
    let database = unique_database("pgmi_macro");
    let service = deployment_service(StaticApprover::approve_all());

    let report = service
        .deploy(deploy_config(&root, &database), &CancellationToken::new())
        .await
        .expect("deploy succeeds");

    // the macro plans nothing; the test's effects were rolled back at
    // directory teardown
    assert_eq!(report.commands_executed, 0);
    assert_eq!(table_count(&database, "macro_probe"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn denied_overwrite_preserves_the_existing_database() {
    let (_temp, root) = write_sources(&[(
        "deploy.sql",
        "SELECT pg_temp.pgmi_plan_command('CREATE TABLE keep_me(id int);');\n",
    )]);
    let database = unique_database("pgmi_denied");

    deployment_service(StaticApprover::approve_all())
        .deploy(deploy_config(&root, &database), &CancellationToken::new())
        .await
        .expect("first deploy succeeds");

    let err = deployment_service(StaticApprover::deny_all())
        .deploy(
            deploy_config(&root, &database).force(false),
            &CancellationToken::new(),
        )
        .await
        .expect_err("must be denied");

    assert!(matches!(err, EngineError::ApprovalDenied { .. }));
    assert_eq!(table_count(&database, "keep_me"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn planning_the_same_file_twice_fails_the_planning_phase() {
    let (_temp, root) = write_sources(&[
        (
            "deploy.sql",
            "SELECT pg_temp.pgmi_plan_file('./thing.sql');\n\
             SELECT pg_temp.pgmi_plan_file('./thing.sql');\n",
        ),
        ("thing.sql", "SELECT 1;\n"),
    ]);
    let database = unique_database("pgmi_dupe");
    let service = deployment_service(StaticApprover::approve_all());

    let err = service
        .deploy(deploy_config(&root, &database), &CancellationToken::new())
        .await
        .expect_err("must fail");

    match err {
        EngineError::PlanningFailed { source, .. } => {
            assert!(source.to_string().contains("deploy.sql"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
