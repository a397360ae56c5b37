//! End-to-end dispatch against a fake `sf` executable.
#![cfg(unix)]

use serde_json::{Map, Value, json};
use sf_mcp::ResponseEnvelope;
use sf_mcp::config::ExecutorConfig;
use sf_mcp::registry::catalog;
use sf_mcp::test_utils::FakeCli;
use sf_mcp::utils::logging::init_test_logging;
use std::time::Duration;

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn data_query_runs_expected_argv_and_returns_parsed_json() {
    init_test_logging();
    let cli = FakeCli::recording(r#"{"status":0,"result":{"totalSize":1}}"#, 0);

    let envelope = cli
        .dispatcher()
        .dispatch(
            catalog::DATA_QUERY,
            Some(&args(json!({ "query": "SELECT Id FROM Account", "bulk": true }))),
        )
        .await;

    assert_eq!(
        cli.recorded_args(),
        vec!["data", "query", "--json", "--query", "SELECT Id FROM Account", "--bulk"]
    );
    assert_eq!(
        envelope,
        ResponseEnvelope::success(json!({ "status": 0, "result": { "totalSize": 1 } }))
    );
}

#[tokio::test]
async fn shell_metacharacters_in_values_are_passed_literally() {
    let cli = FakeCli::recording("{}", 0);
    let envelope = cli
        .dispatcher()
        .dispatch(
            catalog::DATA_QUERY,
            Some(&args(json!({ "query": "x; touch pwned", "targetOrg": "$(whoami)" }))),
        )
        .await;

    assert!(envelope.is_success());
    assert_eq!(
        cli.recorded_args(),
        vec!["data", "query", "--json", "--query", "x; touch pwned", "--target-org", "$(whoami)"]
    );
    assert!(!cli.dir().join("pwned").exists());
}

#[tokio::test]
async fn deploy_flags_follow_declaration_order() {
    let cli = FakeCli::recording("{}", 0);
    cli.dispatcher()
        .dispatch(
            catalog::PROJECT_DEPLOY,
            Some(&args(json!({
                "wait": 10,
                "checkOnly": false,
                "targetOrg": "myOrg",
                "metadata": ["ApexClass", "CustomObject"],
                "testLevel": "RunLocalTests"
            }))),
        )
        .await;

    assert_eq!(
        cli.recorded_args(),
        vec![
            "project",
            "deploy",
            "start",
            "--json",
            "--metadata",
            "ApexClass,CustomObject",
            "--target-org",
            "myOrg",
            "--test-level",
            "RunLocalTests",
            "--wait",
            "10",
        ]
    );
}

#[tokio::test]
async fn custom_command_splits_words_without_a_shell() {
    let cli = FakeCli::recording("plain text", 0);
    let envelope = cli
        .dispatcher()
        .dispatch(
            catalog::CUSTOM_COMMAND,
            Some(&args(json!({ "command": "org display --target-org \"my org\"" }))),
        )
        .await;

    assert_eq!(cli.recorded_args(), vec!["org", "display", "--target-org", "my org"]);
    assert_eq!(envelope, ResponseEnvelope::success(json!("plain text")));
}

#[tokio::test]
async fn non_zero_exit_becomes_failure_envelope() {
    let cli = FakeCli::recording(r#"{"status":1,"message":"No default org found"}"#, 1);
    let envelope = cli.dispatcher().dispatch(catalog::ORG_LIST, None).await;

    let error = envelope.error().expect("expected failure envelope");
    assert!(error.starts_with("Salesforce CLI command failed: "), "{error}");
    assert!(error.contains("No default org found"), "{error}");
}

#[tokio::test]
async fn stderr_only_output_is_returned_as_text() {
    let cli = FakeCli::new("echo 'Warning: update available' >&2");
    let envelope = cli.dispatcher().dispatch(catalog::ORG_LIST, None).await;
    assert_eq!(
        envelope,
        ResponseEnvelope::success(json!("Warning: update available\n"))
    );
}

#[tokio::test]
async fn timeout_becomes_failure_envelope() {
    let cli = FakeCli::new("exec sleep 30");
    let dispatcher = sf_mcp::Dispatcher::new(cli.executor_config().timeout(Duration::from_millis(200)));
    let envelope = dispatcher.dispatch(catalog::ORG_LIST, None).await;
    let error = envelope.error().expect("expected failure envelope");
    assert!(error.contains("timed out"), "{error}");
}

#[tokio::test]
async fn concurrent_calls_do_not_interfere() {
    let cli = FakeCli::echo_args();
    let dispatcher = cli.dispatcher();

    let calls = (0..8).map(|i| {
        let dispatcher = dispatcher.clone();
        async move {
            let query = format!("SELECT Id FROM Account LIMIT {i}");
            let envelope = dispatcher
                .dispatch(catalog::DATA_QUERY, Some(&args(json!({ "query": query.clone() }))))
                .await;
            (query, envelope)
        }
    });

    for (query, envelope) in futures::future::join_all(calls).await {
        let expected = format!("data\nquery\n--json\n--query\n{query}\n");
        assert_eq!(envelope, ResponseEnvelope::success(json!(expected)));
    }
}

#[tokio::test]
async fn execute_raw_uses_the_same_pipeline() {
    let cli = FakeCli::recording(r#"{"result":[]}"#, 0);
    let value = cli.dispatcher().execute_raw("org list --all").await.unwrap();
    assert_eq!(value, json!({ "result": [] }));
    assert_eq!(cli.recorded_args(), vec!["org", "list", "--all"]);
}

#[tokio::test]
async fn missing_binary_is_reported_not_panicked() {
    let dispatcher = sf_mcp::Dispatcher::new(ExecutorConfig::with_program("/nonexistent/bin/sf"));
    let envelope = dispatcher.dispatch(catalog::ORG_LIST, None).await;
    assert!(!envelope.is_success());
}
