//! Drives the `sf_mcp` binary over stdio with an rmcp client.
#![cfg(unix)]

use anyhow::Result;
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult},
    service::{RoleClient, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;
use sf_mcp::test_utils::FakeCli;
use std::borrow::Cow;
use tokio::process::Command;

async fn start_client(cli: &FakeCli) -> Result<RunningService<RoleClient, ()>> {
    let binary = env!("CARGO_BIN_EXE_sf_mcp");
    let client = ()
        .serve(TokioChildProcess::new(Command::new(binary).configure(|cmd| {
            cmd.arg("--sf-binary")
                .arg(cli.path())
                .arg("--timeout")
                .arg("20")
                .env_remove("RUST_LOG")
                .kill_on_drop(true);
        }))?)
        .await?;
    Ok(client)
}

fn params(name: &str, arguments: serde_json::Value) -> CallToolRequestParams {
    CallToolRequestParams {
        name: Cow::Owned(name.to_string()),
        arguments: arguments.as_object().cloned(),
        task: None,
        meta: None,
    }
}

fn first_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .find_map(|c| c.as_text().map(|t| t.text.clone()))
        .unwrap_or_default()
}

#[tokio::test]
async fn lists_the_eight_salesforce_tools() -> Result<()> {
    let cli = FakeCli::recording("{}", 0);
    let client = start_client(&cli).await?;

    let info = client.peer_info().expect("server info after initialize");
    assert_eq!(info.server_info.name, "salesforce-cli-mcp-server");

    let tools = client.list_tools(None).await?.tools;
    let names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "sf_org_list",
            "sf_data_query",
            "sf_project_deploy",
            "sf_project_retrieve",
            "sf_apex_test_run",
            "sf_data_import",
            "sf_package_create",
            "sf_custom_command",
        ]
    );

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn call_tool_returns_pretty_json_from_the_cli() -> Result<()> {
    let cli = FakeCli::recording(r#"{"status":0,"result":[]}"#, 0);
    let client = start_client(&cli).await?;

    let result = client
        .call_tool(params("sf_org_list", json!({ "all": true })))
        .await?;
    assert!(!result.is_error.unwrap_or(false));
    let text = first_text(&result);
    assert_eq!(serde_json::from_str::<serde_json::Value>(&text)?, json!({ "status": 0, "result": [] }));
    assert!(text.contains('\n'), "expected pretty-printed JSON: {text}");
    assert_eq!(cli.recorded_args(), vec!["org", "list", "--json", "--all"]);

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn failures_are_tool_errors_not_protocol_errors() -> Result<()> {
    let cli = FakeCli::recording("{}", 0);
    let client = start_client(&cli).await?;

    let result = client.call_tool(params("sf_nonexistent", json!({}))).await?;
    assert!(result.is_error.unwrap_or(false));
    assert_eq!(first_text(&result), "Error: Unknown tool: sf_nonexistent");

    let result = client
        .call_tool(params("sf_data_query", json!({ "bulk": true })))
        .await?;
    assert!(result.is_error.unwrap_or(false));
    assert_eq!(first_text(&result), "Error: Missing required parameter 'query'");
    assert!(cli.recorded_args().is_empty(), "invalid calls must not spawn the CLI");

    client.cancel().await?;
    Ok(())
}
