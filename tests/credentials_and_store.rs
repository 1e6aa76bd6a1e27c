use std::sync::Arc;

use sheetflow_core::config::AppConfig;
use sheetflow_core::context::ExecutionContext;
use sheetflow_core::error::SheetflowError;
use sheetflow_core::types::{CellValue, SheetSelector};
use sheetflow_local::LocalBackend;
use sheetflow_nodes::{NodeEnv, NodeRegistry};
use sheetflow_runner::{PipelineDef, PipelineExecutor};
use sheetflow_test_utils::{credentials_tempdir, unique_env_var, SAMPLE_ACCOUNT};

fn executor(backend: &LocalBackend, config: AppConfig) -> PipelineExecutor {
    PipelineExecutor::new(NodeRegistry::with_builtins(NodeEnv::new(
        Arc::new(backend.connector()),
        config,
    )))
}

fn auth_only(json_path: Option<&str>) -> PipelineDef {
    let params = match json_path {
        Some(p) => format!("params = {{ json_path = {:?} }}", p),
        None => String::new(),
    };
    PipelineDef::from_toml(&format!(
        "name = \"auth\"\n[[steps]]\nid = \"auth\"\nnode = \"authenticate\"\n{}\n",
        params
    ))
    .unwrap()
}

#[tokio::test]
async fn test_valid_file_wins_over_invalid_env() {
    let (_dir, path) = credentials_tempdir();
    let env_var = unique_env_var("SHEETFLOW_IT_BAD");
    std::env::set_var(&env_var, "definitely not base64");

    let backend = LocalBackend::in_memory();
    let mut config = AppConfig::default();
    config.credentials.env_var = env_var.clone();

    let mut ctx = ExecutionContext::new();
    let report = executor(&backend, config)
        .run(&auth_only(path.to_str()), &mut ctx)
        .await
        .unwrap();
    assert_eq!(
        report.step("auth").unwrap().outputs["client"],
        format!("client '{}'", SAMPLE_ACCOUNT)
    );

    std::env::remove_var(env_var);
}

#[tokio::test]
async fn test_missing_file_with_malformed_env_fails_authentication() {
    let env_var = unique_env_var("SHEETFLOW_IT_MALFORMED");
    std::env::set_var(&env_var, "definitely not base64");

    let backend = LocalBackend::in_memory();
    let mut config = AppConfig::default();
    config.credentials.env_var = env_var.clone();

    let mut ctx = ExecutionContext::new();
    let err = executor(&backend, config)
        .run(&auth_only(Some("/nonexistent/service_account.json")), &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, SheetflowError::AuthenticationFailed(_)));
    assert!(ctx.is_empty());

    std::env::remove_var(env_var);
}

#[tokio::test]
async fn test_configured_default_path_is_used() {
    let (_dir, path) = credentials_tempdir();
    let backend = LocalBackend::in_memory();
    let mut config = AppConfig::default();
    config.credentials.env_var = unique_env_var("SHEETFLOW_IT_UNSET");
    config.credentials.path = path.to_str().map(str::to_string);

    let mut ctx = ExecutionContext::new();
    executor(&backend, config).run(&auth_only(None), &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_run_results_persist_in_store_file() {
    let (dir, path) = credentials_tempdir();
    let store = dir.path().join("state").join("sheets.json");

    let backend = LocalBackend::open(&store).await.unwrap();
    let mut config = AppConfig::default();
    config.credentials.path = path.to_str().map(str::to_string);
    let def = PipelineDef::from_toml(
        r#"
name = "persist"

[[steps]]
id = "auth"
node = "authenticate"

[[steps]]
id = "create"
node = "create_spreadsheet"
params = { title = "Ledger" }

[[steps]]
id = "append"
node = "append_row"
params = { values = ["opening", 250, true] }
"#,
    )
    .unwrap();

    let mut ctx = ExecutionContext::new();
    executor(&backend, config).run(&def, &mut ctx).await.unwrap();
    backend.save().await.unwrap();
    assert!(store.exists());

    let reopened = LocalBackend::open(&store).await.unwrap();
    let ledger = reopened.client(SAMPLE_ACCOUNT).open_by_title("Ledger").await.unwrap();
    let sheet = ledger.sheet(&SheetSelector::Default).await.unwrap();
    assert_eq!(
        sheet.get_row(1).await.unwrap(),
        vec![CellValue::from("opening"), CellValue::Number(250.0), CellValue::Bool(true)]
    );
}
