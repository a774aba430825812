//! Behavior of the run-scoped context: memoized resolution, consistency
//! enforcement, and error surfaces, all against the in-memory secret store.

mod common;

use common::{
    app_secret, master_credentials, migration_secret, settings_with_app, settings_without_app,
    APP_SECRET_ID, MASTER_SECRET_ID, MIGRATION_SECRET_ID,
};
use db_provision::run::{run_provision, RunContext};
use db_provision::ProvisionError;
use provision_test_support::MemorySecretStore;
use tokio_util::sync::CancellationToken;

fn store_with_all_secrets() -> MemorySecretStore {
    MemorySecretStore::new()
        .with_secret(MIGRATION_SECRET_ID, migration_secret("app"))
        .with_secret(APP_SECRET_ID, app_secret("app"))
        .with_secret(MASTER_SECRET_ID, master_credentials())
}

#[tokio::test]
async fn secrets_are_resolved_once_per_run() {
    let store = store_with_all_secrets();
    let settings = settings_with_app();
    let ctx = RunContext::new(&store, &settings);

    ctx.secrets().await.unwrap();
    ctx.secrets().await.unwrap();

    assert_eq!(store.fetch_count(MIGRATION_SECRET_ID), 1);
    assert_eq!(store.fetch_count(APP_SECRET_ID), 1);
}

#[tokio::test]
async fn master_credentials_are_resolved_once_per_run() {
    let store = store_with_all_secrets();
    let settings = settings_with_app();
    let ctx = RunContext::new(&store, &settings);

    let first = ctx.master_credentials().await.unwrap().username.clone();
    let second = ctx.master_credentials().await.unwrap().username.clone();

    assert_eq!(first, "root");
    assert_eq!(first, second);
    assert_eq!(store.fetch_count(MASTER_SECRET_ID), 1);
}

#[tokio::test]
async fn nothing_is_cached_across_runs() {
    let store = store_with_all_secrets();
    let settings = settings_with_app();

    RunContext::new(&store, &settings).secrets().await.unwrap();
    RunContext::new(&store, &settings).secrets().await.unwrap();

    assert_eq!(store.fetch_count(MIGRATION_SECRET_ID), 2);
    assert_eq!(store.fetch_count(APP_SECRET_ID), 2);
}

#[tokio::test]
async fn string_and_numeric_ports_are_interchangeable() {
    // The fixtures spell the port differently ("5432" vs 5432); consistency
    // compares normalized values, so resolution succeeds.
    let store = store_with_all_secrets();
    let settings = settings_with_app();
    let ctx = RunContext::new(&store, &settings);

    let secrets = ctx.secrets().await.unwrap();
    assert_eq!(secrets.migration.port, 5432);
    assert_eq!(secrets.app.as_ref().unwrap().port, 5432);
}

#[tokio::test]
async fn without_app_secret_only_the_migration_secret_is_fetched() {
    let store = store_with_all_secrets();
    let settings = settings_without_app();
    let ctx = RunContext::new(&store, &settings);

    let secrets = ctx.secrets().await.unwrap();
    assert!(secrets.app.is_none());
    assert_eq!(store.fetch_count(APP_SECRET_ID), 0);
}

#[tokio::test]
async fn missing_migration_secret_surfaces_the_store_error() {
    let store = MemorySecretStore::new();
    let settings = settings_with_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.secrets().await.unwrap_err();
    assert!(matches!(err, ProvisionError::SecretStore { .. }));
    assert!(err.to_string().contains(MIGRATION_SECRET_ID));
}

#[tokio::test]
async fn malformed_json_fails_with_a_schema_hint() {
    let store = MemorySecretStore::new().with_raw_secret(MIGRATION_SECRET_ID, "{not json");
    let settings = settings_without_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.secrets().await.unwrap_err();
    assert!(matches!(err, ProvisionError::SecretFormat { .. }));
    assert!(err.to_string().contains("reference_secret_json_structure"));
}

#[tokio::test]
async fn unexpected_fields_fail_with_a_schema_hint() {
    let mut payload = migration_secret("app");
    payload["surprise"] = serde_json::json!("field");
    let store = MemorySecretStore::new().with_secret(MIGRATION_SECRET_ID, payload);
    let settings = settings_without_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.secrets().await.unwrap_err();
    assert!(matches!(err, ProvisionError::SecretFormat { .. }));
    assert!(err.to_string().contains("reference_secret_json_structure"));
}

#[tokio::test]
async fn non_numeric_port_names_the_port_field() {
    let mut payload = migration_secret("app");
    payload["port"] = serde_json::json!("not-a-port");
    let store = MemorySecretStore::new().with_secret(MIGRATION_SECRET_ID, payload);
    let settings = settings_without_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.secrets().await.unwrap_err();
    assert!(matches!(err, ProvisionError::SecretFormat { .. }));
    assert!(err.to_string().contains("port"));
}

#[tokio::test]
async fn host_mismatch_fails_before_master_credentials_are_fetched() {
    let mut app = app_secret("app");
    app["host"] = serde_json::json!("db-other.internal");
    let store = MemorySecretStore::new()
        .with_secret(MIGRATION_SECRET_ID, migration_secret("app"))
        .with_secret(APP_SECRET_ID, app)
        .with_secret(MASTER_SECRET_ID, master_credentials());
    let settings = settings_with_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.secrets().await.unwrap_err();
    assert!(matches!(err, ProvisionError::CredentialMismatch { .. }));

    let master_err = ctx.master_credentials().await.unwrap_err();
    assert!(matches!(master_err, ProvisionError::CredentialMismatch { .. }));
    assert_eq!(store.fetch_count(MASTER_SECRET_ID), 0);
}

#[tokio::test]
async fn a_cancelled_run_touches_nothing() {
    let store = store_with_all_secrets();
    let settings = settings_with_app();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = run_provision(&store, &settings, &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(store.total_fetches(), 0);
}

#[tokio::test]
async fn secret_errors_never_leak_credential_material() {
    let mut payload = migration_secret("app");
    payload["port"] = serde_json::json!("not-a-port");
    let store = MemorySecretStore::new().with_secret(MIGRATION_SECRET_ID, payload);
    let settings = settings_without_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.secrets().await.unwrap_err();
    let rendered = format!("{err} / {err:?}");
    assert!(!rendered.contains("mig-pw"));
    assert!(!rendered.contains("root-pw"));
}

#[tokio::test]
async fn mistyped_db_secret_password_is_not_echoed() {
    // An all-digit password stored unquoted turns into a JSON number; the
    // shape error must name the field without repeating the digits.
    let mut payload = migration_secret("app");
    payload["password"] = serde_json::json!(12345678);
    let store = MemorySecretStore::new().with_secret(MIGRATION_SECRET_ID, payload);
    let settings = settings_without_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.secrets().await.unwrap_err();
    let rendered = format!("{err} / {err:?}");
    assert!(matches!(err, ProvisionError::SecretFormat { .. }));
    assert!(rendered.contains("password"));
    assert!(!rendered.contains("12345678"));
}

#[tokio::test]
async fn mistyped_master_secret_password_is_not_echoed() {
    let mut master = master_credentials();
    master["password"] = serde_json::json!(987654321);
    let store = MemorySecretStore::new()
        .with_secret(MIGRATION_SECRET_ID, migration_secret("app"))
        .with_secret(MASTER_SECRET_ID, master);
    let settings = settings_without_app();
    let ctx = RunContext::new(&store, &settings);

    let err = ctx.master_credentials().await.unwrap_err();
    let rendered = format!("{err} / {err:?}");
    assert!(matches!(err, ProvisionError::SecretFormat { .. }));
    assert!(rendered.contains(MASTER_SECRET_ID));
    assert!(rendered.contains("password"));
    assert!(!rendered.contains("987654321"));
}
