#![allow(dead_code)]

// tests/common/mod.rs
use db_provision::Settings;
use serde_json::{json, Value};

// Logging is auto-installed for every test binary that includes this module
#[ctor::ctor]
fn init_logging() {
    provision_test_support::logging::init();
}

pub const MIGRATION_SECRET_ID: &str = "db-migration";
pub const APP_SECRET_ID: &str = "db-app";
pub const MASTER_SECRET_ID: &str = "arn:master";

/// Migration secret fixture. The port is deliberately a numeric string, the
/// app fixture's a number: the two JSON spellings must be interchangeable.
pub fn migration_secret(dbname: &str) -> Value {
    json!({
        "username": "mig_user",
        "password": "mig-pw",
        "engine": "postgres",
        "masterarn": MASTER_SECRET_ID,
        "host": "db.internal",
        "port": "5432",
        "dbname": dbname
    })
}

pub fn app_secret(dbname: &str) -> Value {
    json!({
        "username": "app_user",
        "password": "app-pw",
        "engine": "postgres",
        "masterarn": MASTER_SECRET_ID,
        "host": "db.internal",
        "port": 5432,
        "dbname": dbname
    })
}

pub fn master_credentials() -> Value {
    json!({
        "username": "root",
        "password": "root-pw"
    })
}

pub fn settings_with_app() -> Settings {
    Settings {
        migration_secret_id: MIGRATION_SECRET_ID.to_string(),
        app_secret_id: Some(APP_SECRET_ID.to_string()),
        admin_db: "postgres".to_string(),
        owner_role: "postgres".to_string(),
        migration_role: "mig_grp".to_string(),
        app_role: "app_grp".to_string(),
        schema: "public".to_string(),
        host_override: None,
        ca_bundle_file: "does-not-exist.pem".into(),
        secrets_dir: "secrets".into(),
    }
}

pub fn settings_without_app() -> Settings {
    Settings {
        app_secret_id: None,
        ..settings_with_app()
    }
}
