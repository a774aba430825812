use std::env;
use std::path::PathBuf;

use crate::error::ProvisionError;

/// Default maintenance database used for server-level statements.
pub const DEFAULT_ADMIN_DB: &str = "postgres";
/// Default role that ends up owning the provisioned database.
pub const DEFAULT_OWNER_ROLE: &str = "postgres";
/// Default role granted DDL rights on the schema.
pub const DEFAULT_MIGRATION_ROLE: &str = "mig_grp";
/// Default restricted role for runtime application connections.
pub const DEFAULT_APP_ROLE: &str = "app_grp";
/// Default schema configured by the applier.
pub const DEFAULT_SCHEMA: &str = "public";
/// Default CA bundle location (the RDS global bundle filename).
/// See <https://docs.aws.amazon.com/lambda/latest/dg/services-rds.html>
pub const DEFAULT_CA_BUNDLE_FILE: &str = "rds-ca-global-bundle.pem";
/// Default root directory of the file-backed secret store.
pub const DEFAULT_SECRETS_DIR: &str = "secrets";

/// Run settings, resolved from the environment once at startup.
///
/// All provisioning inputs are environment-style (see the README table);
/// only the migration secret identifier is required. An unset or empty
/// `DB_APP_SECRET` disables every application-role step downstream.
#[derive(Debug, Clone)]
pub struct Settings {
    pub migration_secret_id: String,
    pub app_secret_id: Option<String>,
    pub admin_db: String,
    pub owner_role: String,
    pub migration_role: String,
    pub app_role: String,
    pub schema: String,
    /// Supersedes the host recorded in the secret (e.g. to reach the server
    /// through a bastion). Port and credentials always come from the secret.
    pub host_override: Option<String>,
    pub ca_bundle_file: PathBuf,
    pub secrets_dir: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Fails with a `Config` error (before any I/O) when the migration
    /// secret identifier is missing.
    pub fn from_env() -> Result<Self, ProvisionError> {
        Ok(Self {
            migration_secret_id: must_var("DB_MIGRATION_SECRET")?,
            app_secret_id: optional_var("DB_APP_SECRET"),
            admin_db: var_or("DB_ADMIN_DB", DEFAULT_ADMIN_DB),
            owner_role: var_or("DB_OWNER_ROLE", DEFAULT_OWNER_ROLE),
            migration_role: var_or("DB_MIGRATION_ROLE", DEFAULT_MIGRATION_ROLE),
            app_role: var_or("DB_APP_ROLE", DEFAULT_APP_ROLE),
            schema: var_or("DB_SCHEMA", DEFAULT_SCHEMA),
            host_override: optional_var("PGHOST"),
            ca_bundle_file: PathBuf::from(var_or("DB_CA_BUNDLE_FILE", DEFAULT_CA_BUNDLE_FILE)),
            secrets_dir: PathBuf::from(var_or("DB_SECRETS_DIR", DEFAULT_SECRETS_DIR)),
        })
    }
}

/// Get required environment variable or return error. An empty value counts
/// as missing.
fn must_var(name: &str) -> Result<String, ProvisionError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ProvisionError::config(format!(
            "Required environment variable '{name}' is not set"
        ))),
    }
}

/// Get an optional environment variable; empty values count as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable, falling back to a default when unset or
/// empty.
fn var_or(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}
