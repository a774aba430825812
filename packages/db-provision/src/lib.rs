//! Database provisioning engine: secret resolution and validation, pool
//! construction, and idempotent create/configure operations.
//! Used by the provisioning CLI and by integration tests.

pub mod config;
pub mod error;
pub mod infra;
pub mod run;
pub mod secrets;

pub use config::Settings;
pub use error::ProvisionError;
pub use run::{build_db_config, run_provision, RunContext, RunReport};
pub use secrets::{FileSecretStore, SecretStore};
