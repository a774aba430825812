use thiserror::Error;

use crate::secrets::SecretStoreError;

/// Pointer included in secret-format errors so operators know which layout
/// the resolver expects.
pub const SECRET_SCHEMA_HINT: &str =
    "https://docs.aws.amazon.com/secretsmanager/latest/userguide/reference_secret_json_structure.html";

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A required setting is missing or unusable. Raised before any I/O.
    #[error("Configuration error: {detail}")]
    Config { detail: String },

    /// The fetched secret does not match the expected record shape, or a
    /// field (notably `port`) cannot be normalized. The message carries a
    /// schema hint but never any secret value.
    #[error("Invalid secret '{secret_id}': {detail}; expected format as in <{SECRET_SCHEMA_HINT}>")]
    SecretFormat { secret_id: String, detail: String },

    /// Migration and application secrets disagree about the physical
    /// database target. Raised before any connection is opened.
    #[error("App secret does not match migration secret: {detail}")]
    CredentialMismatch { detail: String },

    /// An empty or otherwise invalid name was supplied to a provisioning
    /// operation. Raised before any query is issued.
    #[error("Invalid input: {detail}")]
    InvalidInput { detail: String },

    /// The secret store could not produce the requested secret.
    #[error("Secret store failure for '{secret_id}': {source}")]
    SecretStore {
        secret_id: String,
        #[source]
        source: SecretStoreError,
    },

    /// Any failure surfaced by the database client during the existence
    /// check, creation, or configuration. Never retried; idempotency of the
    /// stages makes re-invocation the recovery path.
    #[error("Database error during {operation}: {source}")]
    Db {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The cancellation token fired; observed at a stage boundary or at an
    /// in-flight suspension point. The CLI treats this as a clean shutdown.
    #[error("Provisioning cancelled during {stage}")]
    Cancelled { stage: &'static str },
}

impl ProvisionError {
    pub fn config(detail: String) -> Self {
        Self::Config { detail }
    }

    pub fn secret_format(secret_id: &str, detail: String) -> Self {
        Self::SecretFormat {
            secret_id: secret_id.to_string(),
            detail,
        }
    }

    pub fn mismatch(detail: String) -> Self {
        Self::CredentialMismatch { detail }
    }

    pub fn invalid_input(detail: String) -> Self {
        Self::InvalidInput { detail }
    }

    pub fn secret_store(secret_id: &str, source: SecretStoreError) -> Self {
        Self::SecretStore {
            secret_id: secret_id.to_string(),
            source,
        }
    }

    pub fn db(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Db { operation, source }
    }

    /// True for the variant produced by a fired cancellation token, which
    /// the process maps to a zero exit code.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
