//! Secret-store boundary and the records resolved through it.
//!
//! The store itself is a thin, swappable adapter: anything that can return
//! the raw JSON document for an identifier. The resolver owns validation
//! and normalization; see [`resolver`].

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod record;
pub mod resolver;

pub use file::FileSecretStore;
pub use record::{Credentials, DbSecret, DbSecretStrict, PortValue};

/// Failure inside a secret-store adapter, before any validation happens.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret not found")]
    NotFound,
    #[error("failed to read secret: {detail}")]
    Io { detail: String },
}

/// Fetch-by-identifier access to encrypted credential material.
///
/// Implementations return the secret's raw string payload; callers treat it
/// as untyped JSON until it has been validated against a record shape.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError>;
}
