//! In-memory secret store for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use db_provision::secrets::{SecretStore, SecretStoreError};
use tracing::debug;

/// Secret store backed by a map, counting fetches per identifier so tests
/// can assert how often the engine actually reaches out for a secret.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
    fetch_counts: Mutex<HashMap<String, usize>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a JSON payload under `secret_id`.
    pub fn with_secret(mut self, secret_id: &str, payload: serde_json::Value) -> Self {
        self.secrets
            .insert(secret_id.to_string(), payload.to_string());
        self
    }

    /// Register a raw (possibly malformed) payload under `secret_id`.
    pub fn with_raw_secret(mut self, secret_id: &str, payload: &str) -> Self {
        self.secrets
            .insert(secret_id.to_string(), payload.to_string());
        self
    }

    /// How many times `secret_id` has been fetched so far.
    pub fn fetch_count(&self, secret_id: &str) -> usize {
        self.fetch_counts
            .lock()
            .unwrap()
            .get(secret_id)
            .copied()
            .unwrap_or(0)
    }

    /// Total fetches across all identifiers.
    pub fn total_fetches(&self) -> usize {
        self.fetch_counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        *self
            .fetch_counts
            .lock()
            .unwrap()
            .entry(secret_id.to_string())
            .or_insert(0) += 1;
        debug!(secret_id, "serving secret from memory");
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or(SecretStoreError::NotFound)
    }
}
