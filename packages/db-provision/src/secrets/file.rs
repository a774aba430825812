//! File-backed secret store: a directory of `<id>.json` payloads.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::secrets::{SecretStore, SecretStoreError};

/// Secret store reading payloads from a directory on disk.
///
/// Each secret lives at `<root>/<id>.json`, with `/` and `:` in the id
/// flattened to `_` so hierarchical ids and ARN-style references stay single
/// path components.
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn secret_path(&self, secret_id: &str) -> PathBuf {
        let file_name = format!("{}.json", secret_id.replace(['/', ':'], "_"));
        self.root.join(file_name)
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        let path = self.secret_path(secret_id);
        debug!(secret_id, path = %path.display(), "reading secret file");
        match tokio::fs::read_to_string(&path).await {
            Ok(payload) => Ok(payload),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(SecretStoreError::NotFound),
            Err(err) => Err(SecretStoreError::Io {
                detail: err.to_string(),
            }),
        }
    }
}
