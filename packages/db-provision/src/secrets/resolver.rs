//! Resolution of secret-store payloads into typed records.

use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::secrets::{Credentials, DbSecret, DbSecretStrict, SecretStore};

/// Fetch a secret and parse its payload as JSON. Credential material stays
/// inside the returned value; errors carry the secret id and parse position
/// only.
async fn fetch_json(
    store: &dyn SecretStore,
    secret_id: &str,
) -> Result<serde_json::Value, ProvisionError> {
    debug!(secret_id, "fetching secret");
    let payload = store
        .fetch(secret_id)
        .await
        .map_err(|source| ProvisionError::secret_store(secret_id, source))?;
    serde_json::from_str(&payload).map_err(|err| {
        ProvisionError::secret_format(secret_id, format!("the payload is not valid JSON ({err})"))
    })
}

/// Fetch a database secret and narrow it to the strict record.
///
/// The payload must match [`DbSecret`] exactly; unknown fields mean the
/// identifier points at the wrong secret, and that is a hard error.
pub async fn fetch_db_secret(
    store: &dyn SecretStore,
    secret_id: &str,
) -> Result<DbSecretStrict, ProvisionError> {
    let value = fetch_json(store, secret_id).await?;
    let strict = DbSecret::from_value(&value)
        .and_then(DbSecret::into_strict)
        .map_err(|detail| ProvisionError::secret_format(secret_id, detail))?;
    info!(secret_id, host = %strict.host, "resolved database secret");
    Ok(strict)
}

/// Fetch the master credentials referenced by a database secret's
/// `masterarn`. Extra fields in the payload are tolerated here: master
/// secrets are often full database secrets themselves, and only the
/// username/password pair matters.
pub async fn fetch_master_credentials(
    store: &dyn SecretStore,
    secret_id: &str,
) -> Result<Credentials, ProvisionError> {
    let value = fetch_json(store, secret_id).await?;
    let credentials = Credentials::from_value(&value)
        .map_err(|detail| ProvisionError::secret_format(secret_id, detail))?;
    info!(secret_id, "resolved master credentials");
    Ok(credentials)
}

/// Verify that the migration and application secrets describe the same
/// database server. Both roles must land on one physical instance; a
/// disagreement means the secrets were wired to different servers and
/// provisioning must not proceed. An absent app secret passes trivially.
pub fn check_consistency(
    migration: &DbSecretStrict,
    app: Option<&DbSecretStrict>,
) -> Result<(), ProvisionError> {
    let Some(app) = app else {
        return Ok(());
    };
    if migration.host != app.host {
        return Err(ProvisionError::mismatch("the hosts differ".to_string()));
    }
    if migration.port != app.port {
        return Err(ProvisionError::mismatch("the ports differ".to_string()));
    }
    if migration.engine != app.engine {
        return Err(ProvisionError::mismatch("the engines differ".to_string()));
    }
    if migration.masterarn != app.masterarn {
        return Err(ProvisionError::mismatch(
            "the master secret references differ".to_string(),
        ));
    }
    debug!("migration and app secrets agree on the database server");
    Ok(())
}
