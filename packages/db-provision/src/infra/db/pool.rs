//! Connection pools for the provisioning run.
//!
//! Two pools are built from one host/credentials tuple: an admin pool scoped
//! to the maintenance database (create-database needs a connection that is
//! not the target itself) and an app pool scoped to the database being
//! provisioned. The admin pool connects eagerly; the app pool must not,
//! because its database may not exist until the run has created it through
//! the admin pool. Both are sized for a single sequential run.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tracing::info;

use crate::error::ProvisionError;

/// Connection parameters shared by both pools.
pub struct PoolParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub admin_db: String,
    pub app_db: String,
    pub ca_bundle: Option<Vec<u8>>,
}

impl fmt::Debug for PoolParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("admin_db", &self.admin_db)
            .field("app_db", &self.app_db)
            .field("ca_bundle", &self.ca_bundle.as_ref().map(|_| "<pem>"))
            .finish()
    }
}

/// The two run-scoped pools. Owned by the run and closed when it ends,
/// success or failure.
pub struct PoolPair {
    pub admin: PgPool,
    pub app: PgPool,
}

impl PoolPair {
    /// Close both pools, waiting for held connections to be returned.
    pub async fn close(&self) {
        tokio::join!(self.admin.close(), self.app.close());
    }
}

/// Read the CA bundle at `path`, if one is present.
///
/// A missing file means the operator did not provide a bundle and the run
/// proceeds without enforced TLS; any other read failure is fatal.
pub fn load_ca_bundle(path: &Path) -> Result<Option<Vec<u8>>, ProvisionError> {
    match std::fs::read(path) {
        Ok(pem) => {
            info!(path = %path.display(), "loaded CA bundle, TLS will be required");
            Ok(Some(pem))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no CA bundle found, connecting without enforced TLS");
            Ok(None)
        }
        Err(err) => Err(ProvisionError::config(format!(
            "failed to read CA bundle at {}: {err}",
            path.display()
        ))),
    }
}

fn connect_options(params: &PoolParams, database: &str) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .username(&params.username)
        .password(&params.password)
        .database(database);
    if let Some(pem) = &params.ca_bundle {
        options = options
            .ssl_mode(PgSslMode::VerifyCa)
            .ssl_root_cert_from_pem(pem.clone());
    }
    options
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(2))
}

/// Connect the admin pool. Eager: a bad host or credential fails here
/// rather than midway through provisioning; there is no retry, re-invoking
/// the run is the recovery path.
async fn build_admin_pool(params: &PoolParams) -> Result<PgPool, ProvisionError> {
    pool_options()
        .min_connections(1)
        .connect_with(connect_options(params, &params.admin_db))
        .await
        .map_err(|source| ProvisionError::db("admin pool connect", source))
}

/// Build the app pool without connecting. The target database may not exist
/// until the create-database step has run over the admin pool, so the first
/// real connection happens on first acquire, after that step. No
/// `min_connections` here: a background fill would race the creation.
fn build_app_pool(params: &PoolParams) -> PgPool {
    pool_options().connect_lazy_with(connect_options(params, &params.app_db))
}

/// Open the admin and app pools for the run.
pub async fn build_pools(params: &PoolParams) -> Result<PoolPair, ProvisionError> {
    let admin = build_admin_pool(params).await?;
    let app = build_app_pool(params);

    info!(
        host = %params.host,
        port = params.port,
        admin_db = %params.admin_db,
        app_db = %params.app_db,
        "connection pools ready"
    );
    Ok(PoolPair { admin, app })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(ca_bundle: Option<Vec<u8>>) -> PoolParams {
        PoolParams {
            host: "db.internal".to_string(),
            port: 5432,
            username: "root".to_string(),
            password: "pw".to_string(),
            admin_db: "postgres".to_string(),
            app_db: "app".to_string(),
            ca_bundle,
        }
    }

    #[test]
    fn connect_options_target_the_requested_database() {
        let params = params(None);
        let admin = connect_options(&params, &params.admin_db);
        let app = connect_options(&params, &params.app_db);
        assert_eq!(admin.get_host(), "db.internal");
        assert_eq!(admin.get_port(), 5432);
        assert_eq!(admin.get_username(), "root");
        assert_eq!(admin.get_database(), Some("postgres"));
        assert_eq!(app.get_database(), Some("app"));
    }

    #[tokio::test]
    async fn app_pool_is_built_without_connecting() {
        // Nothing answers at this host; building the pool must still
        // succeed, with zero connections open until first acquire.
        let pool = build_app_pool(&params(None));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn missing_ca_bundle_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_ca_bundle(&dir.path().join("absent.pem")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn present_ca_bundle_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.pem");
        std::fs::write(&path, b"-----BEGIN CERTIFICATE-----").unwrap();
        let loaded = load_ca_bundle(&path).unwrap();
        assert_eq!(loaded.as_deref(), Some(b"-----BEGIN CERTIFICATE-----".as_ref()));
    }

    #[test]
    fn unreadable_ca_bundle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory can never be read as a file.
        let err = load_ca_bundle(dir.path()).unwrap_err();
        assert!(err.to_string().contains("CA bundle"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let rendered = format!("{:?}", params(Some(b"pem".to_vec())));
        assert!(!rendered.contains("pw"));
        assert!(rendered.contains("<redacted>"));
    }
}
