//! Run-scoped orchestration.
//!
//! A [`RunContext`] is constructed once per invocation and threaded through
//! every stage. Secrets, master credentials, the CA bundle, and the pools
//! are each resolved at most once within a run and memoized on the context;
//! nothing survives the run. Stages execute in a fixed order and the first
//! failure aborts the rest, with the pools always closed on the way out.

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Settings;
use crate::error::ProvisionError;
use crate::infra::db::{
    build_pools, configure_database, ensure_database, load_ca_bundle, AppAccess, DbConfig,
    PoolPair, PoolParams,
};
use crate::secrets::resolver::{check_consistency, fetch_db_secret, fetch_master_credentials};
use crate::secrets::{Credentials, DbSecretStrict, SecretStore};

/// The migration secret plus the optional app secret, already verified to
/// describe the same database server.
#[derive(Debug)]
pub struct ResolvedSecrets {
    pub migration: DbSecretStrict,
    pub app: Option<DbSecretStrict>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub database: String,
    pub created: bool,
}

/// Per-invocation state. Every field is populated at most once and is
/// immutable for the remainder of the run.
pub struct RunContext<'a> {
    store: &'a dyn SecretStore,
    settings: &'a Settings,
    secrets: OnceCell<ResolvedSecrets>,
    master: OnceCell<Credentials>,
    ca_bundle: OnceCell<Option<Vec<u8>>>,
    pools: OnceCell<PoolPair>,
}

impl<'a> RunContext<'a> {
    pub fn new(store: &'a dyn SecretStore, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            secrets: OnceCell::new(),
            master: OnceCell::new(),
            ca_bundle: OnceCell::new(),
            pools: OnceCell::new(),
        }
    }

    /// Resolve the migration secret and, when configured, the app secret,
    /// then verify they agree on the database server. One secret-store
    /// round-trip per identifier, however often this is called.
    pub async fn secrets(&self) -> Result<&ResolvedSecrets, ProvisionError> {
        self.secrets
            .get_or_try_init(|| async {
                let migration =
                    fetch_db_secret(self.store, &self.settings.migration_secret_id).await?;
                let app = match &self.settings.app_secret_id {
                    Some(id) => Some(fetch_db_secret(self.store, id).await?),
                    None => {
                        info!("no app secret configured, application-role configuration is skipped");
                        None
                    }
                };
                check_consistency(&migration, app.as_ref())?;
                Ok(ResolvedSecrets { migration, app })
            })
            .await
    }

    /// Resolve the master credentials referenced by the migration secret.
    pub async fn master_credentials(&self) -> Result<&Credentials, ProvisionError> {
        let secrets = self.secrets().await?;
        self.master
            .get_or_try_init(|| async {
                fetch_master_credentials(self.store, &secrets.migration.masterarn).await
            })
            .await
    }

    /// Load the CA bundle once; `None` when the operator supplied none.
    pub async fn ca_bundle(&self) -> Result<&Option<Vec<u8>>, ProvisionError> {
        self.ca_bundle
            .get_or_try_init(|| async { load_ca_bundle(&self.settings.ca_bundle_file) })
            .await
    }

    /// Build the admin and app pools, at most once per run: the admin pool
    /// connects here, the app pool on its first use. The host override takes
    /// precedence over the host in the secret; port and credentials always
    /// come from the resolved secrets.
    pub async fn pools(&self) -> Result<&PoolPair, ProvisionError> {
        let secrets = self.secrets().await?;
        let master = self.master_credentials().await?;
        let ca = self.ca_bundle().await?;
        self.pools
            .get_or_try_init(|| async {
                let host = self
                    .settings
                    .host_override
                    .clone()
                    .unwrap_or_else(|| secrets.migration.host.clone());
                let params = PoolParams {
                    host,
                    port: secrets.migration.port,
                    username: master.username.clone(),
                    password: master.password.clone(),
                    admin_db: self.settings.admin_db.clone(),
                    app_db: secrets.migration.dbname.clone(),
                    ca_bundle: ca.clone(),
                };
                build_pools(&params).await
            })
            .await
    }

    /// Close both pools if they were ever built. Safe to call on a context
    /// that never got that far.
    pub async fn close_pools(&self) {
        if let Some(pools) = self.pools.get() {
            pools.close().await;
        }
    }
}

/// Assemble the configuration descriptor for the run. Application access is
/// present exactly when an app secret was resolved.
pub fn build_db_config(settings: &Settings, secrets: &ResolvedSecrets) -> DbConfig {
    let app = secrets.app.as_ref().map(|app_secret| AppAccess {
        role: settings.app_role.clone(),
        user: app_secret.username.clone(),
        password: app_secret.password.clone(),
    });
    DbConfig {
        db_name: secrets.migration.dbname.clone(),
        db_schema: settings.schema.clone(),
        owner_role: settings.owner_role.clone(),
        migration_role: settings.migration_role.clone(),
        migration_user: secrets.migration.username.clone(),
        migration_password: secrets.migration.password.clone(),
        app,
    }
}

fn ensure_active(cancel: &CancellationToken, stage: &'static str) -> Result<(), ProvisionError> {
    if cancel.is_cancelled() {
        info!(stage, "cancellation requested, stopping before stage");
        return Err(ProvisionError::Cancelled { stage });
    }
    Ok(())
}

/// Execute one provisioning run end to end.
///
/// Stage order is fixed: secret resolution, master credential resolution,
/// connection provisioning, database creation, database configuration. The
/// cancellation token is consulted before each stage, and the stages are
/// raced against the token so that a signal arriving mid-stage abandons the
/// in-flight operation instead of waiting it out. However the run ends, any
/// pools that were opened are closed before this returns.
pub async fn run_provision(
    store: &dyn SecretStore,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<RunReport, ProvisionError> {
    let ctx = RunContext::new(store, settings);
    let result = tokio::select! {
        biased;

        result = run_stages(&ctx, cancel) => result,
        () = cancel.cancelled() => {
            info!("cancellation requested, abandoning the in-flight operation");
            Err(ProvisionError::Cancelled { stage: "an in-flight operation" })
        }
    };
    ctx.close_pools().await;
    result
}

async fn run_stages(
    ctx: &RunContext<'_>,
    cancel: &CancellationToken,
) -> Result<RunReport, ProvisionError> {
    ensure_active(cancel, "secret resolution")?;
    let secrets = ctx.secrets().await?;

    ensure_active(cancel, "master credential resolution")?;
    ctx.master_credentials().await?;

    ensure_active(cancel, "connection provisioning")?;
    let pools = ctx.pools().await?;

    let database = secrets.migration.dbname.clone();

    ensure_active(cancel, "database creation")?;
    let created = ensure_database(&pools.admin, &database).await?;

    ensure_active(cancel, "database configuration")?;
    let config = build_db_config(ctx.settings, secrets);
    configure_database(&pools.app, &config).await?;

    info!(database = %database, created, "provisioning run complete");
    Ok(RunReport { database, created })
}
