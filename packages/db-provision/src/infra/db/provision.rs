//! The two provisioning operations: ensure a database exists, then apply the
//! role/schema configuration script to it.

use sqlx::PgPool;
use tracing::info;

use crate::error::ProvisionError;
use crate::infra::db::script::{quote_ident, render_config_script, DbConfig};

/// Ensure a database named `db_name` exists on the server behind the admin
/// pool, creating it only when absent.
///
/// The catalog lookup is an exact, case-sensitive match. Returns whether a
/// database was created; pre-existence is equally a success. The
/// check-then-create pair is not atomic, so a concurrent creator racing on
/// the same name surfaces as a database error from the create statement.
pub async fn ensure_database(pool: &PgPool, db_name: &str) -> Result<bool, ProvisionError> {
    if db_name.is_empty() {
        return Err(ProvisionError::invalid_input(
            "database name cannot be empty".to_string(),
        ));
    }

    let mut conn = pool
        .acquire()
        .await
        .map_err(|source| ProvisionError::db("database existence check", source))?;

    let existing = sqlx::query("SELECT datname FROM pg_catalog.pg_database WHERE datname = $1")
        .bind(db_name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|source| ProvisionError::db("database existence check", source))?;

    if existing.is_some() {
        info!(db_name, "database already exists");
        return Ok(false);
    }

    info!(db_name, "database does not exist");
    // CREATE DATABASE cannot be parameterized, and must not run inside a
    // transaction block.
    let create = format!("CREATE DATABASE {};", quote_ident(db_name));
    sqlx::raw_sql(&create)
        .execute(&mut *conn)
        .await
        .map_err(|source| ProvisionError::db("database creation", source))?;
    info!(db_name, "created database");
    Ok(true)
}

/// Apply the configuration script for `config` over the app pool.
///
/// The rendered script is executed as one multi-statement batch with
/// statement-level atomicity only; a midway failure leaves the database
/// partially configured, and the idempotent script makes a re-run the
/// recovery path.
pub async fn configure_database(pool: &PgPool, config: &DbConfig) -> Result<(), ProvisionError> {
    if config.db_name.is_empty() {
        return Err(ProvisionError::invalid_input(
            "database name cannot be empty".to_string(),
        ));
    }
    if config.db_schema.is_empty() {
        return Err(ProvisionError::invalid_input(
            "schema name cannot be empty".to_string(),
        ));
    }

    let script = render_config_script(config);

    let mut conn = pool
        .acquire()
        .await
        .map_err(|source| ProvisionError::db("database configuration", source))?;
    sqlx::raw_sql(&script)
        .execute(&mut *conn)
        .await
        .map_err(|source| ProvisionError::db("database configuration", source))?;

    info!(db_name = %config.db_name, schema = %config.db_schema, "configured database");
    Ok(())
}
