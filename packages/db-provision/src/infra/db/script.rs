//! Rendering of the role/schema configuration script.
//!
//! The script is plain SQL assembled from a [`DbConfig`] and must be
//! idempotent: running it twice against the same database leaves identical
//! role and grant state. Postgres has no `CREATE ROLE IF NOT EXISTS`, so
//! role creation goes through guarded `DO` blocks; passwords are set by
//! separate top-level `ALTER ROLE` statements so they never sit inside a
//! dollar-quoted body.

use std::fmt;

/// Desired end state of roles and grants for one database.
#[derive(Clone)]
pub struct DbConfig {
    pub db_name: String,
    pub db_schema: String,
    pub owner_role: String,
    pub migration_role: String,
    pub migration_user: String,
    pub migration_password: String,
    /// Application access is configured as a whole or not at all.
    pub app: Option<AppAccess>,
}

/// The restricted runtime identity: group role, login user, password.
#[derive(Clone)]
pub struct AppAccess {
    pub role: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("db_name", &self.db_name)
            .field("db_schema", &self.db_schema)
            .field("owner_role", &self.owner_role)
            .field("migration_role", &self.migration_role)
            .field("migration_user", &self.migration_user)
            .field("migration_password", &"<redacted>")
            .field("app", &self.app)
            .finish()
    }
}

impl fmt::Debug for AppAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppAccess")
            .field("role", &self.role)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Quote an SQL identifier, preserving case and special characters.
pub fn quote_ident(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// Quote an SQL string literal.
pub fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

enum RoleKind {
    Group,
    Login,
}

fn push_ensure_role(script: &mut String, name: &str, kind: RoleKind) {
    let attribute = match kind {
        RoleKind::Group => "NOLOGIN",
        RoleKind::Login => "LOGIN",
    };
    script.push_str(&format!(
        "DO $provision$\n\
         BEGIN\n\
         \x20   IF NOT EXISTS (SELECT FROM pg_catalog.pg_roles WHERE rolname = {literal}) THEN\n\
         \x20       CREATE ROLE {ident} {attribute};\n\
         \x20   END IF;\n\
         END\n\
         $provision$;\n",
        literal = quote_literal(name),
        ident = quote_ident(name),
    ));
}

/// Render the configuration script for `config`.
///
/// The script ensures the owning role and hands it the database, ensures the
/// migration role and user and makes the migration role own the schema, and,
/// when application access is configured, ensures the restricted application
/// role with read/write (never DDL) reach into the schema.
pub fn render_config_script(config: &DbConfig) -> String {
    let db = quote_ident(&config.db_name);
    let schema = quote_ident(&config.db_schema);
    let owner = quote_ident(&config.owner_role);
    let migration = quote_ident(&config.migration_role);
    let migration_user = quote_ident(&config.migration_user);

    let mut script = String::new();

    push_ensure_role(&mut script, &config.owner_role, RoleKind::Group);
    script.push_str(&format!("ALTER DATABASE {db} OWNER TO {owner};\n\n"));

    push_ensure_role(&mut script, &config.migration_role, RoleKind::Group);
    push_ensure_role(&mut script, &config.migration_user, RoleKind::Login);
    script.push_str(&format!(
        "ALTER ROLE {migration_user} WITH LOGIN PASSWORD {};\n",
        quote_literal(&config.migration_password)
    ));
    script.push_str(&format!("GRANT {migration} TO {migration_user};\n\n"));

    script.push_str(&format!(
        "CREATE SCHEMA IF NOT EXISTS {schema} AUTHORIZATION {migration};\n"
    ));
    script.push_str(&format!("ALTER SCHEMA {schema} OWNER TO {migration};\n"));
    script.push_str(&format!(
        "GRANT USAGE, CREATE ON SCHEMA {schema} TO {migration};\n"
    ));

    if let Some(app) = &config.app {
        let app_role = quote_ident(&app.role);
        let app_user = quote_ident(&app.user);

        script.push('\n');
        push_ensure_role(&mut script, &app.role, RoleKind::Group);
        push_ensure_role(&mut script, &app.user, RoleKind::Login);
        script.push_str(&format!(
            "ALTER ROLE {app_user} WITH LOGIN PASSWORD {};\n",
            quote_literal(&app.password)
        ));
        script.push_str(&format!("GRANT {app_role} TO {app_user};\n"));
        script.push_str(&format!("GRANT USAGE ON SCHEMA {schema} TO {app_role};\n"));
        script.push_str(&format!(
            "ALTER DEFAULT PRIVILEGES FOR ROLE {migration} IN SCHEMA {schema} \
             GRANT SELECT, INSERT, UPDATE, DELETE ON TABLES TO {app_role};\n"
        ));
    }

    script
}
