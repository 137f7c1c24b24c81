//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings; the record id of
//! every row is its UUID. Deployment credentials are kept as a flexible
//! object holding the sealed (encrypted) variant.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organisations
-- =======================================================================
DEFINE TABLE organisation SCHEMAFULL;
DEFINE FIELD name ON TABLE organisation TYPE string;
DEFINE FIELD created_at ON TABLE organisation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organisation TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Systems (organisation scope)
-- =======================================================================
DEFINE TABLE system SCHEMAFULL;
DEFINE FIELD organisation_id ON TABLE system TYPE string;
DEFINE FIELD name ON TABLE system TYPE string;
DEFINE FIELD description ON TABLE system TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE system TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE system TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_system_organisation ON TABLE system \
    COLUMNS organisation_id;

-- =======================================================================
-- Deployments (system scope, own the sealed credentials)
-- =======================================================================
DEFINE TABLE deployment SCHEMAFULL;
DEFINE FIELD system_id ON TABLE deployment TYPE string;
DEFINE FIELD name ON TABLE deployment TYPE string;
DEFINE FIELD credentials ON TABLE deployment TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE deployment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE deployment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_deployment_system ON TABLE deployment \
    COLUMNS system_id;

-- =======================================================================
-- Services (global registry, never hard-deleted)
-- =======================================================================
DEFINE TABLE service SCHEMAFULL;
DEFINE FIELD name ON TABLE service TYPE string;
DEFINE FIELD summary ON TABLE service TYPE string;
DEFINE FIELD description ON TABLE service TYPE string;
DEFINE FIELD platform ON TABLE service TYPE string \
    ASSERT $value IN ['AWS', 'Azure', 'GCP', 'Other'];
DEFINE FIELD author_id ON TABLE service TYPE option<string>;
DEFINE FIELD namespace ON TABLE service TYPE string;
DEFINE FIELD service_url ON TABLE service TYPE string;
DEFINE FIELD introspection_url ON TABLE service TYPE string;
DEFINE FIELD documentation_url ON TABLE service TYPE string;
DEFINE FIELD source_code_url ON TABLE service TYPE string;
DEFINE FIELD verified ON TABLE service TYPE bool DEFAULT false;
DEFINE FIELD blocked ON TABLE service TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_blocked ON TABLE service COLUMNS blocked;

-- =======================================================================
-- Resources (deployment scope, reference a service)
-- =======================================================================
DEFINE TABLE resource SCHEMAFULL;
DEFINE FIELD deployment_id ON TABLE resource TYPE string;
DEFINE FIELD service_id ON TABLE resource TYPE string;
DEFINE FIELD name ON TABLE resource TYPE string;
DEFINE FIELD created_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_resource_deployment ON TABLE resource \
    COLUMNS deployment_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates the `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the recorded maximum and records
/// it.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name.to_string()))
            .await?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn schema_v1_defines_every_table() {
        for table in ["organisation", "system", "deployment", "service", "resource"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }
}
