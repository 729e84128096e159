//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings (the record id of an entity table is the
//! entity UUID). Enums are stored as strings with ASSERT constraints
//! for validation.

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
    #[allow(dead_code)]
    name: String,
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
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Offers (a resource's advertised availability window)
-- =======================================================================
DEFINE TABLE offer SCHEMAFULL;
DEFINE FIELD project_id ON TABLE offer TYPE string;
DEFINE FIELD resource_type ON TABLE offer TYPE string;
DEFINE FIELD resource_uuid ON TABLE offer TYPE string;
DEFINE FIELD start_time ON TABLE offer TYPE datetime;
DEFINE FIELD end_time ON TABLE offer TYPE datetime;
DEFINE FIELD status ON TABLE offer TYPE string \
    ASSERT $value IN ['Available', 'Cancelled', 'Expired'];
DEFINE FIELD properties ON TABLE offer TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE offer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE offer TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_offer_resource ON TABLE offer \
    COLUMNS resource_type, resource_uuid;
DEFINE INDEX idx_offer_project ON TABLE offer COLUMNS project_id;

-- =======================================================================
-- Policies (project-scoped allocation rules)
-- =======================================================================
DEFINE TABLE policy SCHEMAFULL;
DEFINE FIELD project_id ON TABLE policy TYPE string;
DEFINE FIELD name ON TABLE policy TYPE string;
DEFINE FIELD properties ON TABLE policy TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE policy TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE policy TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_policy_project_name ON TABLE policy \
    COLUMNS project_id, name UNIQUE;

-- =======================================================================
-- Applied policies (policy applied to a node; composite identity)
-- =======================================================================
DEFINE TABLE applied_policy SCHEMAFULL;
DEFINE FIELD node_uuid ON TABLE applied_policy TYPE string;
DEFINE FIELD policy_id ON TABLE applied_policy TYPE string;
DEFINE FIELD project_id ON TABLE applied_policy TYPE string;
DEFINE FIELD created_at ON TABLE applied_policy TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE applied_policy TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_applied_policy_key ON TABLE applied_policy \
    COLUMNS node_uuid, policy_id UNIQUE;

-- =======================================================================
-- Lease requests
-- =======================================================================
DEFINE TABLE lease_request SCHEMAFULL;
DEFINE FIELD project_id ON TABLE lease_request TYPE string;
DEFINE FIELD start_time ON TABLE lease_request TYPE datetime;
DEFINE FIELD end_time ON TABLE lease_request TYPE datetime;
DEFINE FIELD status ON TABLE lease_request TYPE string \
    ASSERT $value IN ['Requested', 'Granted', 'Rejected', 'Cancelled'];
DEFINE FIELD properties ON TABLE lease_request TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE lease_request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE lease_request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_lease_request_project ON TABLE lease_request \
    COLUMNS project_id;

-- =======================================================================
-- Leased nodes (committed grants; the conflict intervals)
-- =======================================================================
DEFINE TABLE leased_node SCHEMAFULL;
DEFINE FIELD request_id ON TABLE leased_node TYPE option<string>;
DEFINE FIELD project_id ON TABLE leased_node TYPE string;
DEFINE FIELD resource_type ON TABLE leased_node TYPE string;
DEFINE FIELD resource_uuid ON TABLE leased_node TYPE string;
DEFINE FIELD start_time ON TABLE leased_node TYPE datetime;
DEFINE FIELD end_time ON TABLE leased_node TYPE datetime;
DEFINE FIELD created_at ON TABLE leased_node TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE leased_node TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_leased_node_resource_time ON TABLE leased_node \
    COLUMNS resource_type, resource_uuid, start_time;
DEFINE INDEX idx_leased_node_request ON TABLE leased_node \
    COLUMNS request_id;
DEFINE INDEX idx_leased_node_project ON TABLE leased_node \
    COLUMNS project_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn schema_v1_defines_all_leasing_tables() {
        for table in [
            "offer",
            "policy",
            "applied_policy",
            "lease_request",
            "leased_node",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table definition: {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
