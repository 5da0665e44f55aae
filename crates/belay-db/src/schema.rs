//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

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

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "linking_code_expiry",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Companies (tenants, global scope)
-- =======================================================================
DEFINE TABLE company SCHEMAFULL;
DEFINE FIELD name ON TABLE company TYPE string;
DEFINE FIELD subscription_tier ON TABLE company TYPE string \
    ASSERT $value IN ['Basic', 'Professional', 'Enterprise'];
DEFINE FIELD seat_count ON TABLE company TYPE int ASSERT $value >= 1;
DEFINE FIELD created_at ON TABLE company TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE company TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Principals (tenant scope; tenant_id is NONE for superusers and
-- unlinked external principals)
-- =======================================================================
DEFINE TABLE principal SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE principal TYPE option<string>;
DEFINE FIELD kind ON TABLE principal TYPE string \
    ASSERT $value IN ['Owner', 'Employee', 'Resident', \
    'BuildingManager', 'Superuser'];
DEFINE FIELD base_role ON TABLE principal TYPE option<string>;
DEFINE FIELD username ON TABLE principal TYPE string;
DEFINE FIELD email ON TABLE principal TYPE string;
DEFINE FIELD password_hash ON TABLE principal TYPE string;
DEFINE FIELD status ON TABLE principal TYPE string \
    ASSERT $value IN ['Active', 'Deactivated'];
DEFINE FIELD building_id ON TABLE principal TYPE option<string>;
DEFINE FIELD unit_id ON TABLE principal TYPE option<string>;
DEFINE FIELD hourly_rate_cents ON TABLE principal TYPE option<int>;
DEFINE FIELD created_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_principal_username ON TABLE principal \
    COLUMNS username UNIQUE;
DEFINE INDEX idx_principal_email ON TABLE principal \
    COLUMNS email UNIQUE;
DEFINE INDEX idx_principal_tenant ON TABLE principal \
    COLUMNS tenant_id;

-- =======================================================================
-- Permission grants (tenant scope, one record per principal+capability)
-- =======================================================================
DEFINE TABLE permission_grant SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE permission_grant TYPE string;
DEFINE FIELD principal_id ON TABLE permission_grant TYPE string;
DEFINE FIELD capability ON TABLE permission_grant TYPE string;
DEFINE FIELD granted ON TABLE permission_grant TYPE bool;
DEFINE FIELD granted_by ON TABLE permission_grant TYPE string;
DEFINE FIELD created_at ON TABLE permission_grant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission_grant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_grant_tenant_principal_capability \
    ON TABLE permission_grant \
    COLUMNS tenant_id, principal_id, capability UNIQUE;

-- =======================================================================
-- Buildings & units (tenant scope)
-- =======================================================================
DEFINE TABLE building SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE building TYPE string;
DEFINE FIELD name ON TABLE building TYPE string;
DEFINE FIELD address ON TABLE building TYPE string;
DEFINE FIELD created_at ON TABLE building TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE building TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_building_tenant ON TABLE building COLUMNS tenant_id;

DEFINE TABLE unit SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE unit TYPE string;
DEFINE FIELD building_id ON TABLE unit TYPE string;
DEFINE FIELD label ON TABLE unit TYPE string;
DEFINE FIELD created_at ON TABLE unit TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_unit_building_label ON TABLE unit \
    COLUMNS tenant_id, building_id, label UNIQUE;

-- =======================================================================
-- Linking codes (tenant scope, looked up globally by code)
-- =======================================================================
DEFINE TABLE linking_code SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE linking_code TYPE string;
DEFINE FIELD code ON TABLE linking_code TYPE string;
DEFINE FIELD kind ON TABLE linking_code TYPE string \
    ASSERT $value IN ['Resident', 'BuildingManager'];
DEFINE FIELD building_id ON TABLE linking_code TYPE string;
DEFINE FIELD unit_id ON TABLE linking_code TYPE option<string>;
DEFINE FIELD status ON TABLE linking_code TYPE string \
    ASSERT $value IN ['Active', 'Revoked'];
DEFINE FIELD bound_principal_id ON TABLE linking_code \
    TYPE option<string>;
DEFINE FIELD created_by ON TABLE linking_code TYPE string;
DEFINE FIELD created_at ON TABLE linking_code TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE linking_code TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_linking_code_code ON TABLE linking_code \
    COLUMNS code UNIQUE;

-- =======================================================================
-- Projects (tenant scope)
-- =======================================================================
DEFINE TABLE project SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE project TYPE string;
DEFINE FIELD name ON TABLE project TYPE string;
DEFINE FIELD building_id ON TABLE project TYPE option<string>;
DEFINE FIELD status ON TABLE project TYPE string \
    ASSERT $value IN ['Planned', 'Active', 'OnHold', 'Completed'];
DEFINE FIELD budget_cents ON TABLE project TYPE option<int>;
DEFINE FIELD labor_cost_cents ON TABLE project TYPE option<int>;
DEFINE FIELD billed_cents ON TABLE project TYPE option<int>;
DEFINE FIELD created_by ON TABLE project TYPE string;
DEFINE FIELD created_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_project_tenant ON TABLE project COLUMNS tenant_id;

-- =======================================================================
-- Sessions (keyed by principal)
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD principal_id ON TABLE session TYPE string;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD ip_address ON TABLE session TYPE option<string>;
DEFINE FIELD user_agent ON TABLE session TYPE option<string>;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_principal ON TABLE session \
    COLUMNS principal_id;

-- =======================================================================
-- Audit Log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD tenant_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD actor_id ON TABLE audit_log TYPE string;
DEFINE FIELD actor_type ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Principal', 'Superuser', 'System'];
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD resource_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD outcome ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_tenant_time ON TABLE audit_log \
    COLUMNS tenant_id, timestamp;
DEFINE INDEX idx_audit_tenant_actor ON TABLE audit_log \
    COLUMNS tenant_id, actor_id;
";

// -----------------------------------------------------------------------
// Schema v2: unclaimed linking codes may lapse
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE FIELD expires_at ON TABLE linking_code TYPE option<datetime>;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
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
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

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

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
