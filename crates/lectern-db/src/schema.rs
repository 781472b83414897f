//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. The UNIQUE composite indexes on
//! the membership and access_grant junction tables carry the
//! at-most-one-row-per-pair invariant.

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
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD full_name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD user_type ON TABLE user TYPE string \
    ASSERT $value IN ['Admin', 'Regular'];
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Groups
-- =======================================================================
DEFINE TABLE group SCHEMAFULL;
DEFINE FIELD code ON TABLE group TYPE int;
DEFINE FIELD name ON TABLE group TYPE string;
DEFINE FIELD status ON TABLE group TYPE string \
    DEFAULT 'Active' ASSERT $value IN ['Active', 'Deleted'];
DEFINE FIELD created_by ON TABLE group TYPE string;
DEFINE FIELD updated_by ON TABLE group TYPE option<string>;
DEFINE FIELD created_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_code ON TABLE group COLUMNS code UNIQUE;

-- =======================================================================
-- Memberships (Group x User junction)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD group_id ON TABLE membership TYPE string;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['Member', 'Leader'];
DEFINE FIELD created_by ON TABLE membership TYPE option<string>;
DEFINE FIELD updated_by ON TABLE membership TYPE option<string>;
DEFINE FIELD created_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_pair ON TABLE membership \
    COLUMNS group_id, user_id UNIQUE;

-- =======================================================================
-- Lectures
-- =======================================================================
DEFINE TABLE lecture SCHEMAFULL;
DEFINE FIELD name ON TABLE lecture TYPE string;
DEFINE FIELD description ON TABLE lecture TYPE string;
DEFINE FIELD status ON TABLE lecture TYPE string \
    DEFAULT 'Active' ASSERT $value IN ['Active', 'Deleted'];
DEFINE FIELD created_by ON TABLE lecture TYPE string;
DEFINE FIELD updated_by ON TABLE lecture TYPE option<string>;
DEFINE FIELD created_at ON TABLE lecture TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE lecture TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Files (metadata only; bytes live outside the database)
-- =======================================================================
DEFINE TABLE file SCHEMAFULL;
DEFINE FIELD original_name ON TABLE file TYPE string;
DEFINE FIELD filename ON TABLE file TYPE string;
DEFINE FIELD path ON TABLE file TYPE string;
DEFINE FIELD mimetype ON TABLE file TYPE string;
DEFINE FIELD size ON TABLE file TYPE int;
DEFINE FIELD kind ON TABLE file TYPE string \
    ASSERT $value IN ['Normal', 'Config'];
DEFINE FIELD visibility ON TABLE file TYPE string \
    DEFAULT 'Private' \
    ASSERT $value IN ['Public', 'Private', 'Restricted'];
DEFINE FIELD uploaded_by ON TABLE file TYPE string;
DEFINE FIELD description ON TABLE file TYPE option<string>;
DEFINE FIELD updated_by ON TABLE file TYPE option<string>;
DEFINE FIELD created_at ON TABLE file TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE file TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_file_filename ON TABLE file COLUMNS filename UNIQUE;

-- =======================================================================
-- Access grants (Resource x Subject junction)
-- =======================================================================
DEFINE TABLE access_grant SCHEMAFULL;
DEFINE FIELD resource_kind ON TABLE access_grant TYPE string \
    ASSERT $value IN ['Lecture', 'File'];
DEFINE FIELD resource_id ON TABLE access_grant TYPE string;
DEFINE FIELD subject_id ON TABLE access_grant TYPE string;
DEFINE FIELD capability ON TABLE access_grant TYPE string \
    ASSERT $value IN ['View', 'Download', 'Full'];
DEFINE FIELD granted_by ON TABLE access_grant TYPE string;
DEFINE FIELD expires_at ON TABLE access_grant TYPE option<datetime>;
DEFINE FIELD updated_by ON TABLE access_grant TYPE option<string>;
DEFINE FIELD created_at ON TABLE access_grant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE access_grant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_grant_resource_subject ON TABLE access_grant \
    COLUMNS resource_kind, resource_id, subject_id UNIQUE;
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
