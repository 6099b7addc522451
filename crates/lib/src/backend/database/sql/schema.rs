//! SQL schema definitions and migrations.
//!
//! The schema is designed to be portable between SQLite and Postgres. All
//! rows of every scope live in one `tree_nodes` table keyed by
//! `(entity_type, context, id)`.
//!
//! # Migration System
//!
//! Migrations are code-based rather than SQL files so that dialect
//! differences between SQLite and PostgreSQL can be handled per step.
//!
//! ## Adding a New Migration
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a new `migrate_vN_to_vM` async function
//! 3. Add the migration to the match statement in `run_migration`

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::BackendError;

/// Current schema version.
///
/// Increment this when making schema changes that require migration.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
pub const CREATE_TABLES: &[&str] = &[
    // BIGINT (64-bit) used for portability between SQLite and PostgreSQL
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    // context is '' for global hierarchies (PostgreSQL disallows NULL in PK)
    // lft = rgt = 0 marks a row that has not been numbered yet
    "CREATE TABLE IF NOT EXISTS tree_nodes (
        entity_type TEXT NOT NULL,
        context TEXT NOT NULL DEFAULT '',
        id TEXT NOT NULL,
        parent_id TEXT,
        is_group BIGINT NOT NULL DEFAULT 0,
        lft BIGINT NOT NULL DEFAULT 0,
        rgt BIGINT NOT NULL DEFAULT 0,
        old_parent TEXT,
        order_key TEXT,
        payload TEXT NOT NULL DEFAULT 'null',
        PRIMARY KEY (entity_type, context, id)
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    // Range scans for both the allocator and the query engine
    "CREATE INDEX IF NOT EXISTS idx_tree_nodes_lft ON tree_nodes(entity_type, context, lft)",
    "CREATE INDEX IF NOT EXISTS idx_tree_nodes_parent ON tree_nodes(entity_type, context, parent_id)",
];

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, and handles migrations
/// if the schema version has changed.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Schema creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
        }
        Some((current,)) if current < SCHEMA_VERSION => {
            migrate(backend, current, SCHEMA_VERSION).await?;
        }
        Some((current,)) if current > SCHEMA_VERSION => {
            return Err(BackendError::SqlxError {
                reason: format!(
                    "Database schema v{current} is newer than supported v{SCHEMA_VERSION}"
                ),
                source: None,
            }
            .into());
        }
        Some(_) => {}
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Index creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    Ok(())
}

/// Run migrations sequentially from one schema version to another.
async fn migrate(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    tracing::info!(from, to, "Starting SQL schema migration");

    let mut current = from;
    while current < to {
        let next = current + 1;
        tracing::info!(from = current, to = next, "Running migration");

        run_migration(current, next)?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(backend.pool())
            .await
            .sql_context(&format!("Failed to update schema version to {next}"))?;

        current = next;
    }

    tracing::info!(from, to, "All migrations completed successfully");
    Ok(())
}

/// Execute a single migration step.
///
/// Version 1 is the first schema, so there are no steps yet.
fn run_migration(from: i64, to: i64) -> Result<()> {
    Err(BackendError::SqlxError {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             This likely means SCHEMA_VERSION was incremented without adding a migration."
        ),
        source: None,
    }
    .into())
}
