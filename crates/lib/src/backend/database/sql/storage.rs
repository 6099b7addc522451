//! Row storage operations for SQL backends.
//!
//! This module implements the Node Store reads and the atomic batch write
//! using sqlx. Every batch runs inside one SQL transaction.

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::{BackendError, WriteBatch};
use crate::node::{NodeId, TreeNode};
use crate::scope::ScopeId;

/// Column list shared by every row read.
const NODE_COLUMNS: &str = "id, parent_id, is_group, lft, rgt, old_parent, order_key, payload";

type NodeRow = (
    String,
    Option<String>,
    i64,
    i64,
    i64,
    Option<String>,
    Option<String>,
    String,
);

fn decode_row(row: NodeRow) -> Result<TreeNode> {
    let (id, parent_id, is_group, lft, rgt, old_parent, order_key, payload) = row;
    let payload = serde_json::from_str(&payload)
        .map_err(|e| BackendError::DeserializationFailed { source: e })?;
    Ok(TreeNode {
        id: NodeId::from(id),
        parent_id: parent_id.map(NodeId::from),
        is_group: is_group != 0,
        lft,
        rgt,
        old_parent: old_parent.map(NodeId::from),
        order_key,
        payload,
    })
}

/// Read a single row.
pub async fn read_node(backend: &SqlxBackend, scope: &ScopeId, id: &NodeId) -> Result<TreeNode> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM tree_nodes WHERE entity_type = $1 AND context = $2 AND id = $3"
    );
    let row: Option<NodeRow> = sqlx::query_as(&sql)
        .bind(scope.entity_type())
        .bind(scope.context())
        .bind(id.as_str())
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to read node")?;

    match row {
        Some(row) => decode_row(row),
        None => Err(BackendError::NodeNotFound {
            scope: scope.clone(),
            id: id.clone(),
        }
        .into()),
    }
}

/// Range scan over numbered rows, ordered by `lft`.
pub async fn read_range(
    backend: &SqlxBackend,
    scope: &ScopeId,
    lft_min: i64,
    rgt_max: i64,
) -> Result<Vec<TreeNode>> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM tree_nodes
         WHERE entity_type = $1 AND context = $2
           AND lft > 0 AND rgt > 0 AND lft >= $3 AND rgt <= $4
         ORDER BY lft"
    );
    let rows: Vec<NodeRow> = sqlx::query_as(&sql)
        .bind(scope.entity_type())
        .bind(scope.context())
        .bind(lft_min)
        .bind(rgt_max)
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to scan node range")?;

    rows.into_iter().map(decode_row).collect()
}

/// Rows whose range strictly encloses `(inner_lft, inner_rgt)`, ordered by `lft`.
pub async fn read_enclosing(
    backend: &SqlxBackend,
    scope: &ScopeId,
    inner_lft: i64,
    inner_rgt: i64,
) -> Result<Vec<TreeNode>> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM tree_nodes
         WHERE entity_type = $1 AND context = $2
           AND lft > 0 AND lft < $3 AND rgt > $4
         ORDER BY lft"
    );
    let rows: Vec<NodeRow> = sqlx::query_as(&sql)
        .bind(scope.entity_type())
        .bind(scope.context())
        .bind(inner_lft)
        .bind(inner_rgt)
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to scan enclosing ranges")?;

    rows.into_iter().map(decode_row).collect()
}

/// Numbered roots of a scope, ordered by `lft`.
pub async fn read_roots(backend: &SqlxBackend, scope: &ScopeId) -> Result<Vec<TreeNode>> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM tree_nodes
         WHERE entity_type = $1 AND context = $2
           AND parent_id IS NULL AND lft > 0 AND rgt > 0
         ORDER BY lft"
    );
    let rows: Vec<NodeRow> = sqlx::query_as(&sql)
        .bind(scope.entity_type())
        .bind(scope.context())
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to read roots")?;

    rows.into_iter().map(decode_row).collect()
}

/// Every row of a scope; numbered rows first by `lft`, then unnumbered by id.
pub async fn scan_scope(backend: &SqlxBackend, scope: &ScopeId) -> Result<Vec<TreeNode>> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM tree_nodes
         WHERE entity_type = $1 AND context = $2
         ORDER BY CASE WHEN lft > 0 AND rgt > 0 THEN 0 ELSE 1 END, lft, id"
    );
    let rows: Vec<NodeRow> = sqlx::query_as(&sql)
        .bind(scope.entity_type())
        .bind(scope.context())
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to scan scope")?;

    rows.into_iter().map(decode_row).collect()
}

/// Apply a batch inside one transaction.
pub async fn write_batch(backend: &SqlxBackend, scope: &ScopeId, batch: WriteBatch) -> Result<()> {
    batch.validate(scope)?;
    if batch.is_empty() {
        return Ok(());
    }

    let (upserts, removals) = batch.into_parts();
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    for id in &removals {
        sqlx::query("DELETE FROM tree_nodes WHERE entity_type = $1 AND context = $2 AND id = $3")
            .bind(scope.entity_type())
            .bind(scope.context())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .sql_context("Failed to remove node")?;
    }

    for node in &upserts {
        let payload = serde_json::to_string(&node.payload)
            .map_err(|e| BackendError::SerializationFailed { source: e })?;
        // ON CONFLICT upserts are understood by both SQLite (3.24+) and PostgreSQL
        sqlx::query(
            "INSERT INTO tree_nodes
                (entity_type, context, id, parent_id, is_group, lft, rgt, old_parent, order_key, payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (entity_type, context, id) DO UPDATE SET
                parent_id = EXCLUDED.parent_id,
                is_group = EXCLUDED.is_group,
                lft = EXCLUDED.lft,
                rgt = EXCLUDED.rgt,
                old_parent = EXCLUDED.old_parent,
                order_key = EXCLUDED.order_key,
                payload = EXCLUDED.payload",
        )
        .bind(scope.entity_type())
        .bind(scope.context())
        .bind(node.id.as_str())
        .bind(node.parent_id.as_ref().map(|id| id.to_string()))
        .bind(i64::from(node.is_group))
        .bind(node.lft)
        .bind(node.rgt)
        .bind(node.old_parent.as_ref().map(|id| id.to_string()))
        .bind(node.order_key.clone())
        .bind(payload)
        .execute(&mut *tx)
        .await
        .sql_context("Failed to upsert node")?;
    }

    tx.commit().await.sql_context("Failed to commit transaction")?;
    Ok(())
}

/// Scopes holding at least one row.
pub async fn scopes(backend: &SqlxBackend) -> Result<Vec<ScopeId>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT entity_type, context FROM tree_nodes ORDER BY entity_type, context",
    )
    .fetch_all(backend.pool())
    .await
    .sql_context("Failed to list scopes")?;

    Ok(rows
        .into_iter()
        .map(|(entity_type, context)| ScopeId::new(entity_type, context))
        .collect())
}
