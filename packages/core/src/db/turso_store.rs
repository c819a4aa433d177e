//! TursoStore - TreeStore Implementation for the libsql Backend
//!
//! This module implements the `TreeStore` trait for libsql, rendering each
//! [`Statement`] of a mutation script to one fixed SQL template and applying
//! the whole script inside a single transaction.
//!
//! # Design Principles
//!
//! 1. **One template per statement**: every statement variant maps to one
//!    parameterized UPDATE/INSERT/DELETE; no SQL is assembled dynamically
//! 2. **Pre-image arithmetic**: all CASE expressions in a statement read
//!    pre-update row state. Column order is still fixed so that `level` and
//!    `tree_id`, whose CASEs are keyed on the pre-move `lft`, are assigned
//!    before `lft` itself; some SQL engines let later SET clauses observe
//!    earlier writes within one UPDATE
//! 3. **Row Conversion**: handles libsql::Row -> Node model conversion
//!
//! # Transaction discipline
//!
//! `apply` wraps the script in `BEGIN IMMEDIATE` so the write lock is taken
//! up front; two movers that both started with a read and tried to upgrade
//! would otherwise deadlock. Any statement failure rolls the transaction
//! back, leaving the forest exactly as it was.

use crate::db::script::{MutationScript, ScriptOutcome, Statement, TreeId};
use crate::db::tree_store::TreeStore;
use crate::db::{DatabaseError, DatabaseService};
use crate::models::Node;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{params, Row};
use std::sync::Arc;

/// Column list shared by every node SELECT.
const NODE_COLUMNS: &str =
    "id, node_type, content, parent_id, tree_id, lft, rgt, level, created_at, modified_at, properties";

/// TreeStore implementation backed by libsql.
pub struct TursoStore {
    /// Underlying database service (connection and schema management)
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore over an initialized database
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
    /// Rows inserted by the engine use RFC3339: "YYYY-MM-DDTHH:MM:SS.fZ"
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        ))
    }

    /// Convert libsql::Row to Node model
    ///
    /// Expected columns, in order: id, node_type, content, parent_id,
    /// tree_id, lft, rgt, level, created_at, modified_at, properties.
    fn row_to_node(row: &Row) -> Result<Node> {
        let id: String = row.get(0).context("Failed to get id")?;
        let node_type: String = row.get(1).context("Failed to get node_type")?;
        let content: String = row.get(2).context("Failed to get content")?;
        let parent_id: Option<String> = row.get(3).context("Failed to get parent_id")?;
        let tree_id: i64 = row.get(4).context("Failed to get tree_id")?;
        let lft: i64 = row.get(5).context("Failed to get lft")?;
        let rgt: i64 = row.get(6).context("Failed to get rgt")?;
        let level: i64 = row.get(7).context("Failed to get level")?;
        let created_at_str: String = row.get(8).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(9).context("Failed to get modified_at")?;
        let properties_json: String = row.get(10).context("Failed to get properties")?;

        let created_at =
            Self::parse_timestamp(&created_at_str).context("Failed to parse created_at")?;
        let modified_at =
            Self::parse_timestamp(&modified_at_str).context("Failed to parse modified_at")?;

        let properties: serde_json::Value =
            serde_json::from_str(&properties_json).context("Failed to parse properties JSON")?;

        Ok(Node {
            id,
            node_type,
            content,
            parent_id,
            tree_id,
            lft,
            rgt,
            level,
            created_at,
            modified_at,
            properties,
        })
    }

    /// Run a node SELECT and collect the rows.
    async fn query_nodes(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Node>> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(sql)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to prepare query: {}", e)))?;

        let mut rows = stmt
            .query(params)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to execute query: {}", e)))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    /// Determine the next available tree id: max + 1, or 1 for an empty
    /// forest. Must run inside the transaction of its consumer so concurrent
    /// promotions cannot claim the same id.
    async fn next_tree_id(conn: &libsql::Connection) -> Result<i64, DatabaseError> {
        let mut stmt = conn
            .prepare("SELECT MAX(tree_id) FROM nodes")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare next_tree_id query: {}", e))
            })?;

        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute next_tree_id query: {}", e))
        })?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;

        match row {
            Some(row) => {
                let max: Option<i64> = row.get(0).map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to read max tree id: {}", e))
                })?;
                Ok(max.unwrap_or(0) + 1)
            }
            None => Ok(1),
        }
    }

    /// Resolve a statement's tree id against the script's allocation.
    fn resolve_tree_id(tree_id: TreeId, allocated: Option<i64>) -> Result<i64, DatabaseError> {
        match tree_id {
            TreeId::Existing(id) => Ok(id),
            TreeId::Allocated => allocated.ok_or_else(|| {
                DatabaseError::sql_execution("statement references an unallocated tree id")
            }),
        }
    }

    /// Execute one statement of a script on the open transaction.
    async fn execute_statement(
        conn: &libsql::Connection,
        statement: &Statement,
        allocated: Option<i64>,
    ) -> Result<(), DatabaseError> {
        match statement {
            Statement::ShiftInterval {
                tree_id,
                after,
                delta,
            } => {
                conn.execute(
                    "UPDATE nodes
                     SET lft = CASE WHEN lft > ? THEN lft + ? ELSE lft END,
                         rgt = CASE WHEN rgt > ? THEN rgt + ? ELSE rgt END
                     WHERE tree_id = ? AND (lft > ? OR rgt > ?)",
                    params![*after, *delta, *after, *delta, *tree_id, *after, *after],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to shift interval: {}", e))
                })?;
            }

            Statement::TransplantSubtree {
                tree_id,
                lft,
                rgt,
                level_change,
                left_right_change,
                new_tree_id,
                node_id,
                new_parent_id,
            } => {
                let new_tree_id = Self::resolve_tree_id(*new_tree_id, allocated)?;
                let gap_size = rgt - lft + 1;
                let gap_target_left = lft - 1;
                // level and tree_id first: their CASEs are keyed on the
                // pre-move lft.
                conn.execute(
                    "UPDATE nodes
                     SET level = CASE WHEN lft >= ? AND lft <= ? THEN level - ? ELSE level END,
                         tree_id = CASE WHEN lft >= ? AND lft <= ? THEN ? ELSE tree_id END,
                         lft = CASE WHEN lft >= ? AND lft <= ? THEN lft - ?
                                    WHEN lft > ? THEN lft - ?
                                    ELSE lft END,
                         rgt = CASE WHEN rgt >= ? AND rgt <= ? THEN rgt - ?
                                    WHEN rgt > ? THEN rgt - ?
                                    ELSE rgt END,
                         parent_id = CASE WHEN id = ? THEN ? ELSE parent_id END
                     WHERE tree_id = ?",
                    params![
                        *lft,
                        *rgt,
                        *level_change,
                        *lft,
                        *rgt,
                        new_tree_id,
                        *lft,
                        *rgt,
                        *left_right_change,
                        gap_target_left,
                        gap_size,
                        *lft,
                        *rgt,
                        *left_right_change,
                        gap_target_left,
                        gap_size,
                        node_id.as_str(),
                        new_parent_id.as_deref(),
                        *tree_id
                    ],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to transplant subtree: {}", e))
                })?;
            }

            Statement::GraftRootTree {
                tree_id,
                lft,
                rgt,
                level_change,
                left_right_change,
                new_tree_id,
                node_id,
                new_parent_id,
            } => {
                conn.execute(
                    "UPDATE nodes
                     SET level = level - ?,
                         lft = lft - ?,
                         rgt = rgt - ?,
                         tree_id = ?,
                         parent_id = CASE WHEN id = ? THEN ? ELSE parent_id END
                     WHERE lft >= ? AND lft <= ? AND tree_id = ?",
                    params![
                        *level_change,
                        *left_right_change,
                        *left_right_change,
                        *new_tree_id,
                        node_id.as_str(),
                        new_parent_id.as_str(),
                        *lft,
                        *rgt,
                        *tree_id
                    ],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to graft root tree: {}", e))
                })?;
            }

            Statement::MoveWithinTree {
                tree_id,
                lft,
                rgt,
                level_change,
                left_right_change,
                band_lower,
                band_upper,
                gap,
                node_id,
                new_parent_id,
            } => {
                // The first WHEN of each interval CASE captures the moved
                // subtree; the second captures the rest of the band. level
                // first, for the same pre-move-lft reason as the transplant.
                conn.execute(
                    "UPDATE nodes
                     SET level = CASE WHEN lft >= ? AND lft <= ? THEN level - ? ELSE level END,
                         lft = CASE WHEN lft >= ? AND lft <= ? THEN lft + ?
                                    WHEN lft >= ? AND lft <= ? THEN lft + ?
                                    ELSE lft END,
                         rgt = CASE WHEN rgt >= ? AND rgt <= ? THEN rgt + ?
                                    WHEN rgt >= ? AND rgt <= ? THEN rgt + ?
                                    ELSE rgt END,
                         parent_id = CASE WHEN id = ? THEN ? ELSE parent_id END
                     WHERE tree_id = ?",
                    params![
                        *lft,
                        *rgt,
                        *level_change,
                        *lft,
                        *rgt,
                        *left_right_change,
                        *band_lower,
                        *band_upper,
                        *gap,
                        *lft,
                        *rgt,
                        *left_right_change,
                        *band_lower,
                        *band_upper,
                        *gap,
                        node_id.as_str(),
                        new_parent_id.as_str(),
                        *tree_id
                    ],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to move within tree: {}", e))
                })?;
            }

            Statement::ShiftTreeIds { above } => {
                conn.execute(
                    "UPDATE nodes SET tree_id = tree_id + 1 WHERE tree_id > ?",
                    params![*above],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to shift tree ids: {}", e))
                })?;
            }

            Statement::RelabelTree {
                tree_id,
                new_tree_id,
            } => {
                let new_tree_id = Self::resolve_tree_id(*new_tree_id, allocated)?;
                conn.execute(
                    "UPDATE nodes SET tree_id = ? WHERE tree_id = ?",
                    params![new_tree_id, *tree_id],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to relabel tree: {}", e))
                })?;
            }

            Statement::InsertLeaf { node, tree_id } => {
                let tree_id = Self::resolve_tree_id(*tree_id, allocated)?;
                let properties = serde_json::to_string(&node.properties).map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to serialize properties: {}", e))
                })?;
                conn.execute(
                    "INSERT INTO nodes (id, node_type, content, parent_id, tree_id, lft, rgt, level, created_at, modified_at, properties)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        node.id.as_str(),
                        node.node_type.as_str(),
                        node.content.as_str(),
                        node.parent_id.as_deref(),
                        tree_id,
                        node.lft,
                        node.rgt,
                        node.level,
                        node.created_at.to_rfc3339(),
                        node.modified_at.to_rfc3339(),
                        properties
                    ],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to insert node {}: {}",
                        node.id, e
                    ))
                })?;
            }

            Statement::DeleteInterval { tree_id, lft, rgt } => {
                conn.execute(
                    "DELETE FROM nodes WHERE tree_id = ? AND lft >= ? AND lft <= ?",
                    params![*tree_id, *lft, *rgt],
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to delete interval: {}", e))
                })?;
            }
        }

        Ok(())
    }

    /// Run a whole script on an open transaction.
    async fn run_script(
        conn: &libsql::Connection,
        script: &MutationScript,
    ) -> Result<ScriptOutcome, DatabaseError> {
        let allocated = if script.allocates_tree_id() {
            Some(Self::next_tree_id(conn).await?)
        } else {
            None
        };

        for statement in &script.statements {
            Self::execute_statement(conn, statement, allocated).await?;
        }

        Ok(ScriptOutcome {
            allocated_tree_id: allocated,
        })
    }
}

#[async_trait]
impl TreeStore for TursoStore {
    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM nodes WHERE id = ?",
                NODE_COLUMNS
            ))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_node query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_node query: {}", e))
        })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_tree(&self, tree_id: i64) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!(
                "SELECT {} FROM nodes WHERE tree_id = ? ORDER BY lft",
                NODE_COLUMNS
            ),
            params![tree_id],
        )
        .await
    }

    async fn fetch_forest(&self) -> Result<Vec<Node>> {
        self.query_nodes(
            &format!("SELECT {} FROM nodes ORDER BY tree_id, lft", NODE_COLUMNS),
            (),
        )
        .await
    }

    async fn fetch_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>> {
        match parent_id {
            Some(parent_id) => {
                self.query_nodes(
                    &format!(
                        "SELECT {} FROM nodes WHERE parent_id = ? ORDER BY lft",
                        NODE_COLUMNS
                    ),
                    params![parent_id],
                )
                .await
            }
            None => {
                self.query_nodes(
                    &format!(
                        "SELECT {} FROM nodes WHERE parent_id IS NULL ORDER BY tree_id",
                        NODE_COLUMNS
                    ),
                    (),
                )
                .await
            }
        }
    }

    async fn fetch_descendants(&self, node: &Node, include_self: bool) -> Result<Vec<Node>> {
        let lower = if include_self { node.lft } else { node.lft + 1 };
        self.query_nodes(
            &format!(
                "SELECT {} FROM nodes WHERE tree_id = ? AND lft >= ? AND lft <= ? ORDER BY lft",
                NODE_COLUMNS
            ),
            params![node.tree_id, lower, node.rgt],
        )
        .await
    }

    async fn apply(&self, script: MutationScript) -> Result<ScriptOutcome> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        match Self::run_script(&conn, &script).await {
            Ok(outcome) => {
                conn.execute("COMMIT", ()).await.map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e))
                })?;
                Ok(outcome)
            }
            Err(e) => {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                Err(e.into())
            }
        }
    }
}
