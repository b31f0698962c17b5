//! SQLite-backed implementation of the GraphStore trait.
//!
//! Durable storage for deployments where the graph must survive process
//! restarts. Uses WAL mode and indexes on owner ids and edge endpoints.

#![cfg(feature = "sqlite")]

use rusqlite::{params, Connection};
use std::path::Path;
use trailgraph_core::error::{GraphError, Result};
use trailgraph_core::store::GraphStore;
use trailgraph_core::types::{GraphEdge, GraphNode, NodeId, NodeKind, RelationshipType};

/// SQLite-backed graph store.
///
/// Supports both in-memory and file-backed databases.
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Create a new in-memory SQLite store.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::init_with_connection(conn)
    }

    /// Create or open a file-backed SQLite store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage)?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(storage)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                kind TEXT NOT NULL,
                grp INTEGER NOT NULL,
                owner_id INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS edges (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                weight REAL NOT NULL,
                relationship TEXT NOT NULL,
                FOREIGN KEY (source) REFERENCES nodes(id),
                FOREIGN KEY (target) REFERENCES nodes(id)
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_owner ON nodes(owner_id);
            CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
            CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
            "#,
        )
        .map_err(storage)?;

        Ok(Self { conn })
    }

    fn insert_node(conn: &Connection, node: &GraphNode) -> Result<()> {
        let result = conn.execute(
            "INSERT INTO nodes (id, label, kind, grp, owner_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                node.id.as_str(),
                node.label,
                node.kind.as_str(),
                node.group,
                node.owner_id
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(GraphError::duplicate_node(&node.id))
            }
            Err(e) => Err(storage(e)),
        }
    }

    fn insert_edge(conn: &Connection, edge: &GraphEdge) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1)",
                    params![endpoint.as_str()],
                    |row| row.get(0),
                )
                .map_err(storage)?;
            if !exists {
                return Err(GraphError::missing_endpoint(endpoint));
            }
        }

        conn.execute(
            "INSERT INTO edges (source, target, weight, relationship) VALUES (?1, ?2, ?3, ?4)",
            params![
                edge.source.as_str(),
                edge.target.as_str(),
                edge.weight,
                edge.relationship.as_str()
            ],
        )
        .map_err(storage)?;
        Ok(())
    }

    fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphNode> {
        let id: String = row.get(0)?;
        let kind: String = row.get(2)?;
        Ok(GraphNode {
            id: NodeId::from(id),
            label: row.get(1)?,
            kind: NodeKind::parse(&kind).unwrap_or(NodeKind::Item),
            group: row.get(3)?,
            owner_id: row.get(4)?,
        })
    }
}

fn storage(e: rusqlite::Error) -> GraphError {
    GraphError::Storage(e.to_string())
}

impl GraphStore for SqliteGraphStore {
    fn add_node(&mut self, node: GraphNode) -> Result<()> {
        Self::insert_node(&self.conn, &node)
    }

    fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
        Self::insert_edge(&self.conn, &edge)
    }

    fn add_batch(&mut self, nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<()> {
        let tx = self.conn.transaction().map_err(storage)?;
        for node in nodes {
            Self::insert_node(&tx, node)?;
        }
        for edge in edges {
            Self::insert_edge(&tx, edge)?;
        }
        tx.commit().map_err(storage)
    }

    fn remove_by_owner(&mut self, owner_id: i64) -> Result<usize> {
        let tx = self.conn.transaction().map_err(storage)?;
        tx.execute(
            "DELETE FROM edges WHERE source IN (SELECT id FROM nodes WHERE owner_id = ?1)
                OR target IN (SELECT id FROM nodes WHERE owner_id = ?1)",
            params![owner_id],
        )
        .map_err(storage)?;
        let removed = tx
            .execute("DELETE FROM nodes WHERE owner_id = ?1", params![owner_id])
            .map_err(storage)?;
        tx.commit().map_err(storage)?;
        Ok(removed)
    }

    fn node(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, label, kind, grp, owner_id FROM nodes WHERE id = ?1")
            .map_err(storage)?;
        let mut rows = stmt
            .query_map(params![id.as_str()], Self::row_to_node)
            .map_err(storage)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(storage)?)),
            None => Ok(None),
        }
    }

    fn nodes(&self) -> Result<Vec<GraphNode>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, label, kind, grp, owner_id FROM nodes")
            .map_err(storage)?;
        let rows = stmt.query_map([], Self::row_to_node).map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }

    fn edges(&self) -> Result<Vec<GraphEdge>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, target, weight, relationship FROM edges")
            .map_err(storage)?;
        let rows = stmt
            .query_map([], |row| {
                let source: String = row.get(0)?;
                let target: String = row.get(1)?;
                let relationship: String = row.get(3)?;
                Ok(GraphEdge {
                    source: NodeId::from(source),
                    target: NodeId::from(target),
                    weight: row.get(2)?,
                    relationship: RelationshipType::parse(&relationship)
                        .unwrap_or(RelationshipType::Conceptual),
                })
            })
            .map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }

    fn node_count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .map_err(storage)
    }

    fn edge_count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .map_err(storage)
    }

    fn max_group(&self) -> Result<Option<u32>> {
        self.conn
            .query_row("SELECT MAX(grp) FROM nodes", [], |row| row.get(0))
            .map_err(storage)
    }

    fn clear(&mut self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM edges; DELETE FROM nodes;")
            .map_err(storage)
    }
}
