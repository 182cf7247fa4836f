/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::store::{merge_node, GraphStore, Node, NodeChange, NodeWrite, Subscription, SubscriptionTracker};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::sync::broadcast;
use tracing::info;

const CHANGE_BUFFER: usize = 1024;

/// Single-replica graph store on SQLite.
#[derive(Clone)]
pub struct SqliteGraphStore {
    db_path: PathBuf,
    changes: broadcast::Sender<NodeChange>,
    subscriptions: SubscriptionTracker,
}

impl SqliteGraphStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        init_db(&db_path)?;
        info!("graph store db: {}", db_path.display());
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Ok(Self {
            db_path,
            changes,
            subscriptions: SubscriptionTracker::default(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn publish(&self, changes: Vec<NodeChange>) {
        for change in changes {
            // No receivers is fine: nobody is listening.
            let _ = self.changes.send(change);
        }
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn put_entry(&self, collection: &str, key: &str, value: Node) -> Result<()> {
        self.put_batch(vec![NodeWrite::new(collection, key, value)])
            .await
    }

    async fn put_batch(&self, writes: Vec<NodeWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let db_path = self.db_path.clone();
        let changes = tokio::task::spawn_blocking(move || -> Result<Vec<NodeChange>> {
            let mut conn = open_conn(&db_path)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = now_ms();
            let mut changes = Vec::with_capacity(writes.len());
            for w in writes {
                let existing = load_node(&tx, &w.collection, &w.key)?;
                let merged = merge_node(existing, &w.value, &w.collection, &w.key, now);
                let json = serde_json::to_vec(&merged).context("serialize node")?;
                tx.execute(
                    r#"
                    INSERT INTO graph_nodes (collection, key, node_json, updated_at_ms)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(collection, key) DO UPDATE SET
                      node_json = excluded.node_json,
                      updated_at_ms = excluded.updated_at_ms
                    "#,
                    params![w.collection, w.key, json, now],
                )?;
                changes.push(NodeChange {
                    collection: w.collection,
                    key: w.key,
                    value: merged,
                });
            }
            tx.commit()?;
            Ok(changes)
        })
        .await??;
        self.publish(changes);
        Ok(())
    }

    async fn get_once(&self, collection: &str, key: &str) -> Result<Option<Node>> {
        let db_path = self.db_path.clone();
        let collection = collection.to_string();
        let key = key.to_string();
        let node = tokio::task::spawn_blocking(move || -> Result<Option<Node>> {
            let conn = open_conn(&db_path)?;
            load_node(&conn, &collection, &key)
        })
        .await??;
        Ok(node)
    }

    async fn subscribe_stream(&self, collection: &str) -> Result<Subscription> {
        // Subscribe before reading the snapshot so nothing committed in between is missed.
        let live = self.changes.subscribe();
        let guard = self.subscriptions.acquire();
        let db_path = self.db_path.clone();
        let coll = collection.to_string();
        let backlog = tokio::task::spawn_blocking(move || -> Result<Vec<(String, Node)>> {
            let conn = open_conn(&db_path)?;
            let mut stmt = conn.prepare(
                r#"
                SELECT key, node_json FROM graph_nodes
                WHERE collection = ?1
                ORDER BY updated_at_ms ASC, key ASC
                "#,
            )?;
            let mut rows = stmt.query(params![coll])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let key: String = row.get(0)?;
                let raw: Vec<u8> = row.get(1)?;
                let node: Node = serde_json::from_slice(&raw)
                    .with_context(|| format!("parse node {key}"))?;
                out.push((key, node));
            }
            Ok(out)
        })
        .await??;
        Ok(Subscription::new(collection, backlog, live, guard))
    }

    fn active_subscriptions(&self) -> usize {
        self.subscriptions.active()
    }
}

fn load_node(conn: &Connection, collection: &str, key: &str) -> Result<Option<Node>> {
    let raw: Option<Vec<u8>> = conn
        .query_row(
            "SELECT node_json FROM graph_nodes WHERE collection = ?1 AND key = ?2",
            params![collection, key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(raw) => {
            let node: Node = serde_json::from_slice(&raw)
                .with_context(|| format!("parse node {collection}/{key}"))?;
            Ok(Some(node))
        }
        None => Ok(None),
    }
}

fn open_conn(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("open db: {}", path.display()))?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

fn init_db(path: &Path) -> Result<()> {
    let conn = open_conn(path)?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        CREATE TABLE IF NOT EXISTS graph_nodes (
          collection TEXT NOT NULL,
          key TEXT NOT NULL,
          node_json BLOB NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY(collection, key)
        );
        CREATE INDEX IF NOT EXISTS idx_nodes_updated ON graph_nodes(collection, updated_at_ms);
        "#,
    )?;
    Ok(())
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
