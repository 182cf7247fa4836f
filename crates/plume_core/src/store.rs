/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Capability surface of the graph store.
//!
//! The store knows nothing about content: it keeps JSON nodes keyed by
//! `(collection, key)`, merges writes field by field, and pushes changes to
//! subscribers. Subscriptions never signal completion; callers bound them.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// A stored node: a flat JSON object.
pub type Node = Map<String, Value>;

/// Store bookkeeping field. Never part of the caller's data.
pub const META_FIELD: &str = "_";
const META_SOUL: &str = "#";
const META_STATE: &str = ">";

#[derive(Debug, Clone)]
pub struct NodeWrite {
    pub collection: String,
    pub key: String,
    pub value: Node,
}

impl NodeWrite {
    pub fn new(collection: &str, key: &str, value: Node) -> Self {
        Self {
            collection: collection.to_string(),
            key: key.to_string(),
            value,
        }
    }
}

/// Emitted once per committed node write.
#[derive(Debug, Clone)]
pub struct NodeChange {
    pub collection: String,
    pub key: String,
    pub value: Node,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Merges `value` onto the node at `(collection, key)`, creating it if absent.
    /// `Ok` means accepted locally, not confirmed by other replicas.
    async fn put_entry(&self, collection: &str, key: &str, value: Node) -> Result<()>;

    /// Applies every write or none of them.
    async fn put_batch(&self, writes: Vec<NodeWrite>) -> Result<()>;

    /// Current locally-known state of one node.
    async fn get_once(&self, collection: &str, key: &str) -> Result<Option<Node>>;

    /// Replays every known node of `collection`, then every later change to it.
    /// Dropping the returned value detaches it.
    async fn subscribe_stream(&self, collection: &str) -> Result<Subscription>;

    /// Subscriptions currently attached.
    fn active_subscriptions(&self) -> usize;
}

/// Counts live subscriptions so a leaked one shows up.
#[derive(Clone, Default)]
pub struct SubscriptionTracker {
    active: Arc<AtomicUsize>,
}

impl SubscriptionTracker {
    pub fn acquire(&self) -> SubscriptionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        SubscriptionGuard {
            active: self.active.clone(),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

pub struct SubscriptionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Open-ended feed of `(key, node)` pairs for one collection.
pub struct Subscription {
    collection: String,
    backlog: VecDeque<(String, Node)>,
    live: broadcast::Receiver<NodeChange>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    /// `live` must be subscribed before `backlog` is read, or changes committed in
    /// between are lost.
    pub fn new(
        collection: &str,
        backlog: Vec<(String, Node)>,
        live: broadcast::Receiver<NodeChange>,
        guard: SubscriptionGuard,
    ) -> Self {
        debug!(collection, replay = backlog.len(), "subscription attached");
        Self {
            collection: collection.to_string(),
            backlog: backlog.into(),
            live,
            _guard: guard,
        }
    }

    /// Next emission. Pending forever while nothing changes; `None` once the store
    /// side of the channel is gone.
    pub async fn next(&mut self) -> Option<(String, Node)> {
        if let Some(item) = self.backlog.pop_front() {
            return Some(item);
        }
        loop {
            match self.live.recv().await {
                Ok(change) if change.collection == self.collection => {
                    return Some((change.key, change.value));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(collection = %self.collection, skipped, "subscription lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Explicit form of dropping the subscription.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(collection = %self.collection, "subscription detached");
    }
}

/// Field-level merge of `incoming` onto `existing`, stamping each written field's
/// state in the bookkeeping object. Incoming bookkeeping is ignored.
pub fn merge_node(
    existing: Option<Node>,
    incoming: &Node,
    collection: &str,
    key: &str,
    state_ms: i64,
) -> Node {
    let mut node = existing.unwrap_or_default();
    let mut meta = match node.remove(META_FIELD) {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    };
    let mut states = match meta.remove(META_STATE) {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    };
    for (field, value) in incoming {
        if field == META_FIELD {
            continue;
        }
        node.insert(field.clone(), value.clone());
        states.insert(field.clone(), Value::from(state_ms));
    }
    meta.insert(
        META_SOUL.to_string(),
        Value::String(format!("{collection}/{key}")),
    );
    meta.insert(META_STATE.to_string(), Value::Object(states));
    node.insert(META_FIELD.to_string(), Value::Object(meta));
    node
}

/// True when the node carries a store identity, i.e. it was written at least once.
pub fn has_soul(node: &Node) -> bool {
    node.get(META_FIELD)
        .and_then(|m| m.get(META_SOUL))
        .and_then(|s| s.as_str())
        .map(|s| !s.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Node {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn merge_keeps_untouched_fields_and_stamps_state() {
        let first = merge_node(None, &obj(json!({"a": 1, "b": 2})), "posts", "k", 10);
        assert!(has_soul(&first));
        let second = merge_node(Some(first), &obj(json!({"b": 3, "_": {"#": "x"}})), "posts", "k", 20);
        assert_eq!(second["a"], 1);
        assert_eq!(second["b"], 3);
        assert_eq!(second["_"]["#"], "posts/k");
        assert_eq!(second["_"][">"]["a"], 10);
        assert_eq!(second["_"][">"]["b"], 20);
    }

    #[test]
    fn node_without_bookkeeping_has_no_soul() {
        assert!(!has_soul(&obj(json!({"a": 1}))));
    }

    #[tokio::test]
    async fn subscription_replays_then_follows_and_releases_guard() {
        let tracker = SubscriptionTracker::default();
        let (tx, rx) = broadcast::channel(16);
        let mut sub = Subscription::new(
            "posts",
            vec![("a".to_string(), obj(json!({"n": 1})))],
            rx,
            tracker.acquire(),
        );
        assert_eq!(tracker.active(), 1);

        tx.send(NodeChange {
            collection: "other".into(),
            key: "x".into(),
            value: Node::new(),
        })
        .unwrap();
        tx.send(NodeChange {
            collection: "posts".into(),
            key: "b".into(),
            value: obj(json!({"n": 2})),
        })
        .unwrap();

        assert_eq!(sub.next().await.unwrap().0, "a");
        assert_eq!(sub.next().await.unwrap().0, "b");
        sub.detach();
        assert_eq!(tracker.active(), 0);
    }
}
