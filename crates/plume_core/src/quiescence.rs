/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Bounding an open-ended subscription with a quiescence window.
//!
//! The store never says "that was everything", so a collection-wide query
//! listens for a fixed window and then treats what it has as the answer.

use crate::store::{Node, Subscription};
use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Operation classes with their own window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClass {
    /// All-content and by-author listings.
    Listing,
    /// Filters expected to match few entries (comments by post or by user).
    Sparse,
    /// One phase of a two-phase query.
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    pub listing: Duration,
    pub sparse: Duration,
    pub composite: Duration,
}

impl Windows {
    pub fn get(&self, class: WindowClass) -> Duration {
        match class {
            WindowClass::Listing => self.listing,
            WindowClass::Sparse => self.sparse,
            WindowClass::Composite => self.composite,
        }
    }
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            listing: Duration::from_millis(500),
            sparse: Duration::from_millis(1500),
            composite: Duration::from_millis(1000),
        }
    }
}

/// Buffers `keep`'s output per key until `window` elapses (or the stream closes),
/// then detaches the subscription and returns the buffer in first-arrival order.
///
/// A later emission for a key replaces the earlier one; if `keep` rejects the later
/// value, the key leaves the buffer.
pub async fn collect<T, F>(mut sub: Subscription, window: Duration, mut keep: F) -> Vec<T>
where
    F: FnMut(&str, Node) -> Option<T>,
{
    let started = Instant::now();
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);

    let mut buffer: IndexMap<String, T> = IndexMap::new();
    let mut seen: u64 = 0;
    let mut closed = false;
    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => break,
            next = sub.next() => {
                let Some((key, node)) = next else {
                    closed = true;
                    break;
                };
                seen += 1;
                match keep(&key, node) {
                    Some(v) => {
                        buffer.insert(key, v);
                    }
                    None => {
                        buffer.shift_remove(&key);
                    }
                }
            }
        }
    }
    sub.detach();

    debug!(
        window_ms = window.as_millis() as u64,
        elapsed_ms = started.elapsed().as_millis() as u64,
        seen,
        kept = buffer.len(),
        closed,
        "quiescence window elapsed"
    );
    buffer.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NodeChange, SubscriptionTracker};
    use serde_json::json;
    use tokio::sync::broadcast;

    fn node(n: i64) -> Node {
        json!({ "n": n }).as_object().cloned().unwrap()
    }

    fn change(key: &str, n: i64) -> NodeChange {
        NodeChange {
            collection: "posts".into(),
            key: key.into(),
            value: node(n),
        }
    }

    fn keep_even(_key: &str, node: Node) -> Option<i64> {
        let n = node["n"].as_i64()?;
        (n % 2 == 0).then_some(n)
    }

    #[tokio::test]
    async fn returns_after_window_and_releases_subscription() {
        let tracker = SubscriptionTracker::default();
        let (tx, rx) = broadcast::channel(16);
        let sub = Subscription::new(
            "posts",
            vec![("a".into(), node(2)), ("b".into(), node(3))],
            rx,
            tracker.acquire(),
        );

        let started = std::time::Instant::now();
        let out = collect(sub, Duration::from_millis(80), keep_even).await;
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert_eq!(out, vec![2]);
        assert_eq!(tracker.active(), 0);
        drop(tx);
    }

    #[tokio::test]
    async fn later_value_for_a_key_supersedes_earlier() {
        let tracker = SubscriptionTracker::default();
        let (tx, rx) = broadcast::channel(16);
        let sub = Subscription::new(
            "posts",
            vec![("a".into(), node(2)), ("b".into(), node(4))],
            rx,
            tracker.acquire(),
        );
        // "a" stops matching, "b" changes value, "c" arrives late but inside the window.
        tx.send(change("a", 5)).unwrap();
        tx.send(change("b", 6)).unwrap();
        tx.send(change("c", 8)).unwrap();

        let out = collect(sub, Duration::from_millis(80), keep_even).await;
        assert_eq!(out, vec![6, 8]);
    }

    #[tokio::test]
    async fn closed_stream_ends_early() {
        let tracker = SubscriptionTracker::default();
        let (tx, rx) = broadcast::channel(16);
        let sub = Subscription::new("posts", vec![("a".into(), node(2))], rx, tracker.acquire());
        drop(tx);

        let started = std::time::Instant::now();
        let out = collect(sub, Duration::from_secs(30), keep_even).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(out, vec![2]);
        assert_eq!(tracker.active(), 0);
    }

    #[test]
    fn default_windows() {
        let w = Windows::default();
        assert_eq!(w.get(WindowClass::Listing), Duration::from_millis(500));
        assert!(w.get(WindowClass::Sparse) > w.get(WindowClass::Listing));
    }
}
