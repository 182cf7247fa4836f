/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::quiescence::Windows;
use anyhow::anyhow;
use std::str::FromStr;
use std::time::Duration;

/// How collection-wide queries are answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// Resolve through index nodes maintained on every write. No timers.
    Index,
    /// Listen to the collection for a quiescence window.
    Stream,
}

impl FromStr for ReadStrategy {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> anyhow::Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "index" | "indexed" => Ok(Self::Index),
            "stream" | "scan" | "quiescence" => Ok(Self::Stream),
            other => Err(anyhow!("unknown read strategy: {other}")),
        }
    }
}

/// What an empty comment listing means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCommentsPolicy {
    /// Report `NoResults`.
    Error,
    /// Return an empty list like every other listing does.
    Empty,
}

impl FromStr for EmptyCommentsPolicy {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> anyhow::Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "error" | "no_results" | "no-results" => Ok(Self::Error),
            "empty" | "empty_list" | "empty-list" => Ok(Self::Empty),
            other => Err(anyhow!("unknown empty-comments policy: {other}")),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct EngineConfig {
    /// Window for all-content and by-author listings (milliseconds).
    #[serde(default = "default_listing_window_ms")]
    pub listing_window_ms: u64,
    /// Window for comments-by-post and comments-by-user (milliseconds).
    #[serde(default = "default_sparse_window_ms")]
    pub sparse_window_ms: u64,
    /// Window for each phase of a two-phase query (milliseconds).
    #[serde(default = "default_composite_window_ms")]
    pub composite_window_ms: u64,
    #[serde(default = "default_read_strategy")]
    pub read_strategy: ReadStrategy,
    #[serde(default = "default_empty_comments")]
    pub empty_comments: EmptyCommentsPolicy,
}

fn default_listing_window_ms() -> u64 {
    500
}

fn default_sparse_window_ms() -> u64 {
    1500
}

fn default_composite_window_ms() -> u64 {
    1000
}

fn default_read_strategy() -> ReadStrategy {
    ReadStrategy::Index
}

fn default_empty_comments() -> EmptyCommentsPolicy {
    EmptyCommentsPolicy::Error
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listing_window_ms: default_listing_window_ms(),
            sparse_window_ms: default_sparse_window_ms(),
            composite_window_ms: default_composite_window_ms(),
            read_strategy: default_read_strategy(),
            empty_comments: default_empty_comments(),
        }
    }
}

impl EngineConfig {
    pub fn windows(&self) -> Windows {
        // A zero window would snapshot before the replay is read.
        Windows {
            listing: Duration::from_millis(self.listing_window_ms.max(10)),
            sparse: Duration::from_millis(self.sparse_window_ms.max(10)),
            composite: Duration::from_millis(self.composite_window_ms.max(10)),
        }
    }
}
