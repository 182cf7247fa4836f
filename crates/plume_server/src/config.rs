/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use plume_core::{EmptyCommentsPolicy, EngineConfig, ReadStrategy};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub servers_file: PathBuf,
    pub max_body_bytes: usize,
    pub engine: EngineConfig,
}

pub fn load_config() -> Result<ServerConfig> {
    config_from(|name| std::env::var(name).ok())
}

/// Builds the configuration from a variable lookup. Empty values count as unset.
pub fn config_from(var: impl Fn(&str) -> Option<String>) -> Result<ServerConfig> {
    let var = |name: &str| var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let bind = var("PLUME_BIND").unwrap_or_else(|| "0.0.0.0:3000".to_string());
    let mut bind: SocketAddr = bind
        .parse()
        .with_context(|| format!("PLUME_BIND invalid: {bind}"))?;
    if let Some(port) = var("PORT") {
        bind.set_port(port.parse().with_context(|| format!("PORT invalid: {port}"))?);
    }

    let db_path = PathBuf::from(var("PLUME_DB").unwrap_or_else(|| "plume.db".to_string()));
    let servers_file =
        PathBuf::from(var("PLUME_SERVERS_FILE").unwrap_or_else(|| "servers.json".to_string()));
    let max_body_bytes = match var("PLUME_MAX_BODY_BYTES") {
        Some(v) => v
            .parse()
            .with_context(|| format!("PLUME_MAX_BODY_BYTES invalid: {v}"))?,
        None => DEFAULT_MAX_BODY_BYTES,
    };

    let mut engine = match var("PLUME_CONFIG") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read engine config {path}"))?;
            serde_json::from_str::<EngineConfig>(&raw)
                .with_context(|| format!("parse engine config {path}"))?
        }
        None => EngineConfig::default(),
    };
    if let Some(v) = var("PLUME_READ_STRATEGY") {
        engine.read_strategy = v
            .parse::<ReadStrategy>()
            .context("PLUME_READ_STRATEGY invalid")?;
    }
    if let Some(v) = var("PLUME_EMPTY_COMMENTS") {
        engine.empty_comments = v
            .parse::<EmptyCommentsPolicy>()
            .context("PLUME_EMPTY_COMMENTS invalid")?;
    }
    for (name, slot) in [
        ("PLUME_LISTING_WINDOW_MS", &mut engine.listing_window_ms),
        ("PLUME_SPARSE_WINDOW_MS", &mut engine.sparse_window_ms),
        ("PLUME_COMPOSITE_WINDOW_MS", &mut engine.composite_window_ms),
    ] {
        if let Some(v) = var(name) {
            *slot = v.parse().with_context(|| format!("{name} invalid: {v}"))?;
        }
    }

    Ok(ServerConfig {
        bind,
        db_path,
        servers_file,
        max_body_bytes,
        engine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config_from(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = from_map(&[]).unwrap();
        assert_eq!(cfg.bind.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.db_path, PathBuf::from("plume.db"));
        assert_eq!(cfg.servers_file, PathBuf::from("servers.json"));
        assert_eq!(cfg.max_body_bytes, 1024 * 1024);
        assert_eq!(cfg.engine.read_strategy, ReadStrategy::Index);
    }

    #[test]
    fn env_overrides() {
        let cfg = from_map(&[
            ("PLUME_BIND", "127.0.0.1:9000"),
            ("PORT", "8080"),
            ("PLUME_READ_STRATEGY", "stream"),
            ("PLUME_EMPTY_COMMENTS", "empty"),
            ("PLUME_SPARSE_WINDOW_MS", "2500"),
            ("PLUME_DB", " "),
        ])
        .unwrap();
        assert_eq!(cfg.bind.to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.engine.read_strategy, ReadStrategy::Stream);
        assert_eq!(cfg.engine.empty_comments, EmptyCommentsPolicy::Empty);
        assert_eq!(cfg.engine.sparse_window_ms, 2500);
        assert_eq!(cfg.engine.listing_window_ms, 500);
        assert_eq!(cfg.db_path, PathBuf::from("plume.db"));
    }

    #[test]
    fn engine_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"listing_window_ms": 800, "read_strategy": "stream"}"#).unwrap();
        let path = path.to_string_lossy().to_string();
        let cfg = from_map(&[("PLUME_CONFIG", &path), ("PLUME_READ_STRATEGY", "index")]).unwrap();
        assert_eq!(cfg.engine.listing_window_ms, 800);
        assert_eq!(cfg.engine.read_strategy, ReadStrategy::Index);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(from_map(&[("PLUME_BIND", "nowhere")]).is_err());
        assert!(from_map(&[("PLUME_READ_STRATEGY", "sql")]).is_err());
        assert!(from_map(&[("PLUME_LISTING_WINDOW_MS", "soon")]).is_err());
    }
}
