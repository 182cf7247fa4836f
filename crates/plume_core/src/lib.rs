/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod quiescence;
pub mod schema;
pub mod sqlite_store;
pub mod store;
pub mod thread;

pub use config::{EmptyCommentsPolicy, EngineConfig, ReadStrategy};
pub use engine::{ContentEngine, CONTENT_COLLECTION};
pub use error::ContentError;
pub use filter::{AuthorView, TypeFilter};
pub use sqlite_store::SqliteGraphStore;
pub use store::GraphStore;
pub use thread::get_content_with_children;

pub fn plume_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
