/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Content aggregation over the graph store.
//!
//! Writes go straight to the store together with their index entries. Reads of a
//! known key use a single `get_once`; collection-wide reads either walk the index
//! nodes or listen to the collection for a quiescence window, depending on
//! [`ReadStrategy`]. The engine holds no data between calls.

use crate::config::{EmptyCommentsPolicy, EngineConfig, ReadStrategy};
use crate::error::ContentError;
use crate::filter::{AuthorView, EntryFilter, TypeFilter};
use crate::index;
use crate::quiescence::{self, WindowClass, Windows};
use crate::schema;
use crate::store::{has_soul, GraphStore, Node, NodeWrite};
use futures_util::{stream, StreamExt};
use plume_protocol::{Content, ContentPatch, ContentType};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collection holding every content entry.
pub const CONTENT_COLLECTION: &str = "posts";

const RESOLVE_CONCURRENCY: usize = 16;
const REINDEX_BATCH: usize = 200;

#[derive(Clone)]
pub struct ContentEngine {
    store: Arc<dyn GraphStore>,
    cfg: EngineConfig,
    windows: Windows,
}

impl ContentEngine {
    pub fn new(store: Arc<dyn GraphStore>, cfg: EngineConfig) -> Self {
        let windows = cfg.windows();
        Self { store, cfg, windows }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Creates a new entry under the caller's id.
    ///
    /// The existence probe and the write are separate store calls: two concurrent
    /// creates of one id can both pass the probe, and the later write wins.
    pub async fn create_content(&self, mut content: Content) -> Result<Content, ContentError> {
        validate_new(&content)?;
        if content.created_at.trim().is_empty() {
            content.created_at = now_rfc3339();
        }
        let id = content.content_id.clone();

        let existing = self
            .store
            .get_once(CONTENT_COLLECTION, &id)
            .await
            .map_err(ContentError::read)?;
        if existing.as_ref().is_some_and(has_soul) {
            return Err(ContentError::AlreadyExists(id));
        }

        let node = encode_record(&content)?;
        let mut writes = vec![NodeWrite::new(CONTENT_COLLECTION, &id, node)];
        writes.extend(index::memberships(&content));
        self.store.put_batch(writes).await.map_err(|e| {
            warn!(content_id = %id, "create failed: {e:#}");
            ContentError::write(e)
        })?;

        info!(content_id = %id, kind = content.kind.as_str(), "content created");
        Ok(content)
    }

    /// Flags the entry as deleted. The record stays in the store.
    pub async fn delete_content(&self, id: &str) -> Result<(), ContentError> {
        if self.load(id).await?.is_none() {
            return Err(ContentError::NotFound);
        }
        let mut tombstone = Node::new();
        tombstone.insert("IsDeleted".to_string(), Value::Bool(true));
        self.store
            .put_entry(CONTENT_COLLECTION, id, tombstone)
            .await
            .map_err(|e| {
                warn!(content_id = %id, "delete failed: {e:#}");
                ContentError::write(e)
            })?;
        info!(content_id = %id, "content deleted");
        Ok(())
    }

    /// Merges the patch onto the stored record. Id, type and creation time are
    /// kept from the stored record.
    pub async fn update_content(&self, patch: ContentPatch) -> Result<Content, ContentError> {
        let id = patch.content_id.trim().to_string();
        if id.is_empty() {
            return Err(ContentError::ValidationError(
                "Content must have a ContentId".to_string(),
            ));
        }

        let Some(stored) = self.load(&id).await? else {
            return Err(ContentError::NotFound);
        };
        let current = decode_stored(&id, stored.clone())?;
        if current.is_deleted {
            return Err(ContentError::DeletedConflict(id));
        }

        let mut merged = schema::strip_bookkeeping(schema::normalize(stored));
        let incoming = schema::encode(&patch)
            .map_err(|e| ContentError::ValidationError(format!("invalid update: {e}")))?;
        merged.extend(incoming);
        merged.insert("ContentId".to_string(), Value::String(id.clone()));
        merged.insert(
            "Type".to_string(),
            Value::String(current.kind.as_str().to_string()),
        );
        merged.insert(
            "CreatedAt".to_string(),
            Value::String(current.created_at.clone()),
        );

        let updated = schema::decode(&id, merged)
            .map_err(|e| ContentError::ValidationError(format!("invalid update: {e}")))?;
        if updated.is_comment() && missing_parent(&updated) {
            return Err(ContentError::ValidationError(
                "Comment must have a ParentContentId".to_string(),
            ));
        }

        let mut record = encode_record(&updated)?;
        // A delete may have landed since the read. Leave the stored flag alone.
        if !updated.is_deleted {
            record.remove("IsDeleted");
        }
        let mut writes = vec![NodeWrite::new(CONTENT_COLLECTION, &id, record)];
        writes.extend(index::moves(&current, &updated));
        self.store.put_batch(writes).await.map_err(|e| {
            warn!(content_id = %id, "update failed: {e:#}");
            ContentError::write(e)
        })?;

        info!(content_id = %id, "content updated");
        Ok(updated)
    }

    /// A live post or retweet.
    pub async fn get_by_id(&self, id: &str) -> Result<Content, ContentError> {
        self.get_live(id, TypeFilter::Posts).await
    }

    /// A live comment.
    pub async fn get_comment_by_id(&self, id: &str) -> Result<Content, ContentError> {
        self.get_live(id, TypeFilter::Comments).await
    }

    pub async fn list_content(
        &self,
        types: TypeFilter,
        show_deleted: bool,
    ) -> Result<Vec<Content>, ContentError> {
        let filter = EntryFilter::All {
            types,
            show_deleted,
        };
        match self.cfg.read_strategy {
            ReadStrategy::Stream => self.scan(&filter, WindowClass::Listing).await,
            ReadStrategy::Index => {
                let kinds: Vec<String> = ContentType::ALL
                    .iter()
                    .filter(|t| types.matches(**t))
                    .map(|t| t.as_str().to_string())
                    .collect();
                let ids = self.index_ids(index::BY_TYPE, &kinds).await?;
                self.resolve(ids, &filter).await
            }
        }
    }

    /// Live comments whose parent is `parent_id`. The parent itself may be deleted.
    pub async fn get_comments_by_parent(
        &self,
        parent_id: &str,
    ) -> Result<Vec<Content>, ContentError> {
        if self.load(parent_id).await?.is_none() {
            return Err(ContentError::NotFound);
        }
        let filter = EntryFilter::CommentsOf {
            parent_id: parent_id.to_string(),
        };
        let comments = match self.cfg.read_strategy {
            ReadStrategy::Stream => self.scan(&filter, WindowClass::Sparse).await?,
            ReadStrategy::Index => {
                let ids = self
                    .index_ids(index::BY_PARENT, &[parent_id.to_string()])
                    .await?;
                self.resolve(ids, &filter).await?
            }
        };
        if comments.is_empty() && self.cfg.empty_comments == EmptyCommentsPolicy::Error {
            return Err(ContentError::NoResults);
        }
        Ok(comments)
    }

    pub async fn list_by_author(
        &self,
        author_id: &str,
        view: AuthorView,
    ) -> Result<Vec<Content>, ContentError> {
        let filter = EntryFilter::ByAuthor {
            author_id: author_id.to_string(),
            types: view.type_filter(),
        };
        match self.cfg.read_strategy {
            ReadStrategy::Stream => {
                let class = match view {
                    AuthorView::Posts => WindowClass::Listing,
                    AuthorView::Comments => WindowClass::Sparse,
                };
                self.scan(&filter, class).await
            }
            ReadStrategy::Index => {
                let ids = self
                    .index_ids(index::BY_AUTHOR, &[author_id.to_string()])
                    .await?;
                self.resolve(ids, &filter).await
            }
        }
    }

    /// Live posts that `author_id` has commented on.
    ///
    /// The second pass depends on the parent ids gathered by the first, so the
    /// two run one after the other.
    pub async fn get_posts_commented_by_author(
        &self,
        author_id: &str,
    ) -> Result<Vec<Content>, ContentError> {
        let comments_filter = EntryFilter::ByAuthor {
            author_id: author_id.to_string(),
            types: TypeFilter::Comments,
        };
        let comments = match self.cfg.read_strategy {
            ReadStrategy::Stream => self.scan(&comments_filter, WindowClass::Composite).await?,
            ReadStrategy::Index => {
                let ids = self
                    .index_ids(index::BY_AUTHOR, &[author_id.to_string()])
                    .await?;
                self.resolve(ids, &comments_filter).await?
            }
        };

        let mut seen = HashSet::new();
        let parents: Vec<String> = comments
            .into_iter()
            .filter_map(|c| c.parent_content_id)
            .filter(|p| !p.trim().is_empty() && seen.insert(p.clone()))
            .collect();
        debug!(author_id, parents = parents.len(), "commented posts phase one done");
        if parents.is_empty() {
            return Ok(Vec::new());
        }

        let posts_filter = EntryFilter::PostsIn {
            ids: parents.iter().cloned().collect(),
        };
        match self.cfg.read_strategy {
            ReadStrategy::Stream => self.scan(&posts_filter, WindowClass::Composite).await,
            ReadStrategy::Index => self.resolve(parents, &posts_filter).await,
        }
    }

    /// Re-registers every entry found on the collection in the index nodes.
    /// Returns how many entries were indexed.
    pub async fn rebuild_indexes(&self) -> Result<usize, ContentError> {
        let sub = self
            .store
            .subscribe_stream(CONTENT_COLLECTION)
            .await
            .map_err(ContentError::read)?;
        let all = quiescence::collect(
            sub,
            self.windows.get(WindowClass::Composite),
            decode_entry,
        )
        .await;

        let writes: Vec<NodeWrite> = all.iter().flat_map(index::memberships).collect();
        for chunk in writes.chunks(REINDEX_BATCH) {
            self.store.put_batch(chunk.to_vec()).await.map_err(|e| {
                warn!("reindex batch failed: {e:#}");
                ContentError::write(e)
            })?;
        }
        info!(entries = all.len(), writes = writes.len(), "indexes rebuilt");
        Ok(all.len())
    }

    async fn get_live(&self, id: &str, class: TypeFilter) -> Result<Content, ContentError> {
        let Some(stored) = self.load(id).await? else {
            return Err(ContentError::NotFound);
        };
        let content = decode_stored(id, stored)?;
        if content.is_deleted || !class.matches(content.kind) {
            return Err(ContentError::NotFound);
        }
        Ok(content)
    }

    async fn load(&self, id: &str) -> Result<Option<Node>, ContentError> {
        self.store
            .get_once(CONTENT_COLLECTION, id)
            .await
            .map_err(|e| {
                warn!(content_id = %id, "read failed: {e:#}");
                ContentError::read(e)
            })
    }

    async fn scan(
        &self,
        filter: &EntryFilter,
        class: WindowClass,
    ) -> Result<Vec<Content>, ContentError> {
        let sub = self
            .store
            .subscribe_stream(CONTENT_COLLECTION)
            .await
            .map_err(|e| {
                warn!("subscribe failed: {e:#}");
                ContentError::read(e)
            })?;
        let items = quiescence::collect(sub, self.windows.get(class), |key, node| {
            decode_entry(key, node).filter(|c| filter.accepts(c))
        })
        .await;
        Ok(items)
    }

    async fn index_ids(
        &self,
        collection: &str,
        keys: &[String],
    ) -> Result<Vec<String>, ContentError> {
        let mut members = Vec::new();
        for key in keys {
            let node = self
                .store
                .get_once(collection, key)
                .await
                .map_err(ContentError::read)?;
            if let Some(node) = node {
                members.extend(index::members(&node));
            }
        }
        Ok(index::ordered_ids(members))
    }

    async fn resolve(
        &self,
        ids: Vec<String>,
        filter: &EntryFilter,
    ) -> Result<Vec<Content>, ContentError> {
        let nodes: Vec<anyhow::Result<Option<Node>>> = stream::iter(ids.iter().cloned())
            .map(|id| {
                let store = self.store.clone();
                async move { store.get_once(CONTENT_COLLECTION, &id).await }
            })
            .buffered(RESOLVE_CONCURRENCY)
            .collect()
            .await;

        let mut out = Vec::new();
        for (id, node) in ids.iter().zip(nodes) {
            let Some(node) = node.map_err(ContentError::read)? else {
                continue;
            };
            if let Some(content) = decode_entry(id, node) {
                if filter.accepts(&content) {
                    out.push(content);
                }
            }
        }
        Ok(out)
    }
}

fn validate_new(content: &Content) -> Result<(), ContentError> {
    if content.content_id.trim().is_empty() {
        return Err(ContentError::ValidationError(
            "Content must have a ContentId".to_string(),
        ));
    }
    if content.is_comment() && missing_parent(content) {
        return Err(ContentError::ValidationError(
            "Comment must have a ParentContentId".to_string(),
        ));
    }
    if content.is_deleted {
        return Err(ContentError::ValidationError(
            "Content cannot be created already deleted".to_string(),
        ));
    }
    Ok(())
}

fn missing_parent(content: &Content) -> bool {
    content
        .parent_content_id
        .as_deref()
        .map(|p| p.trim().is_empty())
        .unwrap_or(true)
}

fn encode_record(content: &Content) -> Result<Node, ContentError> {
    schema::encode(content).map_err(|e| ContentError::UpstreamWriteFailure(format!("encode: {e}")))
}

fn decode_stored(id: &str, node: Node) -> Result<Content, ContentError> {
    schema::decode(id, node).map_err(|e| {
        warn!(content_id = %id, "malformed record: {e}");
        ContentError::UpstreamReadFailure(format!("malformed record {id}: {e}"))
    })
}

fn decode_entry(key: &str, node: Node) -> Option<Content> {
    match schema::decode(key, node) {
        Ok(c) => Some(c),
        Err(e) => {
            debug!(key, "skipping undecodable entry: {e}");
            None
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
