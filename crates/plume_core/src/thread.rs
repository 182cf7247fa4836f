/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::engine::ContentEngine;
use crate::error::ContentError;
use plume_protocol::ContentThread;
use tracing::warn;

/// Joins a live post with its live comments.
///
/// A post without comments yields an empty `children` list whatever the
/// empty-listing policy says. Every other failure, including a missing or
/// deleted root, is reported as [`ContentError::ErrorFetchingChildren`] with the
/// cause attached.
pub async fn get_content_with_children(
    engine: &ContentEngine,
    id: &str,
) -> Result<ContentThread, ContentError> {
    let content = engine
        .get_by_id(id)
        .await
        .map_err(ContentError::fetching_children)?;
    let children = match engine.get_comments_by_parent(id).await {
        Ok(children) => children,
        Err(ContentError::NoResults) => Vec::new(),
        Err(e) => {
            warn!(content_id = %id, "fetching children failed: {e}");
            return Err(ContentError::fetching_children(e));
        }
    };
    Ok(ContentThread { content, children })
}
