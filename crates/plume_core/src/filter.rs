/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Pure predicates over decoded content.

use plume_protocol::{Content, ContentType};
use std::collections::HashSet;

/// Which content types a listing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    Any,
    /// Everything except comments.
    Posts,
    Comments,
    Only(ContentType),
}

impl TypeFilter {
    pub fn matches(&self, ty: ContentType) -> bool {
        match self {
            Self::Any => true,
            Self::Posts => !ty.is_comment(),
            Self::Comments => ty.is_comment(),
            Self::Only(want) => *want == ty,
        }
    }
}

/// The two author views: what they posted, or what they commented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorView {
    Posts,
    Comments,
}

impl AuthorView {
    pub fn type_filter(&self) -> TypeFilter {
        match self {
            Self::Posts => TypeFilter::Posts,
            Self::Comments => TypeFilter::Comments,
        }
    }
}

pub fn visible(content: &Content, show_deleted: bool) -> bool {
    show_deleted || !content.is_deleted
}

/// Selection criteria of every collection-wide query.
#[derive(Debug, Clone)]
pub enum EntryFilter {
    All {
        types: TypeFilter,
        show_deleted: bool,
    },
    CommentsOf {
        parent_id: String,
    },
    ByAuthor {
        author_id: String,
        types: TypeFilter,
    },
    /// Live non-comments whose id is in the set.
    PostsIn {
        ids: HashSet<String>,
    },
}

impl EntryFilter {
    pub fn accepts(&self, content: &Content) -> bool {
        match self {
            Self::All {
                types,
                show_deleted,
            } => visible(content, *show_deleted) && types.matches(content.kind),
            Self::CommentsOf { parent_id } => {
                !content.is_deleted
                    && content.is_comment()
                    && content.parent_content_id.as_deref() == Some(parent_id.as_str())
            }
            Self::ByAuthor { author_id, types } => {
                !content.is_deleted && content.author_id == *author_id && types.matches(content.kind)
            }
            Self::PostsIn { ids } => {
                !content.is_deleted && !content.is_comment() && ids.contains(&content.content_id)
            }
        }
    }
}
