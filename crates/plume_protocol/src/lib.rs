/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Wire types shared by the content engine and its HTTP front.
//!
//! Canonical attribute names are PascalCase. Older clients and stored records
//! spell the same attributes differently (`postId`, `UserId`, `content`, ...);
//! those spellings are accepted as aliases on input and never produced on output.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(alias = "original", alias = "post", alias = "Post")]
    Original,
    #[serde(alias = "comment")]
    Comment,
    #[serde(alias = "retweet")]
    Retweet,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::Comment => "Comment",
            Self::Retweet => "Retweet",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "original" | "post" => Some(Self::Original),
            "comment" => Some(Self::Comment),
            "retweet" => Some(Self::Retweet),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment)
    }

    pub const ALL: [ContentType; 3] = [Self::Original, Self::Comment, Self::Retweet];
}

/// A post, comment or retweet as persisted and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Content {
    #[serde(default, alias = "PostId", alias = "postId", alias = "contentId")]
    pub content_id: String,
    #[serde(default, alias = "UserId", alias = "userId", alias = "authorId")]
    pub author_id: String,
    /// Required for comments; retweets may point at the retweeted content.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "ParentPostId",
        alias = "parentPostId",
        alias = "parentContentId"
    )]
    pub parent_content_id: Option<String>,
    #[serde(rename = "Type", alias = "type")]
    pub kind: ContentType,
    #[serde(default, alias = "Content", alias = "content", alias = "body")]
    pub body: String,
    #[serde(default, alias = "Likes", alias = "likes")]
    pub like_count: u64,
    #[serde(default, alias = "Retweets", alias = "retweets")]
    pub retweet_count: u64,
    #[serde(default, alias = "Comments", alias = "comments")]
    pub comment_count: u64,
    /// RFC 3339 timestamp; filled in by the engine when empty.
    #[serde(default, alias = "createdAt")]
    pub created_at: String,
    #[serde(default, alias = "mediaUrl")]
    pub media_url: Option<String>,
    #[serde(default, alias = "mediaType")]
    pub media_type: Option<String>,
    #[serde(default, alias = "thumbnail")]
    pub thumbnail: Option<String>,
    #[serde(default, alias = "UserPub", alias = "userPub")]
    pub author_public_key: String,
    #[serde(default, alias = "signature")]
    pub signature: String,
    #[serde(default, alias = "isDeleted")]
    pub is_deleted: bool,
}

impl Content {
    pub fn is_comment(&self) -> bool {
        self.kind.is_comment()
    }
}

/// Partial update. Only the fields that are present are merged onto the stored
/// record; `Type` and `CreatedAt` are not patchable and are ignored if sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentPatch {
    #[serde(default, alias = "PostId", alias = "postId", alias = "contentId")]
    pub content_id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "UserId",
        alias = "userId",
        alias = "authorId"
    )]
    pub author_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "ParentPostId",
        alias = "parentPostId",
        alias = "parentContentId"
    )]
    pub parent_content_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "Content",
        alias = "content",
        alias = "body"
    )]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "Likes", alias = "likes")]
    pub like_count: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "Retweets",
        alias = "retweets"
    )]
    pub retweet_count: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "Comments",
        alias = "comments"
    )]
    pub comment_count: Option<u64>,
    /// `Some(None)` clears the stored value.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable",
        alias = "mediaUrl"
    )]
    pub media_url: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable",
        alias = "mediaType"
    )]
    pub media_type: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable",
        alias = "thumbnail"
    )]
    pub thumbnail: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "UserPub",
        alias = "userPub"
    )]
    pub author_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "signature")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "isDeleted")]
    pub is_deleted: Option<bool>,
}

/// Keeps an explicit `null` apart from an absent field: absent stays `None` through
/// `#[serde(default)]`, `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ContentPatch {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            ..Default::default()
        }
    }
}

/// A root item joined with its live comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentThread {
    pub content: Content,
    pub children: Vec<Content>,
}

/// JSON body of every failed API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_spellings_decode() {
        let c: Content = serde_json::from_value(serde_json::json!({
            "PostId": "P1",
            "UserId": "U1",
            "Type": "Original",
            "Content": "hello",
            "Likes": 3,
            "UserPub": "pk",
        }))
        .unwrap();
        assert_eq!(c.content_id, "P1");
        assert_eq!(c.author_id, "U1");
        assert_eq!(c.body, "hello");
        assert_eq!(c.like_count, 3);
        assert_eq!(c.author_public_key, "pk");
        assert!(!c.is_deleted);

        let c: Content = serde_json::from_value(serde_json::json!({
            "postId": "C1",
            "userId": "U2",
            "parentPostId": "P1",
            "type": "comment",
            "content": "hi",
        }))
        .unwrap();
        assert_eq!(c.kind, ContentType::Comment);
        assert_eq!(c.parent_content_id.as_deref(), Some("P1"));
    }

    #[test]
    fn serializes_canonical_names_only() {
        let c = Content {
            content_id: "P1".into(),
            author_id: "U1".into(),
            parent_content_id: None,
            kind: ContentType::Retweet,
            body: "b".into(),
            like_count: 0,
            retweet_count: 0,
            comment_count: 0,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            media_url: None,
            media_type: None,
            thumbnail: None,
            author_public_key: String::new(),
            signature: String::new(),
            is_deleted: false,
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["ContentId"], "P1");
        assert_eq!(v["AuthorId"], "U1");
        assert_eq!(v["Type"], "Retweet");
        assert_eq!(v["IsDeleted"], false);
        assert!(v.get("ParentContentId").is_none());
        assert!(v["MediaUrl"].is_null());
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let mut p = ContentPatch::new("P1");
        p.body = Some("bye".into());
        let v = serde_json::to_value(&p).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["ContentId"], "P1");
        assert_eq!(obj["Body"], "bye");
    }

    #[test]
    fn patch_keeps_explicit_null_apart_from_absent() {
        let p: ContentPatch = serde_json::from_value(serde_json::json!({
            "ContentId": "P1",
            "MediaUrl": null,
            "mediaType": "image/png",
        }))
        .unwrap();
        assert_eq!(p.media_url, Some(None));
        assert_eq!(p.media_type, Some(Some("image/png".to_string())));
        assert_eq!(p.thumbnail, None);

        let v = serde_json::to_value(&p).unwrap();
        let obj = v.as_object().unwrap();
        assert!(obj["MediaUrl"].is_null());
        assert_eq!(obj["MediaType"], "image/png");
        assert!(!obj.contains_key("Thumbnail"));
    }

    #[test]
    fn content_type_parse_is_case_insensitive() {
        assert_eq!(ContentType::parse("COMMENT"), Some(ContentType::Comment));
        assert_eq!(ContentType::parse(" post "), Some(ContentType::Original));
        assert_eq!(ContentType::parse("reply"), None);
    }
}
