/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Translation between stored nodes and the canonical content schema.
//!
//! Records written by older clients use camelCase or `Post*`/`User*` names.
//! Everything read from the store goes through [`normalize`], so the rest of the
//! engine only ever sees canonical names.

use crate::store::{Node, META_FIELD};
use plume_protocol::{Content, ContentType};
use serde_json::Value;

/// `(canonical, legacy spellings)`
const RENAMES: &[(&str, &[&str])] = &[
    ("ContentId", &["PostId", "postId", "contentId"]),
    ("AuthorId", &["UserId", "userId", "authorId"]),
    ("ParentContentId", &["ParentPostId", "parentPostId", "parentContentId"]),
    ("Type", &["type"]),
    ("Body", &["Content", "content", "body"]),
    ("LikeCount", &["Likes", "likes"]),
    ("RetweetCount", &["Retweets", "retweets"]),
    ("CommentCount", &["Comments", "comments"]),
    ("CreatedAt", &["createdAt"]),
    ("MediaUrl", &["mediaUrl"]),
    ("MediaType", &["mediaType"]),
    ("Thumbnail", &["thumbnail"]),
    ("AuthorPublicKey", &["UserPub", "userPub"]),
    ("Signature", &["signature"]),
    ("IsDeleted", &["isDeleted"]),
];

/// Rewrites legacy attribute names to canonical ones. When both spellings are
/// present the canonical value wins and the legacy one is dropped.
pub fn normalize(mut node: Node) -> Node {
    for (canonical, legacy) in RENAMES {
        for old in *legacy {
            if let Some(v) = node.remove(*old) {
                if !node.contains_key(*canonical) {
                    node.insert(canonical.to_string(), v);
                }
            }
        }
    }
    if let Some(Value::String(ty)) = node.get("Type") {
        if let Some(parsed) = ContentType::parse(ty) {
            node.insert("Type".to_string(), Value::String(parsed.as_str().to_string()));
        }
    }
    node
}

pub fn strip_bookkeeping(mut node: Node) -> Node {
    node.remove(META_FIELD);
    node
}

/// Decodes a stored node into content. The key is authoritative for the id.
pub fn decode(key: &str, node: Node) -> Result<Content, serde_json::Error> {
    let mut node = strip_bookkeeping(normalize(node));
    node.insert("ContentId".to_string(), Value::String(key.to_string()));
    serde_json::from_value(Value::Object(node))
}

pub fn encode<T: serde::Serialize>(value: &T) -> Result<Node, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::de::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Node {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn legacy_node_is_renamed() {
        let node = normalize(obj(json!({
            "postId": "P1",
            "userId": "U1",
            "type": "comment",
            "parentPostId": "P0",
            "content": "hi",
            "isDeleted": false,
            "userPub": "pk",
        })));
        assert_eq!(node["ContentId"], "P1");
        assert_eq!(node["AuthorId"], "U1");
        assert_eq!(node["Type"], "Comment");
        assert_eq!(node["ParentContentId"], "P0");
        assert_eq!(node["Body"], "hi");
        assert_eq!(node["AuthorPublicKey"], "pk");
        assert!(node.get("postId").is_none());
        assert!(node.get("type").is_none());
    }

    #[test]
    fn canonical_name_wins_over_legacy() {
        let node = normalize(obj(json!({"Body": "new", "content": "old", "Type": "Original"})));
        assert_eq!(node["Body"], "new");
        assert!(node.get("content").is_none());
    }

    #[test]
    fn decode_strips_bookkeeping_and_uses_key() {
        let c = decode(
            "P9",
            obj(json!({
                "_": {"#": "posts/P9", ">": {"Body": 1}},
                "Type": "Original",
                "AuthorId": "U1",
                "Body": "x",
            })),
        )
        .unwrap();
        assert_eq!(c.content_id, "P9");
        assert_eq!(c.kind, ContentType::Original);
    }

    #[test]
    fn decode_rejects_unknown_type() {
        assert!(decode("P1", obj(json!({"Type": "Story"}))).is_err());
    }
}
