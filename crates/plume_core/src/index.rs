/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Secondary index nodes maintained on the write path.
//!
//! Each index node is a set: its field names are content ids, `true` marks a
//! member and `null` a removed one. The bookkeeping state of each field records
//! when the member was added, which gives listings a stable write order.

use crate::store::{Node, NodeWrite, META_FIELD};
use plume_protocol::Content;
use serde_json::Value;
use std::collections::HashSet;

pub const BY_PARENT: &str = "content_by_parent";
pub const BY_AUTHOR: &str = "content_by_author";
pub const BY_TYPE: &str = "content_by_type";

fn member(id: &str, present: bool) -> Node {
    let mut node = Node::new();
    node.insert(
        id.to_string(),
        if present { Value::Bool(true) } else { Value::Null },
    );
    node
}

fn parent_of(content: &Content) -> Option<&str> {
    content
        .parent_content_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

/// Index writes that register `content` everywhere it belongs.
pub fn memberships(content: &Content) -> Vec<NodeWrite> {
    let id = content.content_id.as_str();
    let mut writes = vec![
        NodeWrite::new(BY_AUTHOR, &content.author_id, member(id, true)),
        NodeWrite::new(BY_TYPE, content.kind.as_str(), member(id, true)),
    ];
    if let Some(parent) = parent_of(content) {
        writes.push(NodeWrite::new(BY_PARENT, parent, member(id, true)));
    }
    writes
}

/// Index writes that follow an update changing author or parent.
pub fn moves(before: &Content, after: &Content) -> Vec<NodeWrite> {
    let id = after.content_id.as_str();
    let mut writes = Vec::new();
    if before.author_id != after.author_id {
        writes.push(NodeWrite::new(BY_AUTHOR, &before.author_id, member(id, false)));
        writes.push(NodeWrite::new(BY_AUTHOR, &after.author_id, member(id, true)));
    }
    let (old_parent, new_parent) = (parent_of(before), parent_of(after));
    if old_parent != new_parent {
        if let Some(p) = old_parent {
            writes.push(NodeWrite::new(BY_PARENT, p, member(id, false)));
        }
        if let Some(p) = new_parent {
            writes.push(NodeWrite::new(BY_PARENT, p, member(id, true)));
        }
    }
    writes
}

/// Live members of an index node with the time each was added.
pub fn members(node: &Node) -> Vec<(String, i64)> {
    let states = node
        .get(META_FIELD)
        .and_then(|m| m.get(">"))
        .and_then(|s| s.as_object());
    node.iter()
        .filter(|(k, v)| k.as_str() != META_FIELD && v.as_bool() == Some(true))
        .map(|(k, _)| {
            let at = states
                .and_then(|s| s.get(k))
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            (k.clone(), at)
        })
        .collect()
}

/// Merges member lists from several nodes into one id list ordered by add time.
pub fn ordered_ids(mut members: Vec<(String, i64)>) -> Vec<String> {
    members.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|(id, _)| seen.insert(id.clone()))
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::merge_node;
    use plume_protocol::ContentType;
    use serde_json::json;

    fn comment(id: &str, author: &str, parent: &str) -> Content {
        serde_json::from_value(json!({
            "ContentId": id,
            "AuthorId": author,
            "ParentContentId": parent,
            "Type": "Comment",
        }))
        .unwrap()
    }

    #[test]
    fn comment_is_indexed_by_author_type_and_parent() {
        let writes = memberships(&comment("C1", "U1", "P1"));
        let targets: Vec<(&str, &str)> = writes
            .iter()
            .map(|w| (w.collection.as_str(), w.key.as_str()))
            .collect();
        assert_eq!(
            targets,
            vec![(BY_AUTHOR, "U1"), (BY_TYPE, ContentType::Comment.as_str()), (BY_PARENT, "P1")]
        );
        assert!(writes.iter().all(|w| w.value["C1"] == true));
    }

    #[test]
    fn moving_author_clears_old_membership() {
        let before = comment("C1", "U1", "P1");
        let mut after = before.clone();
        after.author_id = "U2".into();
        let writes = moves(&before, &after);
        assert_eq!(writes.len(), 2);
        assert!(writes[0].value["C1"].is_null());
        assert_eq!(writes[1].key, "U2");
        assert!(moves(&before, &before).is_empty());
    }

    #[test]
    fn members_skip_removed_and_order_by_add_time() {
        let n = merge_node(None, &json!({"b": true}).as_object().cloned().unwrap(), BY_TYPE, "t", 5);
        let n = merge_node(Some(n), &json!({"a": true}).as_object().cloned().unwrap(), BY_TYPE, "t", 9);
        let n = merge_node(Some(n), &json!({"c": null}).as_object().cloned().unwrap(), BY_TYPE, "t", 9);
        let ids = ordered_ids(members(&n));
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }
}
