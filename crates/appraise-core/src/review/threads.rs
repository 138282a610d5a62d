//! Comment forest reconstruction and resolution.
//!
//! Comments point at their parent by content hash. Nodes live in an arena
//! addressed by index, with a hash -> index map for parent lookup; the public
//! tree is materialized from the arena once links are settled.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{content_hash, sort_chronologically, Comment, Entry};

/// A comment and the replies beneath it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread {
    pub hash: String,
    pub comment: Comment,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommentThread>,
}

impl CommentThread {
    /// Number of comments in this thread, including the root.
    #[must_use]
    pub fn comment_count(&self) -> usize {
        1 + self.children.iter().map(Self::comment_count).sum::<usize>()
    }

    /// Depth-first search for a comment by hash.
    #[must_use]
    pub fn find(&self, hash: &str) -> Option<&Self> {
        if self.hash == hash {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(hash))
    }
}

struct Node {
    hash: String,
    comment: Comment,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Comments with their hashes, deduplicated, in chronological order.
///
/// Equal timestamps keep the incoming (note store) order.
#[must_use]
pub fn chronological(entries: Vec<Entry<Comment>>) -> Vec<(String, Comment)> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Entry<Comment>> = entries
        .into_iter()
        .filter(|entry| seen.insert(entry.line.clone()))
        .collect();
    sort_chronologically(&mut unique);
    unique
        .into_iter()
        .map(|entry| (content_hash(&entry.line), entry.record))
        .collect()
}

/// Link comments into a forest by their `parent` hashes.
///
/// A comment whose parent is not in `comments` becomes a root, as does one
/// whose parent chain loops back onto itself. Siblings keep input order.
#[must_use]
pub fn build_forest(comments: Vec<(String, Comment)>) -> Vec<CommentThread> {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, (hash, _)) in comments.iter().enumerate() {
        index.entry(hash.clone()).or_insert(i);
    }

    let mut nodes: Vec<Node> = comments
        .into_iter()
        .map(|(hash, comment)| Node {
            hash,
            comment,
            parent: None,
            children: Vec::new(),
        })
        .collect();

    for i in 0..nodes.len() {
        nodes[i].parent = nodes[i]
            .comment
            .parent
            .as_ref()
            .and_then(|parent| index.get(parent).copied())
            .filter(|&p| p != i);
    }

    for i in 0..nodes.len() {
        if loops_back(&nodes, i) {
            nodes[i].parent = None;
        }
    }

    let mut roots = Vec::new();
    for i in 0..nodes.len() {
        match nodes[i].parent {
            Some(p) => nodes[p].children.push(i),
            None => roots.push(i),
        }
    }

    roots.into_iter().map(|i| materialize(&nodes, i)).collect()
}

fn loops_back(nodes: &[Node], start: usize) -> bool {
    let mut steps = 0;
    let mut current = nodes[start].parent;
    while let Some(i) = current {
        if i == start {
            return true;
        }
        steps += 1;
        if steps > nodes.len() {
            return false;
        }
        current = nodes[i].parent;
    }
    false
}

fn materialize(nodes: &[Node], i: usize) -> CommentThread {
    let node = &nodes[i];
    CommentThread {
        hash: node.hash.clone(),
        comment: node.comment.clone(),
        children: node
            .children
            .iter()
            .map(|&child| materialize(nodes, child))
            .collect(),
    }
}

/// The last explicit `resolved` verdict, scanning in the given order.
#[must_use]
pub fn derive_resolved<'a>(comments: impl IntoIterator<Item = &'a Comment>) -> Option<bool> {
    comments
        .into_iter()
        .filter_map(|comment| comment.resolved)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode_all;
    use pretty_assertions::assert_eq;

    fn comment(ts: &str, parent: Option<&str>, resolved: Option<bool>) -> Comment {
        Comment {
            timestamp: Some(ts.to_string()),
            author: "alice".to_string(),
            parent: parent.map(ToString::to_string),
            description: format!("at {ts}"),
            resolved,
            ..Comment::default()
        }
    }

    #[test]
    fn test_chain_and_dangling_parent() {
        let a = ("hash-a".to_string(), comment("0000000100", None, None));
        let b = ("hash-b".to_string(), comment("0000000200", Some("hash-a"), None));
        let c = ("hash-c".to_string(), comment("0000000300", Some("hash-b"), None));
        let d = ("hash-d".to_string(), comment("0000000400", Some("missing"), None));

        let forest = build_forest(vec![a, b, c, d]);
        assert_eq!(forest.len(), 2);

        let root = &forest[0];
        assert_eq!(root.hash, "hash-a");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].hash, "hash-b");
        assert_eq!(root.children[0].children[0].hash, "hash-c");
        assert_eq!(root.comment_count(), 3);

        assert_eq!(forest[1].hash, "hash-d");
        assert!(forest[1].children.is_empty());
        assert!(root.find("hash-c").is_some());
        assert!(root.find("hash-d").is_none());
    }

    #[test]
    fn test_parent_cycle_does_not_lose_comments() {
        let x = ("x".to_string(), comment("0000000100", Some("y"), None));
        let y = ("y".to_string(), comment("0000000200", Some("x"), None));
        let z = ("z".to_string(), comment("0000000300", Some("z"), None));

        let forest = build_forest(vec![x, y, z]);
        let total: usize = forest.iter().map(CommentThread::comment_count).sum();
        assert_eq!(total, 3);
        assert!(forest.iter().any(|t| t.hash == "z"));
    }

    #[test]
    fn test_hashes_link_real_note_lines() {
        let root_line = r#"{"timestamp":"0000000100","author":"a","description":"root"}"#;
        let reply_line = format!(
            r#"{{"timestamp":"0000000200","author":"b","parent":"{}","description":"reply"}}"#,
            content_hash(root_line)
        );
        let lines = vec![reply_line, root_line.to_string(), root_line.to_string()];

        let forest = build_forest(chronological(decode_all(&lines)));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].comment.description, "root");
        assert_eq!(forest[0].children[0].comment.description, "reply");
    }

    #[test]
    fn test_resolved_follows_latest_verdict() {
        let comments = [
            comment("0000000100", None, Some(true)),
            comment("0000000150", None, None),
            comment("0000000200", None, Some(false)),
        ];
        assert_eq!(derive_resolved(&comments), Some(false));
        assert_eq!(derive_resolved(&comments[..2]), Some(true));
        assert_eq!(derive_resolved(&comments[1..2]), None);
        let none: [Comment; 0] = [];
        assert_eq!(derive_resolved(&none), None);
    }
}
