//! Discussion records (`discuss` namespace).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};

use super::{is_zero, Record};

/// Line range within a file. Only the start line is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    #[serde(default)]
    pub start_line: u32,
}

/// Where a comment points in the code under review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// A single review comment.
///
/// `parent` is the content hash of the comment being replied to. `resolved`
/// carries the author's verdict on the whole review when set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    #[serde(default, rename = "v", skip_serializing_if = "is_zero")]
    pub version: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for Comment {
    const KIND: &'static str = "comment";

    fn version(&self) -> u32 {
        self.version
    }

    fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}

/// Content hash of a note line: lowercase hex SHA-1 of its bytes.
///
/// Comments reference their parent by this value.
#[must_use]
pub fn content_hash(line: &str) -> String {
    hex::encode(Sha1::digest(line.as_bytes()))
}
