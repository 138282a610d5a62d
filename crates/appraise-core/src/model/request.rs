//! Review request records (`reviews` namespace).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{is_zero, Record, ValidationError};

/// Anchors a review at its first revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Ref holding the code under review (e.g. `refs/heads/feature`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub review_ref: String,
    /// Ref the review is meant to land on. Required.
    #[serde(default)]
    pub target_ref: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requester: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Target revision the review was branched from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_commit: String,
    #[serde(default, rename = "v", skip_serializing_if = "is_zero")]
    pub version: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for Request {
    const KIND: &'static str = "request";

    fn version(&self) -> u32 {
        self.version
    }

    fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.target_ref.trim().is_empty() {
            return Err(ValidationError::MissingField {
                kind: Self::KIND,
                field: "targetRef",
            });
        }
        Ok(())
    }
}
