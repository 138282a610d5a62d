//! Continuous-integration results (`ci` namespace).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{is_zero, Record};

/// Outcome reported by a CI agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum CiState {
    Success,
    Failure,
}

impl fmt::Display for CiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// A build or test result for a revision. No `status` means still running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CiStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CiState>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agent: String,
    #[serde(default, rename = "v", skip_serializing_if = "is_zero")]
    pub version: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for CiStatus {
    const KIND: &'static str = "ci";

    fn version(&self) -> u32 {
        self.version
    }

    fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}
