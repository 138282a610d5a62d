//! Pointers to externally hosted static-analysis findings (`analyses` namespace).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{is_zero, Record, ValidationError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Location of the findings document.
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "v", skip_serializing_if = "is_zero")]
    pub version: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for Analysis {
    const KIND: &'static str = "analysis";

    fn version(&self) -> u32 {
        self.version
    }

    fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingField {
                kind: Self::KIND,
                field: "url",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode;

    #[test]
    fn test_analysis_requires_url() {
        assert!(decode::<Analysis>(r#"{"timestamp":"0000000100"}"#).is_err());
        let analysis: Analysis =
            decode(r#"{"timestamp":"0000000100","url":"https://lint/42"}"#).unwrap();
        assert_eq!(analysis.url, "https://lint/42");
    }
}
