//! Wire records stored in git notes.
//!
//! Every note line is one JSON object. Records decode tolerantly (unknown
//! fields are kept in `extra`, a missing `v` means version 0) and encode
//! canonically on a single line with `timestamp` as the first key, so the raw
//! line order of a note equals chronological order.

pub mod analysis;
pub mod ci;
pub mod comment;
pub mod request;
pub mod timestamp;

pub use analysis::Analysis;
pub use ci::{CiState, CiStatus};
pub use comment::{content_hash, Comment, Location, Range};
pub use request::Request;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Highest record version this reader interprets.
///
/// Records with a larger `v` are decoded and left in place, but the
/// aggregator ignores them.
pub const FORMAT_VERSION: u32 = 1;

/// A note line that could not be turned into a record.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The line is not a JSON object of the expected shape.
    #[error("Malformed {kind} note: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A field the record cannot do without is absent or empty.
    #[error("{kind} note is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

/// A typed note record.
pub trait Record: Serialize + DeserializeOwned {
    /// Human-readable record kind, used in error messages.
    const KIND: &'static str;

    /// Value of the `v` field (0 when absent).
    fn version(&self) -> u32;

    /// Raw `timestamp` field, if present.
    fn timestamp(&self) -> Option<&str>;

    /// Check required fields after a successful parse.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Whether this reader understands the record's version.
    fn is_supported(&self) -> bool {
        self.version() <= FORMAT_VERSION
    }

    /// Sort key: the raw timestamp string, empty when absent.
    fn sort_key(&self) -> &str {
        self.timestamp().unwrap_or("")
    }
}

/// A decoded record together with the note line it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub line: String,
    pub record: T,
}

/// Decode one note line.
pub fn decode<T: Record>(line: &str) -> Result<T, ValidationError> {
    let record: T = serde_json::from_str(line).map_err(|source| ValidationError::Malformed {
        kind: T::KIND,
        source,
    })?;
    record.validate()?;
    Ok(record)
}

/// Encode a record as a single canonical JSON line (no trailing newline).
pub fn encode<T: Record>(record: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

/// Decode a batch of note lines, skipping any that fail validation.
pub fn decode_all<T: Record>(lines: &[String]) -> Vec<Entry<T>> {
    lines
        .iter()
        .filter_map(|line| match decode::<T>(line) {
            Ok(record) => Some(Entry {
                line: line.clone(),
                record,
            }),
            Err(e) => {
                tracing::debug!(kind = T::KIND, error = %e, "skipping invalid note line");
                None
            }
        })
        .collect()
}

/// Stable chronological sort by raw timestamp.
///
/// Equal timestamps keep their incoming order.
pub fn sort_chronologically<T: Record>(entries: &mut [Entry<T>]) {
    entries.sort_by(|a, b| a.record.sort_key().cmp(b.record.sort_key()));
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) const fn is_zero(v: &u32) -> bool {
    *v == 0
}
