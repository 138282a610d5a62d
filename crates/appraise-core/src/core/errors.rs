//! Typed error types for appraise-core.

use thiserror::Error;

use crate::model::ValidationError;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by the aggregator, the submission engine and the services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A note line could not be decoded into a record.
    ///
    /// Read paths absorb this per record; it only escapes from operations that
    /// decode a single, caller-supplied line.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No review request was reachable from the given revision.
    #[error("No review request found in the history of {revision}")]
    NotFound { revision: String },

    /// A named reference does not resolve to a revision.
    #[error("Reference does not exist: {name}")]
    InvalidRef { name: String },

    /// The target is not an ancestor of the source.
    #[error("Refusing to submit a non-fast-forward review: {target} is not an ancestor of {source_ref}. First merge the target ref.")]
    NonFastForward { target: String, source_ref: String },

    /// A review request would contain no commits.
    #[error("There are no commits included in the review request: {source_ref} has nothing that {target} lacks")]
    NothingToReview { source_ref: String, target: String },

    /// A reply names a parent comment that is not part of the review.
    #[error("No comment with hash {hash} in review {revision}")]
    ParentNotFound { hash: String, revision: String },

    /// Submission attempted before the review was accepted.
    #[error("Not submitting as the review {revision} has not yet been accepted.")]
    NotAccepted { revision: String },

    /// Both merge and rebase were requested.
    #[error("Only one of --merge or --rebase is allowed.")]
    ConflictingOptions,

    /// An internal repository or serialization error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
