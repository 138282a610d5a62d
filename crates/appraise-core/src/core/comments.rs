//! Comment service: comment, reply, accept, reject.

use crate::model::{content_hash, encode, timestamp, Comment, Location, Range};
use crate::notes::Namespace;

use super::{CoreContext, CoreError, CoreResult};

/// Parameters for a new comment.
#[derive(Debug, Clone, Default)]
pub struct CommentParams {
    /// Revision whose review is commented on; HEAD's review when unset.
    pub revision: Option<String>,
    /// Hash of the comment being replied to.
    pub parent: Option<String>,
    pub description: String,
    /// File the comment refers to.
    pub path: Option<String>,
    /// Line within `path`.
    pub line: Option<u32>,
    /// Verdict on the whole review.
    pub resolved: Option<bool>,
}

/// Result of adding a comment.
#[derive(Debug, Clone)]
pub struct CommentResult {
    /// Content hash replies use to refer to this comment.
    pub hash: String,
    /// Anchor revision of the review.
    pub revision: String,
    pub comment: Comment,
}

/// Service for comment operations.
pub struct CommentService<'c, 'a> {
    ctx: &'c CoreContext<'a>,
}

impl<'c, 'a> CommentService<'c, 'a> {
    pub(crate) fn new(ctx: &'c CoreContext<'a>) -> Self {
        Self { ctx }
    }

    /// Add a comment to a review.
    ///
    /// The comment is stored on the review's anchor and located at the
    /// review's current source revision. A parent must already be part of
    /// the review.
    pub fn add(&self, params: CommentParams) -> CoreResult<CommentResult> {
        let review = self.ctx.review(params.revision.as_deref())?;

        if let Some(parent) = &params.parent {
            if review.find_comment(parent).is_none() {
                return Err(CoreError::ParentNotFound {
                    hash: parent.clone(),
                    revision: review.revision,
                });
            }
        }

        let location = Location {
            commit: review.source.clone(),
            path: params.path.unwrap_or_default(),
            range: params.line.map(|start_line| Range { start_line }),
        };

        let comment = Comment {
            timestamp: Some(timestamp::now()),
            author: self.ctx.author()?,
            parent: params.parent,
            location: Some(location),
            description: params.description,
            resolved: params.resolved,
            ..Comment::default()
        };
        let line = encode(&comment).map_err(|e| CoreError::Internal(e.into()))?;
        self.ctx
            .store()
            .append(Namespace::Discuss, &review.revision, &line)?;

        let hash = content_hash(&line);
        tracing::debug!(anchor = %review.revision, %hash, "added comment");
        Ok(CommentResult {
            hash,
            revision: review.revision,
            comment,
        })
    }

    /// Mark a review as accepted.
    pub fn accept(&self, revision: Option<&str>, message: &str) -> CoreResult<CommentResult> {
        self.verdict(revision, message, true)
    }

    /// Mark a review as needing more work.
    pub fn reject(&self, revision: Option<&str>, message: &str) -> CoreResult<CommentResult> {
        self.verdict(revision, message, false)
    }

    fn verdict(&self, revision: Option<&str>, message: &str, resolved: bool) -> CoreResult<CommentResult> {
        self.add(CommentParams {
            revision: revision.map(ToString::to_string),
            description: message.to_string(),
            resolved: Some(resolved),
            ..CommentParams::default()
        })
    }
}
