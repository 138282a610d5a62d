//! Review service: request, show, list, submit.

use crate::model::{encode, timestamp, Request};
use crate::notes::Namespace;
use crate::repo::full_branch_ref;
use crate::review::{list_all, list_open, Review};
use crate::submit::{submit, ReviewState, SubmitOptions, SubmitOutcome};

use super::{CoreContext, CoreError, CoreResult};

/// Target ref used when none is given.
pub const DEFAULT_TARGET_REF: &str = "refs/heads/master";

/// Parameters for a new review request.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Ref holding the changes; the current branch when unset.
    pub source: Option<String>,
    /// Ref the changes should land on; [`DEFAULT_TARGET_REF`] when unset.
    pub target: Option<String>,
    pub reviewers: Vec<String>,
    pub description: String,
}

/// Result of requesting a review.
#[derive(Debug, Clone)]
pub struct RequestResult {
    /// Anchor revision the request was attached to.
    pub revision: String,
    pub request: Request,
}

/// Service for review operations.
pub struct ReviewService<'c, 'a> {
    ctx: &'c CoreContext<'a>,
}

impl<'c, 'a> ReviewService<'c, 'a> {
    pub(crate) fn new(ctx: &'c CoreContext<'a>) -> Self {
        Self { ctx }
    }

    /// Request a review of `source` against `target`.
    ///
    /// The request is attached to the oldest commit of `target..source`.
    pub fn request(&self, params: RequestParams) -> CoreResult<RequestResult> {
        let repo = self.ctx.repo();
        let source = match params.source {
            Some(source) => full_branch_ref(&source),
            None => repo.current_branch()?,
        };
        let target = full_branch_ref(params.target.as_deref().unwrap_or(DEFAULT_TARGET_REF));

        for name in [&target, &source] {
            if !repo.ref_exists(name)? {
                return Err(CoreError::InvalidRef { name: name.clone() });
            }
        }

        let commits = repo.revisions_between(&target, &source)?;
        let Some(anchor) = commits.first().cloned() else {
            return Err(CoreError::NothingToReview {
                source_ref: source,
                target,
            });
        };

        let request = Request {
            timestamp: Some(timestamp::now()),
            review_ref: source,
            base_commit: repo.resolve_ref(&target)?,
            target_ref: target,
            requester: self.ctx.author()?,
            reviewers: params.reviewers,
            description: params.description,
            ..Request::default()
        };
        let line = encode(&request).map_err(|e| CoreError::Internal(e.into()))?;
        self.ctx.store().append(Namespace::Reviews, &anchor, &line)?;

        tracing::info!(anchor = %anchor, review_ref = %request.review_ref, "requested review");
        Ok(RequestResult {
            revision: anchor,
            request,
        })
    }

    /// Review at `revision`, or the one reachable from HEAD.
    pub fn get(&self, revision: Option<&str>) -> CoreResult<Review> {
        self.ctx.review(revision)
    }

    /// Open reviews, or every review with `all`.
    pub fn list(&self, all: bool) -> CoreResult<Vec<Review>> {
        let store = self.ctx.store();
        if all {
            list_all(&store)
        } else {
            list_open(&store)
        }
    }

    pub fn state(&self, review: &Review) -> CoreResult<ReviewState> {
        review.state(self.ctx.repo())
    }

    /// Submit the review at `revision` (or HEAD's review) to its target.
    pub fn submit(&self, revision: Option<&str>, options: &SubmitOptions) -> CoreResult<SubmitOutcome> {
        let review = self.ctx.review(revision)?;
        submit(self.ctx.repo(), &review, options)
    }
}
