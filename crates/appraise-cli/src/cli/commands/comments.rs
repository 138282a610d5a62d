//! Implementation of `appraise comment`, `accept` and `reject`.

use anyhow::Result;
use serde::Serialize;

use appraise_core::core::comments::{CommentParams, CommentResult};
use appraise_core::core::CoreContext;

use crate::output::{Formatter, OutputFormat};

/// Serializable output for comment commands.
#[derive(Serialize)]
struct CommentOutput {
    revision: String,
    hash: String,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<bool>,
}

impl From<CommentResult> for CommentOutput {
    fn from(result: CommentResult) -> Self {
        Self {
            revision: result.revision,
            hash: result.hash,
            author: result.comment.author,
            resolved: result.comment.resolved,
        }
    }
}

/// Comment on a review, optionally replying to another comment.
#[tracing::instrument(skip(ctx))]
pub fn run_comment(ctx: &CoreContext<'_>, params: CommentParams, format: OutputFormat) -> Result<()> {
    let result = ctx.services().comments().add(params)?;
    Formatter::new(format).print(&CommentOutput::from(result))
}

/// Accept a review.
#[tracing::instrument(skip(ctx))]
pub fn run_accept(
    ctx: &CoreContext<'_>,
    revision: Option<&str>,
    message: &str,
    format: OutputFormat,
) -> Result<()> {
    let result = ctx.services().comments().accept(revision, message)?;
    Formatter::new(format).print(&CommentOutput::from(result))
}

/// Reject a review.
#[tracing::instrument(skip(ctx))]
pub fn run_reject(
    ctx: &CoreContext<'_>,
    revision: Option<&str>,
    message: &str,
    format: OutputFormat,
) -> Result<()> {
    let result = ctx.services().comments().reject(revision, message)?;
    Formatter::new(format).print(&CommentOutput::from(result))
}
