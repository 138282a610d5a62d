//! Implementation of `appraise request`, `show` and `list`.

use anyhow::Result;
use serde::Serialize;

use appraise_core::core::reviews::RequestParams;
use appraise_core::core::CoreContext;
use appraise_core::model::{Analysis, CiStatus, Request};
use appraise_core::review::Review;

use crate::cli::commands::helpers::{flatten_threads, CommentLine, ReviewView};
use crate::output::{Formatter, OutputFormat};

/// Serializable output for the request command.
#[derive(Serialize)]
struct RequestOutput {
    revision: String,
    review_ref: String,
    target_ref: String,
    base_commit: String,
    requester: String,
}

/// Full review detail for `show --json`.
#[derive(Serialize)]
struct ReviewDetail<'a> {
    #[serde(flatten)]
    view: ReviewView,
    source: &'a str,
    request: &'a Request,
    discussion: Vec<CommentLine>,
    ci_statuses: &'a [CiStatus],
    analyses: &'a [Analysis],
}

/// Request a review.
#[tracing::instrument(skip(ctx))]
pub fn run_request(ctx: &CoreContext<'_>, params: RequestParams, format: OutputFormat) -> Result<()> {
    let result = ctx.services().reviews().request(params)?;

    let output = RequestOutput {
        revision: result.revision,
        review_ref: result.request.review_ref,
        target_ref: result.request.target_ref,
        base_commit: result.request.base_commit,
        requester: result.request.requester,
    };
    Formatter::new(format).print(&output)
}

/// Show one review: summary first, then every comment.
#[tracing::instrument(skip(ctx))]
pub fn run_show(ctx: &CoreContext<'_>, revision: Option<&str>, format: OutputFormat) -> Result<()> {
    let review = ctx.services().reviews().get(revision)?;
    let view = ReviewView::new(&review, ctx.repo())?;
    let formatter = Formatter::new(format);

    match format {
        OutputFormat::Json => formatter.print(&detail(&review, view)),
        OutputFormat::Text => {
            formatter.print(&view)?;
            let comments = flatten_threads(&review.comments);
            if !comments.is_empty() {
                formatter.print(&comments)?;
            }
            Ok(())
        }
    }
}

fn detail(review: &Review, view: ReviewView) -> ReviewDetail<'_> {
    ReviewDetail {
        view,
        source: &review.source,
        request: &review.request,
        discussion: flatten_threads(&review.comments),
        ci_statuses: &review.ci_statuses,
        analyses: &review.analyses,
    }
}

/// List open reviews, or all of them.
#[tracing::instrument(skip(ctx))]
pub fn run_list(ctx: &CoreContext<'_>, all: bool, format: OutputFormat) -> Result<()> {
    let reviews = ctx.services().reviews().list(all)?;
    let views = reviews
        .iter()
        .map(|review| ReviewView::new(review, ctx.repo()))
        .collect::<Result<Vec<_>>>()?;

    let empty_msg = if all { "No reviews yet" } else { "No open reviews" };
    Formatter::new(format).print_list(&views, empty_msg, "reviews")
}
