//! Implementation of `appraise submit`.

use anyhow::Result;

use appraise_core::core::CoreContext;
use appraise_core::submit::SubmitOptions;

use crate::output::{Formatter, OutputFormat};

/// Submit a review to its target ref.
#[tracing::instrument(skip(ctx))]
pub fn run_submit(
    ctx: &CoreContext<'_>,
    revision: Option<&str>,
    options: SubmitOptions,
    format: OutputFormat,
) -> Result<()> {
    let outcome = ctx.services().reviews().submit(revision, &options)?;
    Formatter::new(format).print(&outcome)
}
