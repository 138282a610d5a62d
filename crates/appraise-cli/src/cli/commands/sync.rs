//! Implementation of `appraise pull` and `push`.

use anyhow::Result;
use serde::Serialize;

use appraise_core::core::sync::SyncReport;
use appraise_core::core::CoreContext;

use crate::output::{Formatter, OutputFormat};

/// Serializable output for sync commands.
#[derive(Serialize)]
struct SyncOutput {
    action: &'static str,
    #[serde(flatten)]
    report: SyncReport,
}

/// Fetch notes from `remote` and merge them into the local notes.
#[tracing::instrument(skip(ctx))]
pub fn run_pull(ctx: &CoreContext<'_>, remote: &str, format: OutputFormat) -> Result<()> {
    let report = ctx.services().sync().pull(remote)?;
    Formatter::new(format).print(&SyncOutput {
        action: "pull",
        report,
    })
}

/// Merge in `remote`'s notes, then publish the result to it.
#[tracing::instrument(skip(ctx))]
pub fn run_push(ctx: &CoreContext<'_>, remote: &str, format: OutputFormat) -> Result<()> {
    let report = ctx.services().sync().push(remote)?;
    Formatter::new(format).print(&SyncOutput {
        action: "push",
        report,
    })
}
