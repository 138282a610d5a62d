//! Implementation of `appraise ci-status` and `analysis`.

use anyhow::Result;
use serde::Serialize;

use appraise_core::core::CoreContext;
use appraise_core::model::CiState;

use crate::output::{Formatter, OutputFormat};

#[derive(Serialize)]
struct ReportOutput<'a> {
    revision: String,
    kind: &'static str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<CiState>,
}

/// Record a CI result.
#[tracing::instrument(skip(ctx))]
pub fn run_ci_status(
    ctx: &CoreContext<'_>,
    revision: Option<&str>,
    url: &str,
    agent: &str,
    status: Option<CiState>,
    format: OutputFormat,
) -> Result<()> {
    let revision = ctx
        .services()
        .reports()
        .ci_status(revision, url, agent, status)?;
    Formatter::new(format).print(&ReportOutput {
        revision,
        kind: "ci",
        url,
        agent: Some(agent),
        status,
    })
}

/// Record where analysis results live.
#[tracing::instrument(skip(ctx))]
pub fn run_analysis(
    ctx: &CoreContext<'_>,
    revision: Option<&str>,
    url: &str,
    format: OutputFormat,
) -> Result<()> {
    let revision = ctx.services().reports().analysis(revision, url)?;
    Formatter::new(format).print(&ReportOutput {
        revision,
        kind: "analysis",
        url,
        agent: None,
        status: None,
    })
}
