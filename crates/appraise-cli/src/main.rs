//! appraise - distributed code review stored in git notes

mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use appraise_core::core::comments::CommentParams;
use appraise_core::core::reviews::RequestParams;
use appraise_core::core::CoreContext;
use appraise_core::submit::SubmitOptions;

use crate::cli::commands::helpers::{open_repo, remote_or_default};
use crate::cli::commands::{
    run_accept, run_analysis, run_ci_status, run_comment, run_list, run_pull, run_push,
    run_reject, run_request, run_show, run_submit,
};
use crate::cli::{Cli, Commands};
use crate::output::OutputFormat;

/// Filter directives, e.g. `APPRAISE_LOG=appraise_core=debug`.
const LOG_ENV: &str = "APPRAISE_LOG";

/// Set to `json` for JSON log lines.
const LOG_FORMAT_ENV: &str = "APPRAISE_LOG_FORMAT";

/// Logs go to stderr so stdout stays parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .init();
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let repo = open_repo()?;
    let ctx = CoreContext::new(&repo).with_author(cli.author);

    match cli.command {
        Commands::Request {
            target,
            source,
            reviewers,
            message,
        } => {
            let params = RequestParams {
                source,
                target: Some(target),
                reviewers: reviewers
                    .into_iter()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect(),
                description: message,
            };
            run_request(&ctx, params, format)?;
        }

        Commands::Comment {
            revision,
            message,
            parent,
            file,
            line,
        } => {
            let params = CommentParams {
                revision,
                parent,
                description: message,
                path: file,
                line,
                resolved: None,
            };
            run_comment(&ctx, params, format)?;
        }

        Commands::Accept { revision, message } => {
            run_accept(&ctx, revision.as_deref(), &message, format)?;
        }

        Commands::Reject { revision, message } => {
            run_reject(&ctx, revision.as_deref(), &message, format)?;
        }

        Commands::CiStatus {
            revision,
            url,
            agent,
            status,
        } => {
            run_ci_status(&ctx, revision.as_deref(), &url, &agent, status, format)?;
        }

        Commands::Analysis { revision, url } => {
            run_analysis(&ctx, revision.as_deref(), &url, format)?;
        }

        Commands::Show { revision } => {
            run_show(&ctx, revision.as_deref(), format)?;
        }

        Commands::List { all } => {
            run_list(&ctx, all, format)?;
        }

        Commands::Submit {
            revision,
            merge,
            rebase,
            tbr,
        } => {
            let options = SubmitOptions {
                merge,
                rebase,
                force_unresolved: tbr,
            };
            run_submit(&ctx, revision.as_deref(), options, format)?;
        }

        Commands::Pull { remote } => {
            run_pull(&ctx, &remote_or_default(remote), format)?;
        }

        Commands::Push { remote } => {
            run_push(&ctx, &remote_or_default(remote), format)?;
        }
    }

    Ok(())
}
