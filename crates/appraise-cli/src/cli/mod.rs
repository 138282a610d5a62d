//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};

use appraise_core::model::CiState;

pub mod commands;

/// Distributed code review stored in git notes
#[derive(Parser, Debug)]
#[command(name = "appraise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Override author identity (default: $APPRAISE_AUTHOR or git user.email)
    #[arg(long, global = true)]
    pub author: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Request a review of the current branch
    Request {
        /// Ref the changes should land on
        #[arg(long, default_value = "master")]
        target: String,

        /// Ref holding the changes (default: current branch)
        #[arg(long)]
        source: Option<String>,

        /// Comma-separated list of reviewers
        #[arg(long, value_delimiter = ',')]
        reviewers: Vec<String>,

        /// Description of the change
        #[arg(short = 'm', long = "message", default_value = "")]
        message: String,
    },

    /// Comment on a review
    Comment {
        /// Revision in the review's history (default: HEAD)
        #[arg(long)]
        revision: Option<String>,

        /// Comment text
        #[arg(short = 'm', long = "message", default_value = "")]
        message: String,

        /// Hash of the comment being replied to
        #[arg(short = 'p', long)]
        parent: Option<String>,

        /// File the comment refers to
        #[arg(short = 'f', long)]
        file: Option<String>,

        /// Line within --file
        #[arg(short = 'l', long, requires = "file")]
        line: Option<u32>,
    },

    /// Accept a review
    Accept {
        /// Revision in the review's history (default: HEAD)
        revision: Option<String>,

        /// Comment text
        #[arg(short = 'm', long = "message", default_value = "")]
        message: String,
    },

    /// Reject a review
    Reject {
        /// Revision in the review's history (default: HEAD)
        revision: Option<String>,

        /// Reason for rejecting
        #[arg(short = 'm', long = "message", default_value = "")]
        message: String,
    },

    /// Record a CI result for a revision
    CiStatus {
        /// Revision that was built (default: HEAD)
        #[arg(long)]
        revision: Option<String>,

        /// Link to the build
        #[arg(long)]
        url: String,

        /// Name of the CI agent
        #[arg(long)]
        agent: String,

        /// Build result (omit while pending)
        #[arg(long, value_enum)]
        status: Option<CiState>,
    },

    /// Record where static-analysis results for a revision live
    Analysis {
        /// Revision that was analyzed (default: HEAD)
        #[arg(long)]
        revision: Option<String>,

        /// Link to the results
        #[arg(long)]
        url: String,
    },

    /// Show a review
    Show {
        /// Revision in the review's history (default: HEAD)
        revision: Option<String>,
    },

    /// List reviews
    List {
        /// Include submitted reviews
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// Submit an accepted review to its target ref
    Submit {
        /// Revision in the review's history (default: HEAD)
        revision: Option<String>,

        /// Create a merge commit
        #[arg(long)]
        merge: bool,

        /// Rebase the review onto the target
        #[arg(long)]
        rebase: bool,

        /// Submit even if the review has not been accepted ("to be reviewed")
        #[arg(long)]
        tbr: bool,
    },

    /// Fetch and merge review notes from a remote
    Pull {
        /// Remote name (default: $APPRAISE_REMOTE or origin)
        remote: Option<String>,
    },

    /// Push review notes to a remote
    Push {
        /// Remote name (default: $APPRAISE_REMOTE or origin)
        remote: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_merge_and_rebase_both_parse() {
        let cli = Cli::try_parse_from(["appraise", "submit", "--merge", "--rebase"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Submit {
                merge: true,
                rebase: true,
                ..
            }
        ));
    }

    #[test]
    fn test_reviewers_split_on_commas() {
        let cli = Cli::try_parse_from(["appraise", "request", "--reviewers", "a@x,b@x"]).unwrap();
        match cli.command {
            Commands::Request { reviewers, target, .. } => {
                assert_eq!(reviewers, vec!["a@x".to_string(), "b@x".to_string()]);
                assert_eq!(target, "master");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_line_requires_file() {
        assert!(Cli::try_parse_from(["appraise", "comment", "--line", "3"]).is_err());
    }
}
