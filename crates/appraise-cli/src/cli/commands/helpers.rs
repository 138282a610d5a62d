//! Shared helpers for CLI commands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::env;

use appraise_core::core::sync::default_remote;
use appraise_core::model::timestamp;
use appraise_core::repo::{detect_git_root, GitRepo, Repository};
use appraise_core::review::{CommentThread, Review, ReviewSummary};
use appraise_core::submit::ReviewState;

/// Open the git repository containing the current directory.
pub fn open_repo() -> Result<GitRepo> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let root = detect_git_root(&cwd)
        .with_context(|| format!("Not a git repository: {}", cwd.display()))?;
    Ok(GitRepo::new(root))
}

/// The given remote, else `$APPRAISE_REMOTE`, else `origin`.
pub fn remote_or_default(remote: Option<String>) -> String {
    remote
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(default_remote)
}

/// A review summary with its lifecycle state.
#[derive(Debug, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub summary: ReviewSummary,
    pub state: ReviewState,
}

impl ReviewView {
    pub fn new(review: &Review, repo: &dyn Repository) -> Result<Self> {
        Ok(Self {
            summary: review.summary(),
            state: review.state(repo)?,
        })
    }
}

/// One comment of a thread, flattened for line-oriented output.
#[derive(Debug, Serialize)]
pub struct CommentLine {
    pub hash: String,
    pub depth: usize,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub description: String,
}

/// Flatten threads depth-first, replies after their parent.
pub fn flatten_threads(threads: &[CommentThread]) -> Vec<CommentLine> {
    fn walk(thread: &CommentThread, depth: usize, out: &mut Vec<CommentLine>) {
        let location = thread.comment.location.as_ref();
        out.push(CommentLine {
            hash: thread.hash.clone(),
            depth,
            author: thread.comment.author.clone(),
            time: thread
                .comment
                .timestamp
                .as_deref()
                .and_then(timestamp::to_datetime)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
            file: location
                .map(|l| l.path.clone())
                .filter(|path| !path.is_empty()),
            line: location.and_then(|l| l.range).map(|r| r.start_line),
            resolved: thread.comment.resolved,
            description: thread.comment.description.clone(),
        });
        for child in &thread.children {
            walk(child, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    for thread in threads {
        walk(thread, 0, &mut out);
    }
    out
}
