//! Version-control plumbing consumed by the review core.
//!
//! The aggregator and the submission engine only talk to a [`Repository`];
//! [`GitRepo`] drives the `git` binary and [`MemoryRepo`] keeps a commit graph
//! in memory.

use anyhow::{bail, Result};

pub mod git;
pub mod memory;

pub use git::{detect_git_root, GitRepo};
pub use memory::MemoryRepo;

/// Prefix of local branch refs.
pub const BRANCH_PREFIX: &str = "refs/heads/";

pub trait Repository {
    /// Full name of the checked-out branch (e.g. `refs/heads/main`).
    fn current_branch(&self) -> Result<String>;

    /// Revision `HEAD` points at.
    fn head_revision(&self) -> Result<String>;

    /// Resolve a ref name or revision to a commit id. Fails if it does not exist.
    fn resolve_ref(&self, name: &str) -> Result<String>;

    /// Whether a ref name or revision resolves to a commit.
    fn ref_exists(&self, name: &str) -> Result<bool>;

    /// Whether `ancestor` is reachable from `descendant` (a revision is its own ancestor).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// `revision` and every commit reachable from it, newest first.
    fn ancestors(&self, revision: &str) -> Result<Vec<String>>;

    /// Commits reachable from `to` but not from `from`, oldest first.
    fn revisions_between(&self, from: &str, to: &str) -> Result<Vec<String>>;

    /// Check out `name` as the working ref.
    fn switch_to_ref(&self, name: &str) -> Result<()>;

    /// Merge `source` into the current branch.
    ///
    /// With `fast_forward_only` the branch only advances if no merge commit is
    /// needed; otherwise a merge commit is always created, using `messages` as
    /// its paragraphs.
    fn merge_ref(&self, source: &str, fast_forward_only: bool, messages: &[String]) -> Result<()>;

    /// Replay `source` onto the current branch, then advance the current branch
    /// to the result.
    fn rebase_ref(&self, source: &str) -> Result<()>;

    /// Raw note blob attached to `revision` under `notes_ref`.
    fn read_note(&self, notes_ref: &str, revision: &str) -> Result<Option<String>>;

    /// Replace the note blob attached to `revision`.
    fn write_note(&self, notes_ref: &str, revision: &str, contents: &str) -> Result<()>;

    /// Append one line to the note attached to `revision`.
    fn append_note(&self, notes_ref: &str, revision: &str, line: &str) -> Result<()>;

    /// Revisions carrying a note under `notes_ref` (empty if the ref is missing).
    fn annotated_revisions(&self, notes_ref: &str) -> Result<Vec<String>>;

    /// Identity recorded on new notes.
    fn user_email(&self) -> Result<String>;

    /// Fetch `refspec` from `remote`.
    fn fetch_notes(&self, remote: &str, refspec: &str) -> Result<()>;

    /// Commit the notes ref points at, `None` if it does not exist.
    fn notes_tip(&self, notes_ref: &str) -> Result<Option<String>>;

    /// Overwrite `notes_ref` on `remote` with the local one, provided the
    /// remote ref still points at `expected` (`None`: it must not exist).
    ///
    /// Fails without touching the remote when the lease does not hold.
    fn push_notes(&self, remote: &str, notes_ref: &str, expected: Option<&str>) -> Result<()>;
}

/// Short branch name for a full ref (`refs/heads/main` -> `main`).
#[must_use]
pub fn short_branch(name: &str) -> &str {
    name.strip_prefix(BRANCH_PREFIX).unwrap_or(name)
}

/// Full ref name for a branch (`main` -> `refs/heads/main`).
///
/// Names already under `refs/` are returned unchanged.
#[must_use]
pub fn full_branch_ref(name: &str) -> String {
    if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("{BRANCH_PREFIX}{name}")
    }
}

/// Reject ref names that could be mistaken for command-line options.
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Reference name cannot be empty");
    }

    if name.starts_with('-') {
        bail!("Reference name cannot start with '-': {name}");
    }

    if name.contains('\0') || name.contains('\n') || name.contains('\r') {
        bail!("Reference name contains invalid control characters");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ref_name_rejects_dash_prefix() {
        assert!(validate_ref_name("-bad").is_err());
        assert!(validate_ref_name("").is_err());
        assert!(validate_ref_name("a\nb").is_err());
    }

    #[test]
    fn test_validate_ref_name_accepts_normal_values() {
        assert!(validate_ref_name("refs/heads/main").is_ok());
        assert!(validate_ref_name("HEAD").is_ok());
        assert!(validate_ref_name("refs/notes/devtools/reviews").is_ok());
    }

    #[test]
    fn test_short_branch() {
        assert_eq!(short_branch("refs/heads/feature/x"), "feature/x");
        assert_eq!(short_branch("master"), "master");
        assert_eq!(full_branch_ref("feature/x"), "refs/heads/feature/x");
        assert_eq!(full_branch_ref("refs/heads/main"), "refs/heads/main");
    }
}
