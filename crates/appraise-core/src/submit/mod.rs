//! Submission engine.
//!
//! Folds an accepted review back into its target ref. Every precondition is
//! checked before the working ref is touched; once mutation starts a failure
//! short-circuits without rollback.

use std::fmt;

use serde::Serialize;

use crate::core::{CoreError, CoreResult};
use crate::repo::Repository;
use crate::review::Review;

/// Lifecycle of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    Open,
    Accepted,
    Submitted,
}

impl ReviewState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Accepted => "accepted",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the source is folded into the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitMode {
    Merge,
    Rebase,
    #[default]
    FastForward,
}

impl SubmitMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Rebase => "rebase",
            Self::FastForward => "fast-forward",
        }
    }
}

impl fmt::Display for SubmitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-selected submission options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub merge: bool,
    pub rebase: bool,
    /// Submit even if the review has not been accepted.
    pub force_unresolved: bool,
}

impl SubmitOptions {
    /// The selected mode. Merge and rebase are mutually exclusive.
    pub fn mode(&self) -> CoreResult<SubmitMode> {
        match (self.merge, self.rebase) {
            (true, true) => Err(CoreError::ConflictingOptions),
            (true, false) => Ok(SubmitMode::Merge),
            (false, true) => Ok(SubmitMode::Rebase),
            (false, false) => Ok(SubmitMode::FastForward),
        }
    }
}

/// What a successful submission did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub mode: SubmitMode,
    pub target_ref: String,
    /// Revision the target points at afterwards.
    pub target_revision: String,
}

impl Review {
    /// Ref holding the code under review; the anchor itself when unset.
    #[must_use]
    pub fn source_ref(&self) -> &str {
        if self.request.review_ref.is_empty() {
            &self.revision
        } else {
            &self.request.review_ref
        }
    }

    /// Where the review sits in its lifecycle.
    pub fn state(&self, repo: &dyn Repository) -> CoreResult<ReviewState> {
        let target = self.request.target_ref.as_str();
        if !target.is_empty()
            && repo.ref_exists(target)?
            && repo.is_ancestor(&self.source, target)?
        {
            return Ok(ReviewState::Submitted);
        }
        if self.resolved == Some(true) {
            Ok(ReviewState::Accepted)
        } else {
            Ok(ReviewState::Open)
        }
    }
}

/// Fold `review` into its target ref.
pub fn submit(
    repo: &dyn Repository,
    review: &Review,
    options: &SubmitOptions,
) -> CoreResult<SubmitOutcome> {
    let mode = options.mode()?;

    if !options.force_unresolved && review.resolved != Some(true) {
        return Err(CoreError::NotAccepted {
            revision: review.revision.clone(),
        });
    }

    let target = review.request.target_ref.as_str();
    let source = review.source_ref();
    for name in [target, source] {
        if name.is_empty() || !repo.ref_exists(name)? {
            return Err(CoreError::InvalidRef {
                name: name.to_string(),
            });
        }
    }

    if !repo.is_ancestor(target, source)? {
        return Err(CoreError::NonFastForward {
            target: target.to_string(),
            source_ref: source.to_string(),
        });
    }

    tracing::info!(target_ref = target, source, %mode, anchor = %review.revision, "submitting review");
    repo.switch_to_ref(target)?;

    match mode {
        SubmitMode::Merge => {
            let mut messages = vec![format!("Submitting review {}", review.short_revision())];
            if !review.request.description.is_empty() {
                messages.push(review.request.description.clone());
            }
            repo.merge_ref(source, false, &messages)?;
        }
        SubmitMode::Rebase => repo.rebase_ref(source)?,
        SubmitMode::FastForward => repo.merge_ref(source, true, &[])?,
    }

    let target_revision = repo.resolve_ref(target)?;
    tracing::info!(target_ref = target, revision = %target_revision, "submitted review");

    Ok(SubmitOutcome {
        mode,
        target_ref: target.to_string(),
        target_revision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{encode, Comment, Request};
    use crate::notes::{Namespace, NoteStore, NotesLayout};
    use crate::repo::MemoryRepo;
    use pretty_assertions::assert_eq;

    struct Fixture {
        repo: MemoryRepo,
        layout: NotesLayout,
        base: String,
        r1: String,
    }

    impl Fixture {
        /// master: base; feature: base -> r1, with a request on r1.
        fn new() -> Self {
            let repo = MemoryRepo::new("alice@example.com");
            let base = repo.commit("master", "base");
            repo.set_branch("feature", &base).unwrap();
            let r1 = repo.commit("feature", "r1");
            let layout = NotesLayout::default();

            let request = Request {
                timestamp: Some("0000000100".to_string()),
                review_ref: "refs/heads/feature".to_string(),
                target_ref: "refs/heads/master".to_string(),
                requester: "alice@example.com".to_string(),
                description: "fix bug".to_string(),
                ..Request::default()
            };
            NoteStore::new(&repo, &layout)
                .append(Namespace::Reviews, &r1, &encode(&request).unwrap())
                .unwrap();

            Self {
                repo,
                layout,
                base,
                r1,
            }
        }

        fn store(&self) -> NoteStore<'_> {
            NoteStore::new(&self.repo, &self.layout)
        }

        fn resolve(&self, ts: &str, resolved: bool) {
            let comment = Comment {
                timestamp: Some(ts.to_string()),
                author: "bob@example.com".to_string(),
                resolved: Some(resolved),
                ..Comment::default()
            };
            self.store()
                .append(Namespace::Discuss, &self.r1, &encode(&comment).unwrap())
                .unwrap();
        }

        fn review(&self) -> Review {
            Review::get(&self.store(), "feature").unwrap()
        }

        fn master(&self) -> String {
            self.repo.resolve_ref("master").unwrap()
        }
    }

    #[test]
    fn test_merge_creates_submission_commit() {
        let f = Fixture::new();
        f.resolve("0000000200", true);
        let review = f.review();
        assert_eq!(review.state(&f.repo).unwrap(), ReviewState::Accepted);

        let options = SubmitOptions {
            merge: true,
            ..SubmitOptions::default()
        };
        let outcome = submit(&f.repo, &review, &options).unwrap();

        let head = f.master();
        assert_eq!(outcome.mode, SubmitMode::Merge);
        assert_eq!(outcome.target_revision, head);
        assert_eq!(f.repo.parents(&head), vec![f.base.clone(), f.r1.clone()]);
        assert_eq!(
            f.repo.commit_message(&head).unwrap(),
            format!("Submitting review {}\n\nfix bug", &f.r1[..12])
        );
        assert_eq!(f.repo.current_branch().unwrap(), "refs/heads/master");
        assert_eq!(review.state(&f.repo).unwrap(), ReviewState::Submitted);
    }

    #[test]
    fn test_diverged_target_is_refused_and_untouched() {
        let f = Fixture::new();
        f.resolve("0000000200", true);
        let m1 = f.repo.commit("master", "m1");

        let err = submit(&f.repo, &f.review(), &SubmitOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::NonFastForward { .. }));
        assert_eq!(f.master(), m1);
    }

    #[test]
    fn test_fast_forward_gate_ignores_force() {
        let f = Fixture::new();
        f.repo.commit("master", "m1");
        let options = SubmitOptions {
            merge: true,
            force_unresolved: true,
            ..SubmitOptions::default()
        };
        let err = submit(&f.repo, &f.review(), &options).unwrap_err();
        assert!(matches!(err, CoreError::NonFastForward { .. }));
    }

    #[test]
    fn test_merge_and_rebase_conflict() {
        let f = Fixture::new();
        f.resolve("0000000200", true);
        let options = SubmitOptions {
            merge: true,
            rebase: true,
            force_unresolved: false,
        };
        let err = submit(&f.repo, &f.review(), &options).unwrap_err();
        assert!(matches!(err, CoreError::ConflictingOptions));
        assert_eq!(f.master(), f.base);
    }

    #[test]
    fn test_unaccepted_review_needs_force() {
        let f = Fixture::new();
        let err = submit(&f.repo, &f.review(), &SubmitOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::NotAccepted { .. }));

        f.resolve("0000000200", true);
        f.resolve("0000000300", false);
        let review = f.review();
        assert_eq!(review.state(&f.repo).unwrap(), ReviewState::Open);
        assert!(matches!(
            submit(&f.repo, &review, &SubmitOptions::default()).unwrap_err(),
            CoreError::NotAccepted { .. }
        ));

        let forced = SubmitOptions {
            force_unresolved: true,
            ..SubmitOptions::default()
        };
        let outcome = submit(&f.repo, &review, &forced).unwrap();
        assert_eq!(outcome.target_revision, f.r1);
    }

    #[test]
    fn test_fast_forward_by_default() {
        let f = Fixture::new();
        f.resolve("0000000200", true);
        let outcome = submit(&f.repo, &f.review(), &SubmitOptions::default()).unwrap();
        assert_eq!(outcome.mode, SubmitMode::FastForward);
        assert_eq!(f.master(), f.r1);
    }

    #[test]
    fn test_rebase_advances_target() {
        let f = Fixture::new();
        f.resolve("0000000200", true);
        let r2 = f.repo.commit("feature", "r2");
        let options = SubmitOptions {
            rebase: true,
            ..SubmitOptions::default()
        };
        let outcome = submit(&f.repo, &f.review(), &options).unwrap();
        assert_eq!(outcome.mode, SubmitMode::Rebase);
        assert_eq!(f.master(), r2);
    }

    #[test]
    fn test_missing_source_ref_is_invalid() {
        let f = Fixture::new();
        f.resolve("0000000200", true);
        let mut review = f.review();
        review.request.review_ref = "refs/heads/gone".to_string();
        let err = submit(&f.repo, &review, &SubmitOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRef { name } if name == "refs/heads/gone"));
    }
}
