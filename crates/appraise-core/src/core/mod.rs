//! Service layer for appraise-core.
//!
//! Provides typed, high-level APIs for requesting, discussing, reporting on,
//! submitting and syncing reviews. Services write through a [`NoteStore`] and
//! read through the review aggregator.
//!
//! # Usage
//!
//! ```no_run
//! use appraise_core::core::CoreContext;
//! use appraise_core::repo::{detect_git_root, GitRepo};
//!
//! let root = detect_git_root(std::path::Path::new(".")).unwrap();
//! let repo = GitRepo::new(root);
//! let ctx = CoreContext::new(&repo);
//!
//! let reviews = ctx.services().reviews().list(false).unwrap();
//! ```

pub mod comments;
pub mod errors;
pub mod reports;
pub mod reviews;
pub mod sync;

pub use errors::{CoreError, CoreResult};

use crate::identity::resolve_author;
use crate::notes::{NoteStore, NotesLayout};
use crate::repo::Repository;
use crate::review::Review;

/// Context for appraise-core services.
///
/// Borrows the repository and carries the settings every service needs.
/// Create one per invocation.
pub struct CoreContext<'a> {
    repo: &'a dyn Repository,
    layout: NotesLayout,
    /// Explicit author override; see [`resolve_author`].
    author: Option<String>,
}

impl<'a> CoreContext<'a> {
    /// Context with the notes layout taken from the environment.
    #[must_use]
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self {
            repo,
            layout: NotesLayout::from_env(),
            author: None,
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: NotesLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    #[must_use]
    pub fn repo(&self) -> &'a dyn Repository {
        self.repo
    }

    #[must_use]
    pub fn layout(&self) -> &NotesLayout {
        &self.layout
    }

    #[must_use]
    pub fn store(&self) -> NoteStore<'_> {
        NoteStore::new(self.repo, &self.layout)
    }

    /// Identity recorded on new notes.
    pub fn author(&self) -> CoreResult<String> {
        Ok(resolve_author(self.author.as_deref(), self.repo)?)
    }

    /// Review at `revision`, or the one reachable from HEAD.
    pub fn review(&self, revision: Option<&str>) -> CoreResult<Review> {
        let store = self.store();
        match revision {
            Some(revision) => Review::get(&store, revision),
            None => Review::get_current(&store)?.ok_or_else(|| CoreError::NotFound {
                revision: "HEAD".to_string(),
            }),
        }
    }

    /// Facade over all services.
    #[must_use]
    pub fn services(&self) -> AppraiseServices<'_, 'a> {
        AppraiseServices { ctx: self }
    }
}

/// Facade providing all appraise service APIs.
pub struct AppraiseServices<'c, 'a> {
    ctx: &'c CoreContext<'a>,
}

impl<'c, 'a> AppraiseServices<'c, 'a> {
    /// Access review operations.
    #[must_use]
    pub fn reviews(&self) -> reviews::ReviewService<'c, 'a> {
        reviews::ReviewService::new(self.ctx)
    }

    /// Access comment operations.
    #[must_use]
    pub fn comments(&self) -> comments::CommentService<'c, 'a> {
        comments::CommentService::new(self.ctx)
    }

    /// Access CI and analysis reporting.
    #[must_use]
    pub fn reports(&self) -> reports::ReportService<'c, 'a> {
        reports::ReportService::new(self.ctx)
    }

    /// Access note replication.
    #[must_use]
    pub fn sync(&self) -> sync::SyncService<'c, 'a> {
        sync::SyncService::new(self.ctx)
    }
}
