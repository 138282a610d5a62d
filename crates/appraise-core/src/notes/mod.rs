//! Append-only note storage.
//!
//! Each namespace is a git notes ref holding newline-delimited JSON records,
//! one note blob per annotated revision. Notes are only ever appended to and
//! merged; divergent copies are reconciled with [`merge`], a grow-only-set
//! union, so replicas converge regardless of replication order.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{bail, Result};

use crate::repo::Repository;

/// Default prefix of the notes refs.
pub const DEFAULT_NOTES_PREFIX: &str = "refs/notes/devtools";

/// Environment variable overriding [`DEFAULT_NOTES_PREFIX`].
pub const NOTES_PREFIX_ENV: &str = "APPRAISE_NOTES_PREFIX";

/// The four record namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Review requests.
    Reviews,
    /// CI results.
    Ci,
    /// Static-analysis pointers.
    Analyses,
    /// Comments.
    Discuss,
}

impl Namespace {
    pub const ALL: [Self; 4] = [Self::Reviews, Self::Ci, Self::Analyses, Self::Discuss];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reviews => "reviews",
            Self::Ci => "ci",
            Self::Analyses => "analyses",
            Self::Discuss => "discuss",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the namespaces live in the ref hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesLayout {
    prefix: String,
}

impl Default for NotesLayout {
    fn default() -> Self {
        Self::new(DEFAULT_NOTES_PREFIX)
    }
}

impl NotesLayout {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Layout from `APPRAISE_NOTES_PREFIX`, falling back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(NOTES_PREFIX_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(Self::default, Self::new)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Local notes ref of a namespace, e.g. `refs/notes/devtools/reviews`.
    #[must_use]
    pub fn notes_ref(&self, namespace: Namespace) -> String {
        format!("{}/{namespace}", self.prefix)
    }

    /// Remote-tracking prefix, e.g. `refs/notes/remotes/origin/devtools`.
    #[must_use]
    pub fn remote_prefix(&self, remote: &str) -> String {
        let tail = self
            .prefix
            .strip_prefix("refs/notes/")
            .unwrap_or(&self.prefix);
        format!("refs/notes/remotes/{remote}/{tail}")
    }

    /// Remote-tracking notes ref of a namespace.
    #[must_use]
    pub fn remote_notes_ref(&self, remote: &str, namespace: Namespace) -> String {
        format!("{}/{namespace}", self.remote_prefix(remote))
    }
}

/// Union of two note line sets: duplicates collapse, result sorted bytewise.
///
/// Commutative, associative and idempotent. Lines are compared verbatim, so
/// malformed records survive and only exact duplicates merge.
#[must_use]
pub fn merge(local: &[String], remote: &[String]) -> Vec<String> {
    local
        .iter()
        .chain(remote)
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Split a note blob into its non-blank lines.
#[must_use]
pub fn parse_lines(blob: &str) -> Vec<String> {
    blob.lines()
        .filter(|line| !line.trim().is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Join lines back into a note blob.
#[must_use]
pub fn render_lines(lines: &[String]) -> String {
    let mut blob = lines.join("\n");
    blob.push('\n');
    blob
}

/// Reads and writes note records through a [`Repository`].
#[derive(Clone, Copy)]
pub struct NoteStore<'a> {
    repo: &'a dyn Repository,
    layout: &'a NotesLayout,
}

impl<'a> NoteStore<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn Repository, layout: &'a NotesLayout) -> Self {
        Self { repo, layout }
    }

    #[must_use]
    pub fn repo(&self) -> &'a dyn Repository {
        self.repo
    }

    #[must_use]
    pub fn layout(&self) -> &'a NotesLayout {
        self.layout
    }

    /// Raw lines attached to `revision` in `namespace`, in stored order.
    pub fn read(&self, namespace: Namespace, revision: &str) -> Result<Vec<String>> {
        let blob = self
            .repo
            .read_note(&self.layout.notes_ref(namespace), revision)?;
        Ok(blob.as_deref().map(parse_lines).unwrap_or_default())
    }

    /// Append one record line to `revision` in `namespace`.
    pub fn append(&self, namespace: Namespace, revision: &str, line: &str) -> Result<()> {
        if line.contains('\n') || line.contains('\r') {
            bail!("Note records must be a single line");
        }
        self.repo
            .append_note(&self.layout.notes_ref(namespace), revision, line)
    }

    /// Revisions carrying a note in `namespace`.
    pub fn annotated(&self, namespace: Namespace) -> Result<Vec<String>> {
        self.repo
            .annotated_revisions(&self.layout.notes_ref(namespace))
    }

    /// Union-merge every note under `remote_ref` into the local namespace.
    ///
    /// Returns how many local notes were rewritten.
    pub fn reconcile(&self, namespace: Namespace, remote_ref: &str) -> Result<usize> {
        let local_ref = self.layout.notes_ref(namespace);
        let mut changed = 0;

        for revision in self.repo.annotated_revisions(remote_ref)? {
            let remote = self
                .repo
                .read_note(remote_ref, &revision)?
                .as_deref()
                .map(parse_lines)
                .unwrap_or_default();
            let local = self.read(namespace, &revision)?;
            let merged = merge(&local, &remote);

            if merged != local {
                self.repo
                    .write_note(&local_ref, &revision, &render_lines(&merged))?;
                changed += 1;
            }
        }

        tracing::debug!(%namespace, remote_ref, changed, "reconciled notes");
        Ok(changed)
    }
}
