//! Review aggregation.
//!
//! A [`Review`] is never stored. It is recomputed on every read by walking
//! history back to the revision carrying the review request, then gathering
//! every comment, CI result and analysis attached to the revisions between
//! that anchor and the current head of the review ref.

pub mod threads;

pub use threads::{build_forest, chronological, derive_resolved, CommentThread};

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::core::{CoreError, CoreResult};
use crate::model::{
    decode_all, sort_chronologically, Analysis, CiStatus, Comment, Entry, Record, Request,
};
use crate::notes::{Namespace, NoteStore};
use crate::repo::Repository;

/// Number of anchor-revision characters used to name a review.
pub const SHORT_REVISION_LEN: usize = 12;

/// The current state of one review, projected from its notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    /// Anchor revision: the one carrying the request.
    pub revision: String,
    pub request: Request,
    /// Revision the review ref currently points at (the anchor if the ref is gone).
    pub source: String,
    pub comments: Vec<CommentThread>,
    /// Latest status per CI agent, ordered by agent.
    pub ci_statuses: Vec<CiStatus>,
    pub analyses: Vec<Analysis>,
    /// Latest explicit verdict across all comments.
    pub resolved: Option<bool>,
}

/// Compact, display-oriented view of a review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub revision: String,
    pub review_ref: String,
    pub target_ref: String,
    pub requester: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<String>,
    pub description: String,
    pub resolved: Option<bool>,
    pub threads: usize,
    pub comments: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ci: BTreeMap<String, String>,
}

impl Review {
    /// Review whose request is the nearest one in the history of `revision`.
    #[tracing::instrument(skip(store))]
    pub fn get(store: &NoteStore<'_>, revision: &str) -> CoreResult<Self> {
        let repo = store.repo();
        if !repo.ref_exists(revision)? {
            return Err(CoreError::InvalidRef {
                name: revision.to_string(),
            });
        }
        let start = repo.resolve_ref(revision)?;
        let (anchor, request) = locate_anchor(store, &start)?;
        Self::assemble(store, anchor, request)
    }

    /// Review for the checked-out revision, or `None` if there is none.
    pub fn get_current(store: &NoteStore<'_>) -> CoreResult<Option<Self>> {
        match Self::get(store, "HEAD") {
            Ok(review) => Ok(Some(review)),
            Err(CoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn assemble(store: &NoteStore<'_>, anchor: String, request: Request) -> CoreResult<Self> {
        let repo = store.repo();
        let source = resolve_source(repo, &request, &anchor)?;
        let range = review_range(repo, &anchor, &source)?;

        let mut comments = Vec::new();
        let mut statuses = Vec::new();
        let mut analyses = Vec::new();
        for revision in &range {
            comments.extend(interpretable(decode_all::<Comment>(
                &store.read(Namespace::Discuss, revision)?,
            )));
            statuses.extend(interpretable(decode_all::<CiStatus>(
                &store.read(Namespace::Ci, revision)?,
            )));
            analyses.extend(interpretable(decode_all::<Analysis>(
                &store.read(Namespace::Analyses, revision)?,
            )));
        }

        let comments = chronological(comments);
        let resolved = derive_resolved(comments.iter().map(|(_, comment)| comment));

        tracing::debug!(
            anchor = %anchor,
            source = %source,
            revisions = range.len(),
            comments = comments.len(),
            "assembled review"
        );

        Ok(Self {
            revision: anchor,
            request,
            source,
            comments: build_forest(comments),
            ci_statuses: latest_per_agent(statuses),
            analyses: unique_analyses(analyses),
            resolved,
        })
    }

    /// First characters of the anchor revision.
    #[must_use]
    pub fn short_revision(&self) -> &str {
        self.revision
            .get(..SHORT_REVISION_LEN)
            .unwrap_or(&self.revision)
    }

    /// Look a comment up by its content hash.
    #[must_use]
    pub fn find_comment(&self, hash: &str) -> Option<&CommentThread> {
        self.comments.iter().find_map(|thread| thread.find(hash))
    }

    /// Total number of comments across all threads.
    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.comments.iter().map(CommentThread::comment_count).sum()
    }

    /// Latest status reported by `agent`.
    #[must_use]
    pub fn latest_ci(&self, agent: &str) -> Option<&CiStatus> {
        self.ci_statuses.iter().find(|status| status.agent == agent)
    }

    #[must_use]
    pub fn summary(&self) -> ReviewSummary {
        ReviewSummary {
            revision: self.revision.clone(),
            review_ref: self.request.review_ref.clone(),
            target_ref: self.request.target_ref.clone(),
            requester: self.request.requester.clone(),
            reviewers: self.request.reviewers.clone(),
            description: self.request.description.clone(),
            resolved: self.resolved,
            threads: self.comments.len(),
            comments: self.comment_count(),
            ci: self
                .ci_statuses
                .iter()
                .map(|status| {
                    let state = status
                        .status
                        .map_or_else(|| "pending".to_string(), |s| s.to_string());
                    (status.agent.clone(), state)
                })
                .collect(),
        }
    }
}

/// Every review with a request note, newest request first.
///
/// Reviews that cannot be assembled (e.g. anchored on a commit this clone
/// has not fetched) are logged and left out.
pub fn list_all(store: &NoteStore<'_>) -> CoreResult<Vec<Review>> {
    let mut reviews = Vec::new();
    for revision in store.annotated(Namespace::Reviews)? {
        let Some(request) = latest_request(store, &revision)? else {
            continue;
        };
        match Review::assemble(store, revision.clone(), request) {
            Ok(review) => reviews.push(review),
            Err(e) => {
                tracing::warn!(revision = %revision, error = %e, "skipping unreadable review");
            }
        }
    }
    reviews.sort_by(|a, b| b.request.sort_key().cmp(a.request.sort_key()));
    Ok(reviews)
}

/// Reviews that have not yet landed on their target.
pub fn list_open(store: &NoteStore<'_>) -> CoreResult<Vec<Review>> {
    let mut open = Vec::new();
    for review in list_all(store)? {
        if review.state(store.repo())? != crate::submit::ReviewState::Submitted {
            open.push(review);
        }
    }
    Ok(open)
}

fn locate_anchor(store: &NoteStore<'_>, start: &str) -> CoreResult<(String, Request)> {
    let annotated: HashSet<String> = store.annotated(Namespace::Reviews)?.into_iter().collect();

    if !annotated.is_empty() {
        for revision in store.repo().ancestors(start)? {
            if !annotated.contains(&revision) {
                continue;
            }
            if let Some(request) = latest_request(store, &revision)? {
                return Ok((revision, request));
            }
        }
    }

    Err(CoreError::NotFound {
        revision: start.to_string(),
    })
}

/// Latest interpretable request on `revision`; ties go to the later line.
fn latest_request(store: &NoteStore<'_>, revision: &str) -> CoreResult<Option<Request>> {
    let mut requests: Vec<Entry<Request>> =
        interpretable(decode_all(&store.read(Namespace::Reviews, revision)?)).collect();
    sort_chronologically(&mut requests);
    Ok(requests.pop().map(|entry| entry.record))
}

fn resolve_source(repo: &dyn Repository, request: &Request, anchor: &str) -> CoreResult<String> {
    let review_ref = request.review_ref.as_str();
    if review_ref.is_empty() {
        return Ok(anchor.to_string());
    }
    if repo.ref_exists(review_ref)? {
        Ok(repo.resolve_ref(review_ref)?)
    } else {
        tracing::debug!(review_ref, anchor, "review ref is gone, using anchor");
        Ok(anchor.to_string())
    }
}

/// The anchor followed by every revision up to the source, oldest first.
fn review_range(repo: &dyn Repository, anchor: &str, source: &str) -> CoreResult<Vec<String>> {
    let mut range = vec![anchor.to_string()];
    if source != anchor {
        range.extend(repo.revisions_between(anchor, source)?);
    }
    Ok(range)
}

fn interpretable<T: Record>(entries: Vec<Entry<T>>) -> impl Iterator<Item = Entry<T>> {
    entries.into_iter().filter(|entry| {
        let supported = entry.record.is_supported();
        if !supported {
            tracing::debug!(
                kind = T::KIND,
                version = entry.record.version(),
                "ignoring record with unsupported version"
            );
        }
        supported
    })
}

/// Keep the chronologically latest status per agent. Equal timestamps go to
/// the entry seen last.
fn latest_per_agent(mut statuses: Vec<Entry<CiStatus>>) -> Vec<CiStatus> {
    sort_chronologically(&mut statuses);
    let mut latest: BTreeMap<String, CiStatus> = BTreeMap::new();
    for entry in statuses {
        latest.insert(entry.record.agent.clone(), entry.record);
    }
    latest.into_values().collect()
}

fn unique_analyses(mut analyses: Vec<Entry<Analysis>>) -> Vec<Analysis> {
    let mut seen = HashSet::new();
    analyses.retain(|entry| seen.insert(entry.line.clone()));
    sort_chronologically(&mut analyses);
    analyses.into_iter().map(|entry| entry.record).collect()
}
