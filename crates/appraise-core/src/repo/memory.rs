//! In-memory implementation of [`Repository`].
//!
//! Holds a commit graph, refs and notes behind a `RwLock`. Nothing touches the
//! filesystem, which makes it the backend of choice for exercising the
//! aggregator and the submission engine. Remotes are other `MemoryRepo`s.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Context, Result};
use sha1::{Digest, Sha1};

use crate::repo::{Repository, BRANCH_PREFIX};

#[derive(Debug, Clone)]
struct Commit {
    parents: Vec<String>,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    commits: HashMap<String, Commit>,
    refs: BTreeMap<String, String>,
    /// Full name of the checked-out branch.
    head: String,
    /// notes ref -> annotated revision -> blob
    notes: HashMap<String, BTreeMap<String, String>>,
    remotes: HashMap<String, Arc<MemoryRepo>>,
    email: String,
    counter: u64,
}

impl State {
    fn full_ref(name: &str) -> String {
        if name.starts_with("refs/") || name == "HEAD" {
            name.to_string()
        } else {
            format!("{BRANCH_PREFIX}{name}")
        }
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if name == "HEAD" {
            return self.refs.get(&self.head).cloned();
        }
        if let Some(rev) = self.refs.get(name) {
            return Some(rev.clone());
        }
        if let Some(rev) = self.refs.get(&Self::full_ref(name)) {
            return Some(rev.clone());
        }
        self.commits.contains_key(name).then(|| name.to_string())
    }

    fn resolve_or_err(&self, name: &str) -> Result<String> {
        self.resolve(name)
            .ok_or_else(|| anyhow!("Failed to resolve reference {name}"))
    }

    /// Every commit reachable from `revision`, each listed before its parents.
    fn ancestors(&self, revision: &str) -> Vec<String> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(revision.to_string(), false)];

        while let Some((rev, expanded)) = stack.pop() {
            if expanded {
                order.push(rev);
                continue;
            }
            if !visited.insert(rev.clone()) {
                continue;
            }
            stack.push((rev.clone(), true));
            if let Some(commit) = self.commits.get(&rev) {
                for parent in commit.parents.iter().rev() {
                    if !visited.contains(parent) {
                        stack.push((parent.clone(), false));
                    }
                }
            }
        }

        order.reverse();
        order
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.ancestors(descendant).iter().any(|rev| rev == ancestor)
    }

    fn new_commit(&mut self, parents: Vec<String>, message: &str) -> String {
        self.counter += 1;
        let mut hasher = Sha1::new();
        for parent in &parents {
            hasher.update(parent.as_bytes());
        }
        hasher.update(message.as_bytes());
        hasher.update(self.counter.to_le_bytes());
        let id = hex::encode(hasher.finalize());

        self.commits.insert(
            id.clone(),
            Commit {
                parents,
                message: message.to_string(),
            },
        );
        id
    }

    /// Content address of a notes ref, standing in for its commit id.
    fn notes_tip(&self, notes_ref: &str) -> Option<String> {
        let notes = self.notes.get(notes_ref)?;
        let mut hasher = Sha1::new();
        for (revision, blob) in notes {
            hasher.update(revision.as_bytes());
            hasher.update(b"\0");
            hasher.update(blob.as_bytes());
            hasher.update(b"\0");
        }
        Some(hex::encode(hasher.finalize()))
    }

    fn head_revision(&self) -> Result<String> {
        self.refs
            .get(&self.head)
            .cloned()
            .with_context(|| format!("Branch {} has no commits", self.head))
    }
}

/// In-memory repository.
#[derive(Debug)]
pub struct MemoryRepo {
    state: RwLock<State>,
}

impl MemoryRepo {
    /// Empty repository with `master` checked out and no commits.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(State {
                head: format!("{BRANCH_PREFIX}master"),
                email: email.into(),
                ..State::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add a commit on top of `branch` (creating the branch if needed) and
    /// return its id.
    pub fn commit(&self, branch: &str, message: &str) -> String {
        let mut state = self.write();
        let name = State::full_ref(branch);
        let parents = state.refs.get(&name).cloned().into_iter().collect();
        let id = state.new_commit(parents, message);
        state.refs.insert(name, id.clone());
        id
    }

    /// Point `branch` at `revision`.
    pub fn set_branch(&self, branch: &str, revision: &str) -> Result<()> {
        let mut state = self.write();
        let target = state.resolve_or_err(revision)?;
        state.refs.insert(State::full_ref(branch), target);
        Ok(())
    }

    /// Delete a ref.
    pub fn delete_ref(&self, name: &str) {
        let mut state = self.write();
        state.refs.remove(&State::full_ref(name));
    }

    /// Register another in-memory repository as a remote.
    pub fn add_remote(&self, name: &str, remote: Arc<Self>) {
        self.write().remotes.insert(name.to_string(), remote);
    }

    #[must_use]
    pub fn commit_message(&self, revision: &str) -> Option<String> {
        self.read().commits.get(revision).map(|c| c.message.clone())
    }

    #[must_use]
    pub fn parents(&self, revision: &str) -> Vec<String> {
        self.read()
            .commits
            .get(revision)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    fn remote(&self, name: &str) -> Result<Arc<Self>> {
        self.read()
            .remotes
            .get(name)
            .cloned()
            .with_context(|| format!("No such remote: {name}"))
    }

    fn notes_matching(&self, pattern: &str) -> Vec<(String, BTreeMap<String, String>)> {
        let state = self.read();
        state
            .notes
            .iter()
            .filter_map(|(name, notes)| {
                refspec_match(pattern, name).map(|suffix| (suffix, notes.clone()))
            })
            .collect()
    }

    fn store_notes(&self, pattern: &str, matched: Vec<(String, BTreeMap<String, String>)>) {
        let mut state = self.write();
        for (suffix, notes) in matched {
            state.notes.insert(pattern.replace('*', &suffix), notes);
        }
    }
}

/// Match `name` against a refspec side with at most one `*`, returning the
/// part matched by the wildcard (empty for an exact match).
fn refspec_match(pattern: &str, name: &str) -> Option<String> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .map(ToString::to_string),
        None => (pattern == name).then(String::new),
    }
}

fn split_refspec(refspec: &str) -> Result<(&str, &str)> {
    refspec
        .trim_start_matches('+')
        .split_once(':')
        .with_context(|| format!("Refspec must have the form <src>:<dst>: {refspec}"))
}

impl Repository for MemoryRepo {
    fn current_branch(&self) -> Result<String> {
        Ok(self.read().head.clone())
    }

    fn head_revision(&self) -> Result<String> {
        self.read().head_revision()
    }

    fn resolve_ref(&self, name: &str) -> Result<String> {
        self.read().resolve_or_err(name)
    }

    fn ref_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read().resolve(name).is_some())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let state = self.read();
        let ancestor = state.resolve_or_err(ancestor)?;
        let descendant = state.resolve_or_err(descendant)?;
        Ok(state.is_ancestor(&ancestor, &descendant))
    }

    fn ancestors(&self, revision: &str) -> Result<Vec<String>> {
        let state = self.read();
        let revision = state.resolve_or_err(revision)?;
        Ok(state.ancestors(&revision))
    }

    fn revisions_between(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let state = self.read();
        let from = state.resolve_or_err(from)?;
        let to = state.resolve_or_err(to)?;
        let excluded: HashSet<String> = state.ancestors(&from).into_iter().collect();
        let mut between: Vec<String> = state
            .ancestors(&to)
            .into_iter()
            .filter(|rev| !excluded.contains(rev))
            .collect();
        between.reverse();
        Ok(between)
    }

    fn switch_to_ref(&self, name: &str) -> Result<()> {
        let mut state = self.write();
        let full = State::full_ref(name);
        if !state.refs.contains_key(&full) {
            bail!("Failed to check out {name}: no such branch");
        }
        state.head = full;
        Ok(())
    }

    fn merge_ref(&self, source: &str, fast_forward_only: bool, messages: &[String]) -> Result<()> {
        let mut state = self.write();
        let current = state.head_revision()?;
        let source_rev = state.resolve_or_err(source)?;

        if state.is_ancestor(&source_rev, &current) {
            return Ok(());
        }

        let merged = if state.is_ancestor(&current, &source_rev) && fast_forward_only {
            source_rev
        } else if fast_forward_only {
            bail!("Failed to merge {source}: not possible to fast-forward");
        } else {
            let message = if messages.is_empty() {
                format!("Merge {source}")
            } else {
                messages.join("\n\n")
            };
            state.new_commit(vec![current, source_rev], &message)
        };

        let head = state.head.clone();
        state.refs.insert(head, merged);
        Ok(())
    }

    fn rebase_ref(&self, source: &str) -> Result<()> {
        let mut state = self.write();
        let current = state.head_revision()?;
        let source_rev = state.resolve_or_err(source)?;

        let tip = if state.is_ancestor(&current, &source_rev) {
            source_rev
        } else {
            let excluded: HashSet<String> = state.ancestors(&current).into_iter().collect();
            let mut replay: Vec<String> = state
                .ancestors(&source_rev)
                .into_iter()
                .filter(|rev| !excluded.contains(rev))
                .collect();
            replay.reverse();

            let mut tip = current;
            for rev in replay {
                let Some(commit) = state.commits.get(&rev).cloned() else {
                    continue;
                };
                // Merge commits are dropped, as git rebase does by default.
                if commit.parents.len() > 1 {
                    continue;
                }
                tip = state.new_commit(vec![tip], &commit.message);
            }
            tip
        };

        let source_ref = State::full_ref(source);
        if state.refs.contains_key(&source_ref) {
            state.refs.insert(source_ref, tip.clone());
        }
        let head = state.head.clone();
        state.refs.insert(head, tip);
        Ok(())
    }

    fn read_note(&self, notes_ref: &str, revision: &str) -> Result<Option<String>> {
        let state = self.read();
        Ok(state
            .notes
            .get(notes_ref)
            .and_then(|notes| notes.get(revision))
            .cloned())
    }

    fn write_note(&self, notes_ref: &str, revision: &str, contents: &str) -> Result<()> {
        let mut state = self.write();
        state
            .notes
            .entry(notes_ref.to_string())
            .or_default()
            .insert(revision.to_string(), contents.to_string());
        Ok(())
    }

    fn append_note(&self, notes_ref: &str, revision: &str, line: &str) -> Result<()> {
        let mut state = self.write();
        let blob = state
            .notes
            .entry(notes_ref.to_string())
            .or_default()
            .entry(revision.to_string())
            .or_default();
        blob.push_str(line);
        blob.push('\n');
        Ok(())
    }

    fn annotated_revisions(&self, notes_ref: &str) -> Result<Vec<String>> {
        let state = self.read();
        Ok(state
            .notes
            .get(notes_ref)
            .map(|notes| notes.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn user_email(&self) -> Result<String> {
        Ok(self.read().email.clone())
    }

    fn fetch_notes(&self, remote: &str, refspec: &str) -> Result<()> {
        let (src, dst) = split_refspec(refspec)?;
        let matched = self.remote(remote)?.notes_matching(src);
        self.store_notes(dst, matched);
        Ok(())
    }

    fn notes_tip(&self, notes_ref: &str) -> Result<Option<String>> {
        Ok(self.read().notes_tip(notes_ref))
    }

    fn push_notes(&self, remote: &str, notes_ref: &str, expected: Option<&str>) -> Result<()> {
        let notes = self
            .read()
            .notes
            .get(notes_ref)
            .cloned()
            .with_context(|| format!("No local notes under {notes_ref}"))?;

        let remote_repo = self.remote(remote)?;
        let mut state = remote_repo.write();
        if state.notes_tip(notes_ref).as_deref() != expected {
            bail!("Failed to push {notes_ref} to {remote}: stale info, the remote ref moved");
        }
        state.notes.insert(notes_ref.to_string(), notes);
        Ok(())
    }
}
