//! Sync service: replicate notes with a remote.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::notes::Namespace;

use super::{CoreContext, CoreResult};

/// Environment variable naming the default remote.
pub const REMOTE_ENV: &str = "APPRAISE_REMOTE";

/// Remote used when none is given.
pub const DEFAULT_REMOTE: &str = "origin";

/// Default remote: `APPRAISE_REMOTE`, else `origin`.
#[must_use]
pub fn default_remote() -> String {
    std::env::var(REMOTE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REMOTE.to_string())
}

/// What a pull changed locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub remote: String,
    /// Namespace name -> number of local notes rewritten by the merge.
    pub merged: BTreeMap<String, usize>,
}

impl SyncReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.merged.values().sum()
    }
}

/// Service for note replication.
pub struct SyncService<'c, 'a> {
    ctx: &'c CoreContext<'a>,
}

impl<'c, 'a> SyncService<'c, 'a> {
    pub(crate) fn new(ctx: &'c CoreContext<'a>) -> Self {
        Self { ctx }
    }

    /// Fetch the remote's notes into remote-tracking refs, then union-merge
    /// each namespace into the local notes.
    pub fn pull(&self, remote: &str) -> CoreResult<SyncReport> {
        let layout = self.ctx.layout();
        let refspec = format!("+{}/*:{}/*", layout.prefix(), layout.remote_prefix(remote));
        self.ctx.repo().fetch_notes(remote, &refspec)?;

        let store = self.ctx.store();
        let mut report = SyncReport {
            remote: remote.to_string(),
            ..SyncReport::default()
        };
        for namespace in Namespace::ALL {
            let changed = store.reconcile(namespace, &layout.remote_notes_ref(remote, namespace))?;
            report.merged.insert(namespace.to_string(), changed);
        }

        tracing::info!(remote, merged = report.total(), "pulled notes");
        Ok(report)
    }

    /// Publish the local notes to the remote.
    ///
    /// Pulls first so the published notes are a superset of the remote's.
    /// Local notes history is rewritten by every merge, so each notes ref is
    /// overwritten under a lease on the tip just fetched: if another replica
    /// pushed in between, the push fails and nothing on the remote is lost.
    pub fn push(&self, remote: &str) -> CoreResult<SyncReport> {
        let report = self.pull(remote)?;
        self.publish(remote)?;
        tracing::info!(remote, "pushed notes");
        Ok(report)
    }

    /// Push every local notes ref, leased on its remote-tracking copy.
    fn publish(&self, remote: &str) -> CoreResult<()> {
        let layout = self.ctx.layout();
        let repo = self.ctx.repo();
        for namespace in Namespace::ALL {
            let notes_ref = layout.notes_ref(namespace);
            let Some(local) = repo.notes_tip(&notes_ref)? else {
                continue;
            };
            let expected = repo.notes_tip(&layout.remote_notes_ref(remote, namespace))?;
            if expected.as_deref() == Some(local.as_str()) {
                tracing::debug!(
                    remote,
                    notes_ref = %notes_ref,
                    "remote notes already up to date"
                );
                continue;
            }
            repo.push_notes(remote, &notes_ref, expected.as_deref())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NotesLayout;
    use crate::repo::{MemoryRepo, Repository};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_pull_merges_remote_notes() {
        let layout = NotesLayout::default();
        let server = Arc::new(MemoryRepo::new("server@example.com"));
        let rev = server.commit("master", "base");
        server
            .append_note(&layout.notes_ref(Namespace::Discuss), &rev, "from-server")
            .unwrap();

        let local = MemoryRepo::new("a@example.com");
        local.commit("master", "base");
        local.add_remote("origin", Arc::clone(&server));
        local
            .append_note(&layout.notes_ref(Namespace::Discuss), &rev, "from-local")
            .unwrap();

        let ctx = CoreContext::new(&local).with_layout(layout.clone());
        let report = ctx.services().sync().pull("origin").unwrap();
        assert_eq!(report.merged["discuss"], 1);
        assert_eq!(report.total(), 1);
        assert_eq!(
            ctx.store().read(Namespace::Discuss, &rev).unwrap(),
            vec!["from-local".to_string(), "from-server".to_string()]
        );

        let report = ctx.services().sync().push("origin").unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(
            server
                .read_note(&layout.notes_ref(Namespace::Discuss), &rev)
                .unwrap(),
            Some("from-local\nfrom-server\n".to_string())
        );
    }

    #[test]
    fn test_concurrent_push_is_refused_not_overwritten() {
        let layout = NotesLayout::default();
        let discuss = layout.notes_ref(Namespace::Discuss);
        let server = Arc::new(MemoryRepo::new("server@example.com"));
        let rev = server.commit("master", "base");
        server.append_note(&discuss, &rev, "first").unwrap();

        let alice = MemoryRepo::new("a@example.com");
        alice.add_remote("origin", Arc::clone(&server));
        let bob = MemoryRepo::new("b@example.com");
        bob.add_remote("origin", Arc::clone(&server));
        let alice_ctx = CoreContext::new(&alice).with_layout(layout.clone());
        let bob_ctx = CoreContext::new(&bob).with_layout(layout.clone());

        alice_ctx.services().sync().pull("origin").unwrap();
        alice.append_note(&discuss, &rev, "from-alice").unwrap();

        bob_ctx.services().sync().pull("origin").unwrap();
        bob.append_note(&discuss, &rev, "from-bob").unwrap();
        bob_ctx.services().sync().push("origin").unwrap();

        assert!(alice_ctx.services().sync().publish("origin").is_err());
        assert_eq!(
            server.read_note(&discuss, &rev).unwrap(),
            Some("first\nfrom-bob\n".to_string())
        );

        alice_ctx.services().sync().push("origin").unwrap();
        assert_eq!(
            server.read_note(&discuss, &rev).unwrap(),
            Some("first\nfrom-alice\nfrom-bob\n".to_string())
        );
    }

    #[test]
    fn test_pull_from_unknown_remote_fails() {
        let local = MemoryRepo::new("a@example.com");
        let ctx = CoreContext::new(&local).with_layout(NotesLayout::default());
        assert!(ctx.services().sync().pull("nowhere").is_err());
    }
}
