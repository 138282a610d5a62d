//! Report service: CI results and static-analysis pointers.

use crate::model::{encode, timestamp, Analysis, CiState, CiStatus, Record};
use crate::notes::Namespace;

use super::{CoreContext, CoreError, CoreResult};

/// Service for attaching build and analysis results to revisions.
pub struct ReportService<'c, 'a> {
    ctx: &'c CoreContext<'a>,
}

impl<'c, 'a> ReportService<'c, 'a> {
    pub(crate) fn new(ctx: &'c CoreContext<'a>) -> Self {
        Self { ctx }
    }

    /// Record a CI result for `revision` (HEAD when unset). Returns the
    /// annotated revision.
    pub fn ci_status(
        &self,
        revision: Option<&str>,
        url: &str,
        agent: &str,
        status: Option<CiState>,
    ) -> CoreResult<String> {
        let record = CiStatus {
            timestamp: Some(timestamp::now()),
            url: url.to_string(),
            status,
            agent: agent.to_string(),
            ..CiStatus::default()
        };
        self.attach(Namespace::Ci, revision, &record)
    }

    /// Record where analysis results for `revision` (HEAD when unset) live.
    pub fn analysis(&self, revision: Option<&str>, url: &str) -> CoreResult<String> {
        let record = Analysis {
            timestamp: Some(timestamp::now()),
            url: url.to_string(),
            ..Analysis::default()
        };
        self.attach(Namespace::Analyses, revision, &record)
    }

    fn attach<T: Record>(
        &self,
        namespace: Namespace,
        revision: Option<&str>,
        record: &T,
    ) -> CoreResult<String> {
        record.validate()?;
        let repo = self.ctx.repo();
        let name = revision.unwrap_or("HEAD");
        if !repo.ref_exists(name)? {
            return Err(CoreError::InvalidRef {
                name: name.to_string(),
            });
        }
        let revision = repo.resolve_ref(name)?;

        let line = encode(record).map_err(|e| CoreError::Internal(e.into()))?;
        self.ctx.store().append(namespace, &revision, &line)?;
        tracing::debug!(%namespace, %revision, "attached {}", T::KIND);
        Ok(revision)
    }
}
