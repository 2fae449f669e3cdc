pub mod context;
pub mod decision;
pub mod params;

pub use context::{EventContext, EventType, PayloadError};
pub use decision::Verdict;
pub use params::AuthorizationParams;

use log::{debug, info};
use thiserror::Error;

use crate::host::{HostError, RepositoryHost};
use crate::owners::OwnersError;
use crate::owners::comment::is_trust_comment;
use crate::sources::{AuthSource, SourceKind};

/// Why an evaluation could not be completed.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Policy(#[from] OwnersError),
}

impl EvalError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EvalError::Host(e) if e.is_timeout())
    }
}

/// Ordered list of authorization sources, built per request from the params.
pub struct Evaluator {
    sources: Vec<Box<dyn AuthSource>>,
}

impl Evaluator {
    /// Sources in evaluation order: org public members (if allowed),
    /// collaborators (if allowed), then the OWNERS file at `owners_path`.
    pub fn from_params(params: &AuthorizationParams, owners_path: &str) -> Self {
        use crate::sources::{
            collaborators::CollaboratorsSource, org::OrgMembersSource,
            owners_file::OwnersFileSource,
        };

        let mut sources: Vec<Box<dyn AuthSource>> = Vec::new();
        if params.org_public_member_allowed {
            sources.push(Box::new(OrgMembersSource));
        }
        if params.repo_member_allowed {
            sources.push(Box::new(CollaboratorsSource));
        }
        sources.push(Box::new(OwnersFileSource::new(owners_path)));

        Self { sources }
    }

    /// Kinds of the configured sources, in order.
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    /// The first source that trusts `ctx.sender`, if any.
    ///
    /// Stops at the first grant or the first error. Every enabled source is
    /// consulted even for an empty sender, so remote failures still surface;
    /// no source grants an empty login.
    pub fn authorize(
        &self,
        host: &dyn RepositoryHost,
        ctx: &EventContext,
    ) -> Result<Option<SourceKind>, EvalError> {
        for source in &self.sources {
            if source.grants(host, ctx)? {
                info!(
                    "{} on {} granted by {}",
                    ctx.sender,
                    ctx.full_name(),
                    source.kind().as_str()
                );
                return Ok(Some(source.kind()));
            }
            debug!("{} not granted by {}", ctx.sender, source.kind().as_str());
        }
        Ok(None)
    }

    pub fn is_authorized(
        &self,
        host: &dyn RepositoryHost,
        ctx: &EventContext,
    ) -> Result<bool, EvalError> {
        Ok(self.authorize(host, ctx)?.is_some())
    }

    /// The first `/ok-to-test` comment whose author is trusted, as
    /// `(author, source)`.
    ///
    /// Comments are checked in the order the host returns them; the first
    /// error aborts the scan.
    pub fn authorize_via_trusted_comment(
        &self,
        host: &dyn RepositoryHost,
        ctx: &EventContext,
    ) -> Result<Option<(String, SourceKind)>, EvalError> {
        let comments = host.list_pull_request_comments(&ctx.owner, &ctx.repository, ctx.pr_number)?;
        let trusted: Vec<_> = comments.into_iter().filter(|c| is_trust_comment(&c.body)).collect();
        debug!(
            "{}#{} has {} /ok-to-test comment(s)",
            ctx.full_name(),
            ctx.pr_number,
            trusted.len()
        );

        for comment in trusted {
            let as_author = ctx.with_sender(&comment.author);
            if let Some(source) = self.authorize(host, &as_author)? {
                return Ok(Some((comment.author, source)));
            }
        }
        Ok(None)
    }

    pub fn is_authorized_via_trusted_comment(
        &self,
        host: &dyn RepositoryHost,
        ctx: &EventContext,
    ) -> Result<bool, EvalError> {
        Ok(self.authorize_via_trusted_comment(host, ctx)?.is_some())
    }
}
