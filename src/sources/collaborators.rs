use log::debug;

use crate::eval::{EvalError, EventContext};
use crate::host::RepositoryHost;
use crate::sources::{AuthSource, SourceKind};

/// Trusts collaborators of the repository.
pub struct CollaboratorsSource;

impl AuthSource for CollaboratorsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Collaborator
    }

    fn grants(&self, host: &dyn RepositoryHost, ctx: &EventContext) -> Result<bool, EvalError> {
        let users = host.list_collaborators(&ctx.owner, &ctx.repository)?;
        debug!("{} has {} collaborator(s)", ctx.full_name(), users.len());
        Ok(users.iter().any(|u| *u == ctx.sender))
    }
}
