use log::debug;

use crate::eval::{EvalError, EventContext};
use crate::host::RepositoryHost;
use crate::sources::{AuthSource, SourceKind};

/// Trusts public members of the organization that owns the repository.
///
/// Private memberships are invisible to this check. An owner that is not an
/// organization has no members.
pub struct OrgMembersSource;

impl AuthSource for OrgMembersSource {
    fn kind(&self) -> SourceKind {
        SourceKind::OrgPublicMember
    }

    fn grants(&self, host: &dyn RepositoryHost, ctx: &EventContext) -> Result<bool, EvalError> {
        let members = host.list_org_public_members(&ctx.owner)?;
        debug!("{} has {} public member(s)", ctx.owner, members.len());
        Ok(members.iter().any(|m| *m == ctx.sender))
    }
}
