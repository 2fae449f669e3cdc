//! Authorization sources: each knows one way an account can be trusted.
//!
//! The evaluator asks each enabled source in turn whether it trusts the
//! sender, stopping at the first grant or the first error.

/// Repository collaborators.
pub mod collaborators;
/// Public members of the owning organization.
pub mod org;
/// Approvers and reviewers listed in the repository's OWNERS file.
pub mod owners_file;

use crate::eval::{EvalError, EventContext};
use crate::host::RepositoryHost;

/// Identifies which source granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    OrgPublicMember,
    Collaborator,
    OwnersFile,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::OrgPublicMember => "org-public-member",
            SourceKind::Collaborator => "collaborator",
            SourceKind::OwnersFile => "owners-file",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            SourceKind::OrgPublicMember => "a public member of the organization",
            SourceKind::Collaborator => "a repository collaborator",
            SourceKind::OwnersFile => "listed in OWNERS",
        }
    }
}

/// Trait for authorization sources.
///
/// An implementation answers whether `ctx.sender` is trusted on the
/// repository `ctx` refers to, using `host` for any lookups.
pub trait AuthSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn grants(&self, host: &dyn RepositoryHost, ctx: &EventContext) -> Result<bool, EvalError>;
}
