use log::debug;

use crate::eval::{EvalError, EventContext};
use crate::host::{HostError, RepositoryHost};
use crate::owners::OwnersPolicy;
use crate::sources::{AuthSource, SourceKind};

/// Trusts approvers and reviewers listed in the repository's OWNERS file.
///
/// A missing file means no policy and grants nothing. Any other retrieval
/// failure, or a file that does not parse, is an error.
pub struct OwnersFileSource {
    path: String,
}

impl OwnersFileSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl AuthSource for OwnersFileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::OwnersFile
    }

    fn grants(&self, host: &dyn RepositoryHost, ctx: &EventContext) -> Result<bool, EvalError> {
        let content = match host.file_content(&ctx.owner, &ctx.repository, &self.path) {
            Ok(content) => content,
            Err(HostError::NotFound(_)) => {
                debug!("no {} in {}, skipping", self.path, ctx.full_name());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let policy = OwnersPolicy::parse(&content)?;
        Ok(policy.contains(&ctx.sender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EventType;
    use crate::host::{HostCall, StaticHost};

    fn ctx(sender: &str) -> EventContext {
        EventContext {
            event_type: EventType::PullRequest,
            pr_number: 5,
            sender: sender.into(),
            owner: "acme".into(),
            repository: "widgets".into(),
        }
    }

    fn source() -> OwnersFileSource {
        OwnersFileSource::new("OWNERS")
    }

    #[test]
    fn grants_approver_ignoring_case() {
        let host = StaticHost::new().with_file("acme", "widgets", "OWNERS", "approvers: [alice]");
        assert!(source().grants(&host, &ctx("Alice")).unwrap());
    }

    #[test]
    fn grants_reviewer() {
        let host = StaticHost::new().with_file("acme", "widgets", "OWNERS", "reviewers: [bob]");
        assert!(source().grants(&host, &ctx("bob")).unwrap());
    }

    #[test]
    fn missing_file_grants_nothing() {
        let host = StaticHost::new();
        assert!(!source().grants(&host, &ctx("alice")).unwrap());
    }

    #[test]
    fn custom_path_is_used() {
        let host =
            StaticHost::new().with_file("acme", "widgets", ".github/OWNERS", "approvers: [alice]");
        assert!(!source().grants(&host, &ctx("alice")).unwrap());
        assert!(
            OwnersFileSource::new(".github/OWNERS")
                .grants(&host, &ctx("alice"))
                .unwrap()
        );
    }

    #[test]
    fn malformed_file_is_error() {
        let host = StaticHost::new().with_file("acme", "widgets", "OWNERS", "approvers: [alice");
        let err = source().grants(&host, &ctx("alice")).unwrap_err();
        assert!(matches!(err, EvalError::Policy(_)));
    }

    #[test]
    fn directory_is_error() {
        let host = StaticHost::new()
            .failing(HostCall::FileContent, HostError::NotAFile("OWNERS".into()));
        let err = source().grants(&host, &ctx("alice")).unwrap_err();
        assert!(matches!(err, EvalError::Host(HostError::NotAFile(_))));
    }

    #[test]
    fn api_error_is_error() {
        let host = StaticHost::new().failing(
            HostCall::FileContent,
            HostError::Api {
                operation: "fetching file content".into(),
                status: 403,
                message: "rate limited".into(),
            },
        );
        assert!(source().grants(&host, &ctx("alice")).is_err());
    }
}
