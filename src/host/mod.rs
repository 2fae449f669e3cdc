//! Repository host access: the capabilities the evaluator needs from GitHub.
//!
//! A host instance is created per request and passed explicitly through the
//! evaluation. Nothing here is shared between requests.

/// Per-request time budget for remote calls.
pub mod deadline;
/// In-memory host with canned data and injectable failures.
#[cfg(any(test, feature = "test-util"))]
pub mod fixture;
/// reqwest-backed GitHub REST client.
pub mod github;

pub use deadline::Deadline;
#[cfg(any(test, feature = "test-util"))]
pub use fixture::{HostCall, StaticHost};
pub use github::GitHubHost;

use thiserror::Error;

/// A review comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Login of the comment author. Empty if GitHub reported no user.
    pub author: String,
    pub body: String,
}

impl Comment {
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
        }
    }
}

/// Failure of a single remote call.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    /// The requested resource does not exist. Only meaningful for
    /// [`RepositoryHost::file_content`]; other callers treat it as a failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// The deadline expired before or during the call.
    #[error("deadline exceeded while {0}")]
    Timeout(String),

    #[error("transport error while {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("GitHub API error while {operation} ({status}): {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("referenced path {0} inside the repository is not a file")]
    NotAFile(String),

    #[error("failed to decode response while {operation}: {message}")]
    Decode { operation: String, message: String },

    #[error("client configuration error: {0}")]
    Configuration(String),
}

impl HostError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HostError::Timeout(_))
    }
}

/// The repository host capabilities used by the authorization sources.
///
/// Each call is independent and may fail. Implementations perform no
/// caching and no retries.
pub trait RepositoryHost {
    /// Public members of an organization. An unknown organization (or a user
    /// account rather than an org) yields an empty list, not an error.
    fn list_org_public_members(&self, org: &str) -> Result<Vec<String>, HostError>;

    /// Collaborators of a repository.
    fn list_collaborators(&self, owner: &str, repo: &str) -> Result<Vec<String>, HostError>;

    /// Raw bytes of a file. A missing file is [`HostError::NotFound`].
    fn file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Vec<u8>, HostError>;

    /// All comments on a pull request, in the order the host returns them.
    fn list_pull_request_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>, HostError>;
}

impl<H: RepositoryHost + ?Sized> RepositoryHost for &H {
    fn list_org_public_members(&self, org: &str) -> Result<Vec<String>, HostError> {
        (**self).list_org_public_members(org)
    }

    fn list_collaborators(&self, owner: &str, repo: &str) -> Result<Vec<String>, HostError> {
        (**self).list_collaborators(owner, repo)
    }

    fn file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Vec<u8>, HostError> {
        (**self).file_content(owner, repo, path)
    }

    fn list_pull_request_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>, HostError> {
        (**self).list_pull_request_comments(owner, repo, number)
    }
}
