use serde::Deserialize;
use thiserror::Error;

/// Webhook event kinds the gate accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    PullRequest,
    IssueComment,
}

impl EventType {
    /// Parse the value of the `X-GitHub-Event` header.
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "pull_request" => Some(EventType::PullRequest),
            "issue_comment" => Some(EventType::IssueComment),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::PullRequest => "pull_request",
            EventType::IssueComment => "issue_comment",
        }
    }
}

/// Reasons a webhook body cannot be turned into an [`EventContext`].
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("body is empty")]
    EmptyBody,
    #[error("body is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("payload body missing '{0}' field")]
    MissingField(&'static str),
    #[error("repository.full_name {0:?} is not of the form owner/repo")]
    MalformedFullName(String),
}

/// The normalized facts about one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub event_type: EventType,
    /// Pull request (or issue) number the event refers to.
    pub pr_number: u64,
    /// Login of the account that triggered the event. May be empty.
    pub sender: String,
    pub owner: String,
    pub repository: String,
}

// Only the fields the gate reads. Everything else in the payload is ignored.
#[derive(Deserialize)]
struct WebhookBody {
    number: Option<u64>,
    issue: Option<IssueSection>,
    repository: Option<RepositorySection>,
    sender: Option<SenderSection>,
}

#[derive(Deserialize)]
struct IssueSection {
    number: Option<u64>,
}

#[derive(Deserialize)]
struct RepositorySection {
    full_name: Option<String>,
}

#[derive(Deserialize)]
struct SenderSection {
    login: Option<String>,
}

impl EventContext {
    /// Extract an EventContext from a raw webhook body.
    ///
    /// Either every required field is present and well-typed, or a specific
    /// [`PayloadError`] is returned. A missing `sender.login` is not an error;
    /// the sender is left empty.
    pub fn extract(body: &str, event_type: EventType) -> Result<Self, PayloadError> {
        if body.trim().is_empty() {
            return Err(PayloadError::EmptyBody);
        }
        let parsed: WebhookBody = serde_json::from_str(body)?;

        let pr_number = match event_type {
            EventType::PullRequest => parsed
                .number
                .ok_or(PayloadError::MissingField("number"))?,
            EventType::IssueComment => parsed
                .issue
                .and_then(|issue| issue.number)
                .ok_or(PayloadError::MissingField("issue.number"))?,
        };

        let full_name = parsed
            .repository
            .and_then(|repo| repo.full_name)
            .ok_or(PayloadError::MissingField("repository.full_name"))?;
        let (owner, repository) = split_full_name(&full_name)?;

        let sender = parsed
            .sender
            .and_then(|sender| sender.login)
            .unwrap_or_default();

        Ok(Self {
            event_type,
            pr_number,
            sender,
            owner,
            repository,
        })
    }

    /// The same event, attributed to a different sender.
    pub fn with_sender(&self, sender: &str) -> Self {
        Self {
            sender: sender.to_string(),
            ..self.clone()
        }
    }

    /// `owner/repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }
}

/// Split `owner/repo` into exactly two non-empty parts.
fn split_full_name(full_name: &str) -> Result<(String, String), PayloadError> {
    match full_name.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(PayloadError::MalformedFullName(full_name.to_string())),
    }
}
