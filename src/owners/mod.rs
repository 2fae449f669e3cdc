//! OWNERS file interpretation and trust-comment matching.
//!
//! An OWNERS document names the accounts trusted on a repository:
//!
//! ```yaml
//! approvers:
//!   - alice
//! reviewers:
//!   - bob
//! ```
//!
//! Both lists are optional. Other keys (labels, options, ...) are ignored.

/// `/ok-to-test` comment detection.
pub mod comment;

use std::collections::BTreeSet;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OwnersError {
    #[error("OWNERS file is malformed: {0}")]
    Malformed(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize, Default)]
struct OwnersDocument {
    #[serde(default)]
    approvers: Option<Vec<String>>,
    #[serde(default)]
    reviewers: Option<Vec<String>>,
}

/// Identities authorized by an OWNERS file, stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnersPolicy {
    approvers: BTreeSet<String>,
    reviewers: BTreeSet<String>,
}

impl OwnersPolicy {
    /// Parse OWNERS file bytes. An empty document is an empty policy.
    pub fn parse(content: &[u8]) -> Result<Self, OwnersError> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let doc: Option<OwnersDocument> = serde_yaml::from_slice(content)?;
        let doc = doc.unwrap_or_default();
        Ok(Self {
            approvers: normalize(doc.approvers.unwrap_or_default()),
            reviewers: normalize(doc.reviewers.unwrap_or_default()),
        })
    }

    pub fn approvers(&self) -> &BTreeSet<String> {
        &self.approvers
    }

    pub fn reviewers(&self) -> &BTreeSet<String> {
        &self.reviewers
    }

    /// Whether `login` is an approver or reviewer, ignoring case.
    /// An empty login is never contained.
    pub fn contains(&self, login: &str) -> bool {
        if login.is_empty() {
            return false;
        }
        let login = login.to_lowercase();
        self.approvers.contains(&login) || self.reviewers.contains(&login)
    }

    pub fn is_empty(&self) -> bool {
        self.approvers.is_empty() && self.reviewers.is_empty()
    }
}

fn normalize(entries: Vec<String>) -> BTreeSet<String> {
    entries.into_iter().map(|e| e.to_lowercase()).collect()
}
