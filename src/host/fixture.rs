use std::cell::RefCell;
use std::collections::HashMap;

use super::{Comment, HostError, RepositoryHost};

/// Which capability a call exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    OrgMembers,
    Collaborators,
    FileContent,
    Comments,
}

/// A [`RepositoryHost`] backed by in-memory data.
///
/// Unknown organizations and repositories have no members, collaborators or
/// comments; unknown files are `NotFound`. A failure registered with
/// [`StaticHost::failing`] is returned for every call of that kind.
#[derive(Debug, Default)]
pub struct StaticHost {
    org_members: HashMap<String, Vec<String>>,
    collaborators: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<u8>>,
    comments: HashMap<String, Vec<Comment>>,
    failures: HashMap<HostCall, HostError>,
    calls: RefCell<Vec<HostCall>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org_members(mut self, org: &str, members: &[&str]) -> Self {
        self.org_members
            .insert(org.to_string(), members.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_collaborators(mut self, owner: &str, repo: &str, users: &[&str]) -> Self {
        self.collaborators.insert(
            format!("{owner}/{repo}"),
            users.iter().map(|u| u.to_string()).collect(),
        );
        self
    }

    pub fn with_file(mut self, owner: &str, repo: &str, path: &str, content: &str) -> Self {
        self.files
            .insert(format!("{owner}/{repo}/{path}"), content.as_bytes().to_vec());
        self
    }

    /// Append a comment to pull request `number`.
    pub fn with_comment(
        mut self,
        owner: &str,
        repo: &str,
        number: u64,
        author: &str,
        body: &str,
    ) -> Self {
        self.comments
            .entry(format!("{owner}/{repo}#{number}"))
            .or_default()
            .push(Comment::new(author, body));
        self
    }

    pub fn failing(mut self, call: HostCall, error: HostError) -> Self {
        self.failures.insert(call, error);
        self
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: HostCall) -> Result<(), HostError> {
        self.calls.borrow_mut().push(call);
        match self.failures.get(&call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl RepositoryHost for StaticHost {
    fn list_org_public_members(&self, org: &str) -> Result<Vec<String>, HostError> {
        self.record(HostCall::OrgMembers)?;
        Ok(self.org_members.get(org).cloned().unwrap_or_default())
    }

    fn list_collaborators(&self, owner: &str, repo: &str) -> Result<Vec<String>, HostError> {
        self.record(HostCall::Collaborators)?;
        Ok(self
            .collaborators
            .get(&format!("{owner}/{repo}"))
            .cloned()
            .unwrap_or_default())
    }

    fn file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Vec<u8>, HostError> {
        self.record(HostCall::FileContent)?;
        let key = format!("{owner}/{repo}/{path}");
        self.files
            .get(&key)
            .cloned()
            .ok_or(HostError::NotFound(key))
    }

    fn list_pull_request_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>, HostError> {
        self.record(HostCall::Comments)?;
        Ok(self
            .comments
            .get(&format!("{owner}/{repo}#{number}"))
            .cloned()
            .unwrap_or_default())
    }
}
