use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{Comment, Deadline, HostError, RepositoryHost};
use crate::config::GitHubConfig;

const API_VERSION: &str = "2022-11-28";
const ERROR_BODY_LIMIT: usize = 500;

/// GitHub REST client scoped to a single evaluation.
///
/// Authenticates with a bearer token when one is configured and falls back
/// to anonymous access otherwise. Every request is capped by the
/// evaluation's [`Deadline`].
pub struct GitHubHost {
    http: Client,
    api_base: String,
    token: Option<SecretString>,
    per_page: u32,
    deadline: Deadline,
}

#[derive(Deserialize)]
struct Account {
    login: String,
}

#[derive(Deserialize)]
struct RawComment {
    user: Option<Account>,
    body: Option<String>,
}

impl RawComment {
    fn into_comment(self) -> Comment {
        Comment {
            author: self.user.map(|u| u.login).unwrap_or_default(),
            body: self.body.unwrap_or_default(),
        }
    }
}

// The contents API answers with an object for files and an array for
// directories.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<serde_json::Value>),
    Entry(ContentsEntry),
}

#[derive(Deserialize)]
struct ContentsEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl GitHubHost {
    pub fn new(
        config: &GitHubConfig,
        enterprise_host: Option<&str>,
        token: Option<SecretString>,
        deadline: Deadline,
    ) -> Result<Self, HostError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms.max(1)))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HostError::Configuration(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base(&config.api_url, enterprise_host)?,
            token,
            per_page: config.per_page.clamp(1, 100),
            deadline,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn get(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, HostError> {
        let timeout = self.deadline.remaining(operation)?;
        let url = format!("{}{}", self.api_base, path);
        debug!("GET {url} ({operation})");

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .map_err(|e| request_error(operation, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(HostError::NotFound(path.to_string()));
        }
        let body = response.text().unwrap_or_default();
        Err(HostError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            message: truncate(&body, ERROR_BODY_LIMIT),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, HostError> {
        self.get(operation, path, query)?.json::<T>().map_err(|e| {
            if e.is_timeout() {
                HostError::Timeout(operation.to_string())
            } else {
                HostError::Decode {
                    operation: operation.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    /// Fetch every page of a list endpoint. Stops at the first short page.
    fn paginate<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<Vec<T>, HostError> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let query = [
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ];
            let chunk: Vec<T> = self.get_json(operation, path, &query)?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < self.per_page as usize {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }
}

impl RepositoryHost for GitHubHost {
    fn list_org_public_members(&self, org: &str) -> Result<Vec<String>, HostError> {
        let path = format!("/orgs/{org}/public_members");
        match self.paginate::<Account>("listing organization public members", &path) {
            Ok(accounts) => Ok(accounts.into_iter().map(|a| a.login).collect()),
            Err(HostError::NotFound(_)) => {
                debug!("organization {org} not found, treating as no members");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn list_collaborators(&self, owner: &str, repo: &str) -> Result<Vec<String>, HostError> {
        let path = format!("/repos/{owner}/{repo}/collaborators");
        let accounts: Vec<Account> = self.paginate("listing repository collaborators", &path)?;
        Ok(accounts.into_iter().map(|a| a.login).collect())
    }

    fn file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Vec<u8>, HostError> {
        let file = path.trim_start_matches('/');
        let api_path = format!("/repos/{owner}/{repo}/contents/{file}");
        let response: ContentsResponse =
            self.get_json("fetching file content", &api_path, &[])?;
        match response {
            ContentsResponse::Directory(_) => Err(HostError::NotAFile(file.to_string())),
            ContentsResponse::Entry(entry) => decode_content(entry, file),
        }
    }

    /// Review comments of the pull request (`/pulls/{n}/comments`), in the
    /// order GitHub returns them. Issue conversation comments are not read.
    fn list_pull_request_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>, HostError> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}/comments");
        let comments: Vec<RawComment> =
            self.paginate("listing pull request review comments", &path)?;
        Ok(comments.into_iter().map(RawComment::into_comment).collect())
    }
}

/// API base URL, switching to `https://<host>/api/v3` for GitHub Enterprise.
pub fn api_base(default_url: &str, enterprise_host: Option<&str>) -> Result<String, HostError> {
    match enterprise_host.map(str::trim).filter(|h| !h.is_empty()) {
        Some(host) => {
            if host.contains('/') || host.contains(char::is_whitespace) {
                return Err(HostError::Configuration(format!(
                    "invalid enterprise host {host:?}"
                )));
            }
            Ok(format!("https://{host}/api/v3"))
        }
        None => Ok(default_url.trim_end_matches('/').to_string()),
    }
}

fn decode_content(entry: ContentsEntry, path: &str) -> Result<Vec<u8>, HostError> {
    if entry.kind != "file" {
        return Err(HostError::NotAFile(path.to_string()));
    }
    let content = entry.content.unwrap_or_default();
    match entry.encoding.as_deref() {
        Some("base64") => {
            // GitHub wraps base64 content at 60 columns.
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(compact).map_err(|e| HostError::Decode {
                operation: "fetching file content".to_string(),
                message: e.to_string(),
            })
        }
        None | Some("") => Ok(content.into_bytes()),
        Some(other) => Err(HostError::Decode {
            operation: "fetching file content".to_string(),
            message: format!("unsupported content encoding: {other}"),
        }),
    }
}

fn request_error(operation: &str, error: reqwest::Error) -> HostError {
    if error.is_timeout() {
        HostError::Timeout(operation.to_string())
    } else {
        HostError::Transport {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}
