//! Top-level orchestration: one request in, one response out.
//!
//! ```text
//! Received -> Validated -> EventExtracted -> DirectlyAuthorized  => Allow
//!                                         -> CommentAuthorized   => Allow
//!                                         -> Denied              => Deny
//! ```
//!
//! Any step may instead end in a failure status, which is distinct from
//! `Deny`: a failure means the outcome could not be determined.

use std::time::Duration;

use log::debug;
use secrecy::SecretString;

use crate::config::{Config, EvaluationConfig, GitHubConfig};
use crate::envelope::{Code, InterceptorRequest, InterceptorResponse};
use crate::eval::{AuthorizationParams, EvalError, EventContext, EventType, Evaluator, Verdict};
use crate::host::{Deadline, GitHubHost, HostError, RepositoryHost};
use crate::logging;
use crate::secret::{SecretGetter, resolve_token};

/// Everything needed to open a host for one request.
pub struct Connection<'a> {
    pub token: Option<SecretString>,
    /// Value of `X-Github-Enterprise-Host`, if any.
    pub enterprise_host: Option<&'a str>,
    pub deadline: Deadline,
}

/// Opens a fresh [`RepositoryHost`] for each request.
pub trait HostConnector {
    fn connect<'a>(
        &'a self,
        connection: Connection<'_>,
    ) -> Result<Box<dyn RepositoryHost + 'a>, HostError>;
}

/// Connects to github.com or a GitHub Enterprise host.
pub struct GitHubConnector {
    config: GitHubConfig,
}

impl GitHubConnector {
    pub fn new(config: GitHubConfig) -> Self {
        Self { config }
    }
}

impl HostConnector for GitHubConnector {
    fn connect<'a>(
        &'a self,
        connection: Connection<'_>,
    ) -> Result<Box<dyn RepositoryHost + 'a>, HostError> {
        let host = GitHubHost::new(
            &self.config,
            connection.enterprise_host,
            connection.token,
            connection.deadline,
        )?;
        debug!(
            "connected to {} ({})",
            host.api_base(),
            if host.is_authenticated() { "token" } else { "anonymous" }
        );
        Ok(Box::new(host))
    }
}

/// Hands out the same in-memory host for every request.
#[cfg(any(test, feature = "test-util"))]
impl HostConnector for crate::host::StaticHost {
    fn connect<'a>(
        &'a self,
        _connection: Connection<'_>,
    ) -> Result<Box<dyn RepositoryHost + 'a>, HostError> {
        Ok(Box::new(self))
    }
}

/// A terminal failure: the engine could not reach a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub code: Code,
    pub message: String,
}

impl Failure {
    fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn from_eval(context: &str, error: EvalError) -> Self {
        let code = if error.is_timeout() {
            Code::DeadlineExceeded
        } else {
            Code::FailedPrecondition
        };
        Self::new(code, format!("{context}: {error}"))
    }
}

/// The outcome of a completed evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub context: EventContext,
    pub verdict: Verdict,
}

impl From<Result<Decision, Failure>> for InterceptorResponse {
    fn from(result: Result<Decision, Failure>) -> Self {
        match result {
            Ok(d) if d.verdict.is_allow() => InterceptorResponse::allow(),
            Ok(_) => InterceptorResponse::deny(),
            Err(f) => InterceptorResponse::failure(f.code, f.message),
        }
    }
}

pub struct DecisionEngine<C, S> {
    settings: EvaluationConfig,
    connector: C,
    secrets: S,
}

impl<C: HostConnector, S: SecretGetter> DecisionEngine<C, S> {
    pub fn new(settings: EvaluationConfig, connector: C, secrets: S) -> Self {
        Self {
            settings,
            connector,
            secrets,
        }
    }

    /// Decide a request and render the response envelope.
    pub fn process(&self, request: &InterceptorRequest) -> InterceptorResponse {
        let result = self.decide(request);
        match &result {
            Ok(decision) => logging::log_decision(&decision.context, &decision.verdict),
            Err(failure) => logging::log_failure(failure),
        }
        result.into()
    }

    /// Run the state machine for one request.
    pub fn decide(&self, request: &InterceptorRequest) -> Result<Decision, Failure> {
        // Received -> Validated
        if request.is_form_encoded() {
            return Err(Failure::new(
                Code::InvalidArgument,
                "form parameter encoding not supported, please change the hook to send JSON payloads",
            ));
        }
        let params = AuthorizationParams::from_map(&request.interceptor_params).map_err(|e| {
            Failure::new(
                Code::InvalidArgument,
                format!("failed to parse interceptor params: {e}"),
            )
        })?;
        let event_header = request.header("X-GitHub-Event").unwrap_or_default();
        let event_type = EventType::from_header(event_header).ok_or_else(|| {
            Failure::new(
                Code::FailedPrecondition,
                format!("event type {event_header} is not allowed"),
            )
        })?;
        debug!("validated {} event", event_type.as_str());

        // Validated -> EventExtracted
        let ctx = EventContext::extract(&request.body, event_type).map_err(|e| {
            Failure::new(Code::FailedPrecondition, format!("error parsing body: {e}"))
        })?;
        debug!(
            "extracted {}#{} from {:?}",
            ctx.full_name(),
            ctx.pr_number,
            ctx.sender
        );

        let token = resolve_token(&self.secrets, params.secret_ref.as_ref(), request.trigger_id())
            .map_err(|e| {
                Failure::new(
                    Code::FailedPrecondition,
                    format!("error getting the secret: {e}"),
                )
            })?;
        if token.is_none() {
            debug!("no token configured, using anonymous GitHub access");
        }
        let connection = Connection {
            token,
            enterprise_host: request
                .header("X-Github-Enterprise-Host")
                .filter(|h| !h.is_empty()),
            deadline: Deadline::after(Duration::from_millis(self.settings.timeout_ms)),
        };
        let host = self.connector.connect(connection).map_err(|e| {
            Failure::new(
                Code::FailedPrecondition,
                format!("error initializing GitHub client: {e}"),
            )
        })?;

        let evaluator = Evaluator::from_params(&params, &self.settings.owners_path);

        // EventExtracted -> DirectlyAuthorized
        let direct = evaluator
            .authorize(host.as_ref(), &ctx)
            .map_err(|e| Failure::from_eval("error checking owner verification", e))?;
        if let Some(source) = direct {
            return Ok(Decision {
                context: ctx,
                verdict: Verdict::Allow { source },
            });
        }

        // EventExtracted -> CommentAuthorized | Denied
        let via_comment = evaluator
            .authorize_via_trusted_comment(host.as_ref(), &ctx)
            .map_err(|e| Failure::from_eval("error checking comments for verification", e))?;
        let verdict = match via_comment {
            Some((author, source)) => Verdict::AllowViaComment { author, source },
            None => Verdict::Deny,
        };
        Ok(Decision {
            context: ctx,
            verdict,
        })
    }
}

/// Build an engine talking to GitHub with file-mounted secrets, as
/// configured, and decide one request.
pub fn process_with_config(config: &Config, request: &InterceptorRequest) -> InterceptorResponse {
    let engine = DecisionEngine::new(
        config.evaluation.clone(),
        GitHubConnector::new(config.github.clone()),
        crate::secret::FileSecretGetter::new(config.secrets.dir_path()),
    );
    engine.process(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCall, StaticHost};
    use crate::secret::{SecretError, SecretRef};
    use serde_json::json;

    struct NoSecrets;

    impl SecretGetter for NoSecrets {
        fn get(&self, namespace: &str, secret: &SecretRef) -> Result<SecretString, SecretError> {
            Err(SecretError::Read {
                path: format!("{namespace}/{}", secret.secret_name).into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no secrets"),
            })
        }
    }

    fn engine(host: StaticHost) -> DecisionEngine<StaticHost, NoSecrets> {
        DecisionEngine::new(EvaluationConfig::default(), host, NoSecrets)
    }

    fn request(event: &str, body: serde_json::Value, params: serde_json::Value) -> InterceptorRequest {
        serde_json::from_value(json!({
            "body": body.to_string(),
            "header": {"X-GitHub-Event": [event], "Content-Type": ["application/json"]},
            "interceptor_params": params,
            "context": {"trigger_id": "namespace/ci/triggers/owners"}
        }))
        .unwrap()
    }

    fn pr_body(sender: &str) -> serde_json::Value {
        json!({
            "number": 12,
            "repository": {"full_name": "acme/widgets"},
            "sender": {"login": sender}
        })
    }

    #[test]
    fn owner_is_allowed() {
        let host = StaticHost::new().with_file("acme", "widgets", "OWNERS", "approvers: [alice]");
        let decision = engine(host)
            .decide(&request("pull_request", pr_body("alice"), json!({})))
            .unwrap();
        assert_eq!(
            decision.verdict,
            Verdict::Allow {
                source: crate::sources::SourceKind::OwnersFile
            }
        );
    }

    #[test]
    fn stranger_is_denied() {
        let host = StaticHost::new().with_file("acme", "widgets", "OWNERS", "approvers: [alice]");
        let response = engine(host).process(&request("pull_request", pr_body("mallory"), json!({})));
        assert_eq!(response, InterceptorResponse::deny());
    }

    #[test]
    fn form_encoded_rejected_before_anything_else() {
        let mut req = request("push", pr_body("alice"), json!({}));
        req.header.insert(
            "Content-Type".into(),
            vec!["application/x-www-form-urlencoded".into()],
        );
        let host = StaticHost::new();
        let failure = engine(host).decide(&req).unwrap_err();
        assert_eq!(failure.code, Code::InvalidArgument);
    }

    #[test]
    fn bad_params_rejected() {
        let failure = engine(StaticHost::new())
            .decide(&request(
                "pull_request",
                pr_body("alice"),
                json!({"repoMemberAllowed": "sure"}),
            ))
            .unwrap_err();
        assert_eq!(failure.code, Code::InvalidArgument);
        assert!(failure.message.starts_with("failed to parse interceptor params"));
    }

    #[test]
    fn unsupported_event_rejected() {
        let failure = engine(StaticHost::new())
            .decide(&request("push", pr_body("alice"), json!({})))
            .unwrap_err();
        assert_eq!(failure.code, Code::FailedPrecondition);
        assert_eq!(failure.message, "event type push is not allowed");
    }

    #[test]
    fn missing_event_header_rejected() {
        let mut req = request("pull_request", pr_body("alice"), json!({}));
        req.header.remove("X-GitHub-Event");
        let failure = engine(StaticHost::new()).decide(&req).unwrap_err();
        assert_eq!(failure.code, Code::FailedPrecondition);
    }

    #[test]
    fn invalid_payload_is_failure_not_deny() {
        let req = request("pull_request", json!({"repository": {"full_name": "acme/widgets"}}), json!({}));
        let host = StaticHost::new();
        let failure = engine(host).decide(&req).unwrap_err();
        assert_eq!(failure.code, Code::FailedPrecondition);
        assert!(failure.message.starts_with("error parsing body"));
    }

    #[test]
    fn unresolvable_secret_is_failure() {
        let failure = engine(StaticHost::new())
            .decide(&request(
                "pull_request",
                pr_body("alice"),
                json!({"secretRef": {"secretName": "gh", "secretKey": "token"}}),
            ))
            .unwrap_err();
        assert_eq!(failure.code, Code::FailedPrecondition);
        assert!(failure.message.starts_with("error getting the secret"));
    }

    #[test]
    fn timeout_maps_to_deadline_exceeded() {
        let host = StaticHost::new().failing(
            HostCall::FileContent,
            HostError::Timeout("fetching file content".into()),
        );
        let failure = engine(host)
            .decide(&request("pull_request", pr_body("alice"), json!({})))
            .unwrap_err();
        assert_eq!(failure.code, Code::DeadlineExceeded);
        assert!(failure.message.starts_with("error checking owner verification"));
    }

    #[test]
    fn comment_scan_failure_is_reported_separately() {
        let host = StaticHost::new().failing(
            HostCall::Comments,
            HostError::Api {
                operation: "listing comments".into(),
                status: 500,
                message: "boom".into(),
            },
        );
        let failure = engine(host)
            .decide(&request("pull_request", pr_body("bob"), json!({})))
            .unwrap_err();
        assert_eq!(failure.code, Code::FailedPrecondition);
        assert!(failure.message.starts_with("error checking comments for verification"));
    }

    #[test]
    fn missing_sender_still_reports_owner_check_failure() {
        let host = StaticHost::new().failing(
            HostCall::OrgMembers,
            HostError::Transport {
                operation: "listing organization public members".into(),
                message: "connection refused".into(),
            },
        );
        let body = json!({"number": 12, "repository": {"full_name": "acme/widgets"}});
        let failure = engine(host)
            .decide(&request("pull_request", body, json!({"orgPublicMemberAllowed": true})))
            .unwrap_err();
        assert_eq!(failure.code, Code::FailedPrecondition);
        assert!(failure.message.starts_with("error checking owner verification:"));
    }

    #[test]
    fn failure_response_never_continues() {
        let response: InterceptorResponse =
            Err(Failure::new(Code::FailedPrecondition, "x")).into();
        assert!(!response.proceed);
        assert_eq!(response.status.code, Code::FailedPrecondition);
    }
}
