//! gh-owners-gate: a webhook interceptor that decides whether a GitHub
//! pull request event may trigger CI.
//!
//! An event passes when its sender is trusted by one of the enabled
//! [`sources`], or when a trusted account commented `/ok-to-test` on the
//! pull request. Everything else is denied, and anything that prevents a
//! decision is reported as a failure status instead.
//!
//! # Architecture
//!
//! - **[`envelope`]**: Interceptor request/response wire types and status codes.
//! - **[`engine`]**: Per-request state machine, host connection, failure mapping.
//! - **[`eval`]**: Event extraction, interceptor params, ordered source evaluation.
//! - **[`sources`]**: Authorization sources: org members, collaborators, OWNERS.
//! - **[`owners`]**: OWNERS document parsing and `/ok-to-test` recognition.
//! - **[`host`]**: Repository host abstraction, the GitHub REST client, an in-memory host.
//! - **[`secret`]**: Secret references and the file-mounted secret store.
//! - **[`config`]**: Configuration loading: embedded defaults + user overlay merge.
//! - **[`logging`]**: Logger setup and one-line decision records.

/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Request processing: validation, evaluation, response rendering.
pub mod engine;
/// Interceptor request and response envelopes.
pub mod envelope;
/// Evaluation: event context, params, verdicts, source ordering.
pub mod eval;
/// Repository host trait and implementations.
pub mod host;
/// Logger setup and decision records.
pub mod logging;
/// OWNERS parsing and trust comments.
pub mod owners;
/// API token lookup.
pub mod secret;
/// Authorization source trait and implementations.
pub mod sources;

use envelope::{InterceptorRequest, InterceptorResponse};

/// Decide one request with the embedded default configuration.
///
/// This is the main entry point for simple usage. For a user config or a
/// custom host, build a [`engine::DecisionEngine`] directly.
pub fn process(request: &InterceptorRequest) -> InterceptorResponse {
    let config = config::Config::default_config();
    engine::process_with_config(&config, request)
}
