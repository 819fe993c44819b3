//! HTTP client for the GitHub Enterprise GraphQL and REST endpoints.
//!
//! The compound branch query is posted to `{endpoint}/graphql`; ref deletion
//! goes through `DELETE {endpoint}/repos/{org}/{repo}/git/refs/heads/{branch}`,
//! with every branch path segment percent-encoded. Transport failures and
//! throttle responses are retried with backoff, a server-provided
//! `Retry-After` taking precedence over the computed delay.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{self, HeaderMap};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{DeleteError, DeleteResult};
use super::types::{wire, CursorTriple, EnterprisePage};
use super::{BranchPageSource, FetchOutcome, RefDeleter};
use crate::utils::{ReaperError, Result};

/// Compound query walking enterprise -> organizations -> repositories ->
/// branch refs, one organization per page so a blocked organization can be
/// skipped without losing its siblings.
const BRANCHES_QUERY: &str = r#"query GetBranches($enterprise: String!, $cursorOrg: String, $cursorRepo: String, $cursorRef: String) {
  enterprise(slug: $enterprise) {
    organizations(first: 1, after: $cursorOrg) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        login
        repositories(first: 50, after: $cursorRepo) {
          pageInfo {
            hasNextPage
            endCursor
          }
          nodes {
            name
            defaultBranchRef {
              name
            }
            refs(first: 25, after: $cursorRef, refPrefix: "refs/heads/") {
              pageInfo {
                hasNextPage
                endCursor
              }
              nodes {
                name
                target {
                  ... on Commit {
                    author {
                      email
                      user {
                        login
                      }
                    }
                    committedDate
                  }
                }
                branchProtectionRule {
                  id
                }
              }
            }
          }
        }
      }
    }
  }
}"#;

/// Marker the endpoint puts in the error message when an organization's IP
/// allow list rejects the caller.
const IP_ALLOW_LIST_MARKER: &str = "IP allow list enabled";

/// Retry behavior for transport failures and throttle responses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (1-based). A server-provided
    /// `Retry-After` wins over the exponential schedule; both are capped.
    fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after {
            return wait.min(self.max_delay);
        }
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        backoff.min(self.max_delay)
    }
}

pub struct GithubClient {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
    retry: RetryPolicy,
}

impl GithubClient {
    pub fn new(endpoint: &str, token: &str) -> Result<Self> {
        Self::with_retry(endpoint, token, RetryPolicy::default())
    }

    pub fn with_retry(endpoint: &str, token: &str, retry: RetryPolicy) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ReaperError::config_error(format!("invalid API endpoint '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ReaperError::config_error(format!(
                "invalid API endpoint '{}': expected an http(s) URL",
                endpoint
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("branch-reaper/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            token: token.to_string(),
            retry,
        })
    }

    fn graphql_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("graphql");
        }
        url
    }

    /// Builds the ref-deletion URL through the path-segment API, so branch
    /// names carrying `#`, `%`, or spaces are encoded instead of truncating
    /// the path; `/` inside a branch name keeps separating segments.
    fn delete_url(&self, organization: &str, repository: &str, branch: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", organization, repository, "git", "refs", "heads"])
                .extend(branch.split('/'));
        }
        url
    }

    async fn attempt_fetch(
        &self,
        enterprise: &str,
        cursors: &CursorTriple,
    ) -> Attempt<FetchOutcome, ReaperError> {
        let body = serde_json::json!({
            "query": BRANCHES_QUERY,
            "variables": {
                "enterprise": enterprise,
                "cursorOrg": cursors.orgs,
                "cursorRepo": cursors.repos,
                "cursorRef": cursors.refs,
            }
        });

        let response = match self
            .http
            .post(self.graphql_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Transient {
                    reason: format!("request failed: {}", e),
                    retry_after: None,
                }
            }
        };

        let status = response.status();
        let retry_after = retry_after_header(response.headers());
        let exhausted = rate_limit_exhausted(response.headers());

        if let Some(kind) = throttle_kind(status, retry_after, exhausted) {
            return Attempt::Transient {
                reason: kind.describe().to_string(),
                retry_after,
            };
        }
        if status.is_server_error() {
            return Attempt::Transient {
                reason: format!("endpoint returned {}", status),
                retry_after: None,
            };
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Attempt::Fail(ReaperError::traversal(format!(
                "endpoint returned {}: {}",
                status,
                detail.trim()
            )));
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return Attempt::Transient {
                    reason: format!("failed to read response body: {}", e),
                    retry_after: None,
                }
            }
        };

        match parse_fetch_response(&text) {
            Ok(page) => Attempt::Complete(FetchOutcome::Advance(page)),
            Err(ParseFailure::Denied {
                organization,
                end_cursor,
            }) => Attempt::Complete(FetchOutcome::OrgSkipped {
                organization,
                end_cursor,
            }),
            Err(ParseFailure::Throttled(reason)) => Attempt::Transient {
                reason,
                retry_after,
            },
            Err(ParseFailure::Fatal(message)) => Attempt::Fail(ReaperError::traversal(message)),
        }
    }

    async fn attempt_delete(
        &self,
        organization: &str,
        repository: &str,
        branch: &str,
    ) -> Attempt<(), DeleteError> {
        let response = match self
            .http
            .delete(self.delete_url(organization, repository, branch))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Transient {
                    reason: format!("request failed: {}", e),
                    retry_after: None,
                }
            }
        };

        let status = response.status();
        if status.is_success() {
            return Attempt::Complete(());
        }

        let retry_after = retry_after_header(response.headers());
        let exhausted = rate_limit_exhausted(response.headers());

        if let Some(kind) = throttle_kind(status, retry_after, exhausted) {
            return Attempt::Transient {
                reason: kind.describe().to_string(),
                retry_after,
            };
        }
        if status.is_server_error() {
            return Attempt::Transient {
                reason: format!("endpoint returned {}", status),
                retry_after: None,
            };
        }

        // 404 (already gone), 403 (protected), 422 and friends are not worth
        // retrying.
        let body = response.text().await.unwrap_or_default();
        let mut message = api_error_message(&body);
        if message.is_empty() {
            message = status
                .canonical_reason()
                .unwrap_or("request rejected")
                .to_string();
        }
        Attempt::Fail(DeleteError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl BranchPageSource for GithubClient {
    async fn fetch_page(&self, enterprise: &str, cursors: &CursorTriple) -> Result<FetchOutcome> {
        debug!(
            "fetching branch page (orgs: {:?}, repos: {:?}, refs: {:?})",
            cursors.orgs, cursors.repos, cursors.refs
        );
        run_with_retry(
            &self.retry,
            || self.attempt_fetch(enterprise, cursors),
            ReaperError::traversal,
        )
        .await
    }
}

#[async_trait]
impl RefDeleter for GithubClient {
    async fn delete_branch(
        &self,
        organization: &str,
        repository: &str,
        branch: &str,
    ) -> DeleteResult<()> {
        run_with_retry(
            &self.retry,
            || self.attempt_delete(organization, repository, branch),
            DeleteError::Transport,
        )
        .await
    }
}

/// Drives one logical request to its final result: transient outcomes are
/// waited out and retried under `policy`, completions and final failures
/// return immediately, and a spent attempt budget becomes the caller's error
/// via `exhausted`.
async fn run_with_retry<T, E, F, Fut, X>(
    policy: &RetryPolicy,
    mut attempt: F,
    exhausted: X,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
    X: FnOnce(String) -> E,
{
    let mut attempt_no = 1;
    let last_reason = loop {
        match attempt().await {
            Attempt::Complete(value) => return Ok(value),
            Attempt::Fail(e) => return Err(e),
            Attempt::Transient {
                reason,
                retry_after,
            } => {
                if attempt_no >= policy.max_attempts {
                    break reason;
                }
                let delay = policy.delay_for(attempt_no, retry_after);
                warn!(
                    "{}, will retry in {}s (attempt {}/{})",
                    reason,
                    delay.as_secs(),
                    attempt_no,
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt_no += 1;
            }
        }
    };
    Err(exhausted(format!(
        "giving up after {} attempts: {}",
        attempt_no, last_reason
    )))
}

/// One request's result, before the retry loop decides what to do with it.
enum Attempt<T, E> {
    Complete(T),
    Transient {
        reason: String,
        retry_after: Option<Duration>,
    },
    Fail(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThrottleKind {
    RateLimited,
    AbuseDetected,
}

impl ThrottleKind {
    fn describe(self) -> &'static str {
        match self {
            ThrottleKind::RateLimited => "request quota exhausted",
            ThrottleKind::AbuseDetected => "abuse detection triggered",
        }
    }
}

/// Secondary rate limits come back as 403 with a `Retry-After` header;
/// primary limits are 429, or 403 with the remaining quota at zero.
fn throttle_kind(
    status: StatusCode,
    retry_after: Option<Duration>,
    quota_exhausted: bool,
) -> Option<ThrottleKind> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(ThrottleKind::RateLimited);
    }
    if status == StatusCode::FORBIDDEN {
        if quota_exhausted {
            return Some(ThrottleKind::RateLimited);
        }
        if retry_after.is_some() {
            return Some(ThrottleKind::AbuseDetected);
        }
    }
    None
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim() == "0")
        .unwrap_or(false)
}

/// Why a well-formed HTTP 200 response still did not yield a page.
enum ParseFailure {
    /// In-band `RATE_LIMITED` error; the request should be retried.
    Throttled(String),
    /// An organization's IP allow list rejected us; resume past it.
    Denied {
        organization: String,
        end_cursor: Option<String>,
    },
    Fatal(String),
}

fn parse_fetch_response(body: &str) -> std::result::Result<EnterprisePage, ParseFailure> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ParseFailure::Fatal(format!("malformed response body: {}", e)))?;

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            return Err(classify_query_errors(errors, &value));
        }
    }

    let response: wire::Response = serde_json::from_value(value)
        .map_err(|e| ParseFailure::Fatal(format!("unexpected response shape: {}", e)))?;
    let enterprise = response
        .data
        .and_then(|data| data.enterprise)
        .ok_or_else(|| {
            ParseFailure::Fatal(
                "response contained no enterprise data; check the enterprise slug".to_string(),
            )
        })?;
    Ok(enterprise.into_page())
}

fn classify_query_errors(errors: &[Value], response: &Value) -> ParseFailure {
    let rate_limited = errors
        .iter()
        .any(|e| e.get("type").and_then(Value::as_str) == Some("RATE_LIMITED"));
    if rate_limited {
        return ParseFailure::Throttled("request quota exhausted".to_string());
    }

    let messages: Vec<&str> = errors
        .iter()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
        .collect();

    if let Some(message) = messages.iter().find(|m| m.contains(IP_ALLOW_LIST_MARKER)) {
        if let Some(organization) = blocked_org_from_message(message) {
            // Partial data still carries the organization-level cursor, which
            // is exactly what skipping the blocked organization needs.
            let end_cursor = response
                .pointer("/data/enterprise/organizations/pageInfo/endCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            return ParseFailure::Denied {
                organization,
                end_cursor,
            };
        }
        return ParseFailure::Fatal(format!(
            "unrecognized IP allow list error: {}",
            message
        ));
    }

    ParseFailure::Fatal(format!("query failed: {}", messages.join("; ")))
}

fn blocked_org_from_message(message: &str) -> Option<String> {
    let pattern = Regex::new(
        r"Although you appear to have the correct authorization credentials, the `([^`]+)` organization",
    )
    .unwrap();
    pattern
        .captures(message)
        .map(|captures| captures[1].to_string())
}

/// Pull the `message` field out of a REST error body, falling back to the raw
/// text when the body is not the usual JSON shape.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
