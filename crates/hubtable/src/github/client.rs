//! GitHub REST and GraphQL client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

use super::error::GitHubError;
use super::graphql::{GraphQlRequest, GraphQlResponse};
use super::token::TokenKind;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, header_get};
use crate::rate_limit::{ApiRateLimiter, GITHUB_DEFAULT_RPS, RateLimitInfo};
use crate::retry::{RetryConfig, retry_call};
use crate::table::PageToken;

/// Public GitHub REST root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("hubtable/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Fallback wait when a rate-limit response carries no reset time.
const DEFAULT_RATE_LIMIT_WAIT_SECS: i64 = 60;

/// Page number of the `rel="next"` target in a REST `Link` header.
///
/// Entries look like `<https://api.github.com/orgs/o/packages?page=2>; rel="next"`.
/// Targets that are not URLs or carry no numeric `page` are skipped.
pub fn next_page_link(header: &str) -> Option<u32> {
    header.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .filter_map(|param| param.trim().strip_prefix("rel="))
            .any(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"));
        if !is_next {
            return None;
        }

        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let url = reqwest::Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(name, _)| name == "page")
            .and_then(|(_, page)| page.parse().ok())
    })
}

/// The GraphQL endpoint for a REST root. GitHub Enterprise Server serves
/// REST under `/api/v3` and GraphQL under `/api/graphql`.
fn graphql_url_for(api_url: &str) -> String {
    match api_url.strip_suffix("/api/v3") {
        Some(host) => format!("{host}/api/graphql"),
        None => format!("{api_url}/graphql"),
    }
}

/// One REST page plus the pagination links that came with it.
#[derive(Debug, Clone)]
pub struct RestPage<T> {
    pub data: T,
    pub next_page: Option<u32>,
}

impl<T> RestPage<T> {
    pub fn next_token(&self) -> Option<PageToken> {
        self.next_page.map(PageToken::Number)
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// REST root, e.g. `https://api.github.com` or `https://ghe.example.com/api/v3`.
    pub base_url: String,
    /// Client-side pacing. `None` sends requests as fast as they come.
    pub requests_per_second: Option<u32>,
    pub retry: RetryConfig,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            requests_per_second: Some(GITHUB_DEFAULT_RPS),
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_requests_per_second(mut self, rps: Option<u32>) -> Self {
        self.requests_per_second = rps;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// GitHub API client shared by every table.
///
/// Cloning is cheap; clones share the transport and the rate limiter.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: Arc<String>,
    api_url: Arc<String>,
    graphql_url: Arc<String>,
    rate_limiter: Option<ApiRateLimiter>,
    retry: RetryConfig,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("token_kind", &self.token_kind())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client that talks to GitHub over reqwest.
    pub fn new(token: &str, options: ClientOptions) -> Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(options.timeout)?;
        Ok(Self::with_transport(token, options, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(
        token: &str,
        options: ClientOptions,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let api_url = options.base_url.trim_end_matches('/').to_string();
        let graphql_url = graphql_url_for(&api_url);

        Self {
            transport,
            token: Arc::new(token.to_string()),
            api_url: Arc::new(api_url),
            graphql_url: Arc::new(graphql_url),
            rate_limiter: options.requests_per_second.map(ApiRateLimiter::new),
            retry: options.retry,
        }
    }

    pub fn token_kind(&self) -> TokenKind {
        TokenKind::detect(&self.token)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    /// Build a REST URL from path segments and query parameters.
    ///
    /// Each segment is percent-encoded on its own, so a name holding `/`
    /// stays one segment.
    pub fn rest_url(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<reqwest::Url, GitHubError> {
        let invalid = || GitHubError::Decode(format!("invalid API root {}", self.api_url));
        let mut url = reqwest::Url::parse(&self.api_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().copied());
        }
        Ok(url)
    }

    /// GET the REST resource at `segments` and decode its JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GitHubError> {
        let url = self.rest_url(segments, &[])?;
        let (url, label) = (url.as_str(), url.path());

        retry_call(label, &self.retry, || self.get_json_once(url, label)).await
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        url: &str,
        label: &str,
    ) -> Result<T, GitHubError> {
        let response = self.execute(HttpRequest::get(url), label).await?;
        decode(&response.body, label)
    }

    /// GET one page of a paginated REST resource.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
        page: u32,
        per_page: u32,
    ) -> Result<RestPage<T>, GitHubError> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        let mut all_params = params.to_vec();
        all_params.push(("per_page", per_page.as_str()));
        all_params.push(("page", page.as_str()));

        let url = self.rest_url(segments, &all_params)?;
        let (url, label) = (url.as_str(), url.path());

        retry_call(label, &self.retry, || self.get_page_once(url, label)).await
    }

    async fn get_page_once<T: DeserializeOwned>(
        &self,
        url: &str,
        label: &str,
    ) -> Result<RestPage<T>, GitHubError> {
        let response = self.execute(HttpRequest::get(url), label).await?;
        let next_page = response.header("link").and_then(next_page_link);
        let data = decode(&response.body, label)?;
        Ok(RestPage { data, next_page })
    }

    /// Run a GraphQL query and decode its `data` object.
    ///
    /// Any entry in the response's `errors` array fails the call; partial
    /// data is never returned.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &Map<String, Json>,
    ) -> Result<T, GitHubError> {
        let label = operation_name(query);

        retry_call(label, &self.retry, || self.graphql_once(query, variables, label)).await
    }

    async fn graphql_once<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &Map<String, Json>,
        label: &str,
    ) -> Result<T, GitHubError> {
        let body = serde_json::to_vec(&GraphQlRequest { query, variables })
            .map_err(|e| GitHubError::Decode(e.to_string()))?;
        let request = HttpRequest::post(self.graphql_url.as_str(), body)
            .header("Content-Type", "application/json");

        let response = self.execute(request, label).await?;
        let envelope: GraphQlResponse<T> = decode(&response.body, label)?;

        if !envelope.errors.is_empty() {
            let errors = envelope.errors;
            if let Some(not_found) = errors.iter().find(|e| e.is_kind("NOT_FOUND")) {
                return Err(GitHubError::NotFound(not_found.message.clone()));
            }
            if errors.iter().any(|e| e.is_kind("RATE_LIMITED")) {
                return Err(rate_limited(&response));
            }
            return Err(GitHubError::GraphQl(errors));
        }

        envelope
            .data
            .ok_or_else(|| GitHubError::Decode(format!("{label}: response has no data")))
    }

    async fn execute(&self, request: HttpRequest, label: &str) -> Result<HttpResponse, GitHubError> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut request = request
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }

        let response = self.transport.send(request).await?;

        if let Some(info) = RateLimitInfo::from_headers(&response.headers) {
            tracing::trace!(
                label,
                limit = info.limit,
                remaining = info.remaining,
                resource = info.resource.as_deref().unwrap_or("unknown"),
                "rate limit status"
            );
        }

        if response.is_success() {
            Ok(response)
        } else {
            Err(error_for_status(&response, label))
        }
    }
}

/// The operation name of a GraphQL document, used as a log label.
fn operation_name(query: &str) -> &str {
    query
        .trim_start()
        .strip_prefix("query")
        .map(str::trim_start)
        .and_then(|rest| rest.split(|c: char| c == '(' || c == '{' || c.is_whitespace()).next())
        .filter(|name| !name.is_empty())
        .unwrap_or("graphql")
}

fn decode<T: DeserializeOwned>(body: &[u8], label: &str) -> Result<T, GitHubError> {
    serde_json::from_slice(body).map_err(|e| GitHubError::Decode(format!("{label}: {e}")))
}

fn rate_limited(response: &HttpResponse) -> GitHubError {
    let retry_after = header_get(&response.headers, "retry-after").and_then(|v| v.parse::<i64>().ok());
    let reset_at = match (retry_after, RateLimitInfo::from_headers(&response.headers)) {
        (Some(secs), _) => Utc::now() + chrono::Duration::seconds(secs),
        (None, Some(info)) => info.reset_at,
        (None, None) => Utc::now() + chrono::Duration::seconds(DEFAULT_RATE_LIMIT_WAIT_SECS),
    };
    GitHubError::RateLimited { reset_at }
}

fn error_for_status(response: &HttpResponse, label: &str) -> GitHubError {
    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .map(|b| b.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned());

    let exhausted = RateLimitInfo::from_headers(&response.headers)
        .map(|info| info.is_exhausted())
        .unwrap_or(false);
    let secondary = header_get(&response.headers, "retry-after").is_some()
        || message.to_ascii_lowercase().contains("rate limit");

    match response.status {
        401 => GitHubError::AuthRequired,
        429 => rate_limited(response),
        403 if exhausted || secondary => rate_limited(response),
        404 => GitHubError::NotFound(label.to_string()),
        status => GitHubError::Status { status, message },
    }
}
