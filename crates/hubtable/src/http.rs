//! Transport boundary for all HTTP I/O.
//!
//! The GitHub client builds an [`HttpRequest`] and hands it to an
//! [`HttpTransport`]; it never touches `reqwest` itself. [`ReqwestTransport`]
//! is the production transport. Unit tests script a `MockTransport`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// The two methods GitHub tables need: REST reads and GraphQL posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Header name/value pairs in wire order. Lookups ignore ASCII case.
pub type HttpHeaders = Vec<(String, String)>;

/// First value of header `name`, compared case-insensitively.
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    fn new(method: HttpMethod, url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HttpHeaders::new(),
            body,
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url, Vec::new())
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self::new(HttpMethod::Post, url, body)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        HttpError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// [`HttpTransport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// A client whose every request is bounded by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let builder = headers.iter().fold(
            self.client.request(method.into(), url.as_str()),
            |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
        );
        let builder = if body.is_empty() { builder } else { builder.body(body) };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        // Non-UTF-8 header values carry nothing the client reads.
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub use mock::MockTransport;

#[cfg(test)]
mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard};

    use super::*;

    #[derive(Default)]
    struct Script {
        /// Queued responses per (method, url), answered front first.
        routes: Vec<((HttpMethod, String), VecDeque<HttpResponse>)>,
        requests: Vec<HttpRequest>,
    }

    /// In-memory transport that replays scripted responses.
    ///
    /// Consecutive responses for the same method and URL are answered in the
    /// order they were pushed, which is how successive GraphQL pages (all
    /// POSTed to one URL) are scripted. Clones share one script.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        script: Arc<Mutex<Script>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn script(&self) -> MutexGuard<'_, Script> {
            self.script.lock().expect("mock transport lock poisoned")
        }

        pub fn push_response(&self, method: HttpMethod, url: impl Into<String>, response: HttpResponse) {
            let key = (method, url.into());
            let mut script = self.script();
            match script.routes.iter_mut().find(|(route, _)| *route == key) {
                Some((_, queue)) => queue.push_back(response),
                None => script.routes.push((key, VecDeque::from([response]))),
            }
        }

        /// Queue a 200 response with a JSON body.
        pub fn push_json(&self, method: HttpMethod, url: impl Into<String>, body: serde_json::Value) {
            let response = HttpResponse {
                status: 200,
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: serde_json::to_vec(&body).expect("serializable mock body"),
            };
            self.push_response(method, url, response);
        }

        /// Every request sent so far, oldest first.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.script().requests.clone()
        }

        /// Request bodies parsed as JSON; bodiless requests read as `null`.
        pub fn json_bodies(&self) -> Vec<serde_json::Value> {
            self.requests()
                .iter()
                .map(|request| serde_json::from_slice(&request.body).unwrap_or_default())
                .collect()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let mut script = self.script();
            let method = request.method;
            let url = request.url.clone();
            script.requests.push(request);

            script
                .routes
                .iter_mut()
                .find(|((m, u), _)| *m == method && *u == url)
                .and_then(|(_, queue)| queue.pop_front())
                .ok_or_else(|| HttpError::NoMockResponse {
                    method: method.as_str().to_string(),
                    url,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const GRAPHQL: &str = "https://api.github.com/graphql";

    #[test]
    fn test_header_lookup_ignores_case_and_takes_first() {
        let headers: HttpHeaders = vec![
            ("X-RateLimit-Remaining".to_string(), "42".to_string()),
            ("x-ratelimit-remaining".to_string(), "41".to_string()),
        ];
        assert_eq!(header_get(&headers, "x-ratelimit-remaining"), Some("42"));
        assert_eq!(header_get(&headers, "X-RATELIMIT-REMAINING"), Some("42"));
        assert_eq!(header_get(&headers, "link"), None);
    }

    #[test]
    fn test_graphql_request_shape() {
        let request = HttpRequest::post(GRAPHQL, br#"{"query":"{viewer{login}}"}"#.to_vec())
            .header("Authorization", "Bearer ghp_x");

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(reqwest::Method::from(request.method), reqwest::Method::POST);
        assert_eq!(header_get(&request.headers, "authorization"), Some("Bearer ghp_x"));
        assert!(HttpRequest::get("https://api.github.com/rate_limit").body.is_empty());
    }

    #[test]
    fn test_success_is_2xx_only() {
        let response = |status| HttpResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(304).is_success());
        assert!(!response(404).is_success());
    }

    #[tokio::test]
    async fn test_mock_replays_pages_in_order() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Post, GRAPHQL, json!({"page": 1}));
        transport.push_json(HttpMethod::Post, GRAPHQL, json!({"page": 2}));

        let first = transport
            .send(HttpRequest::post(GRAPHQL, br#"{"cursor":null}"#.to_vec()))
            .await
            .unwrap();
        let second = transport
            .send(HttpRequest::post(GRAPHQL, br#"{"cursor":"c1"}"#.to_vec()))
            .await
            .unwrap();

        assert_eq!(first.body, br#"{"page":1}"#.to_vec());
        assert_eq!(second.body, br#"{"page":2}"#.to_vec());
        assert_eq!(
            transport.json_bodies(),
            vec![json!({"cursor": null}), json!({"cursor": "c1"})]
        );
    }

    #[tokio::test]
    async fn test_mock_distinguishes_method_and_url() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, "https://api.github.com/rate_limit", json!({}));

        let err = transport.send(HttpRequest::post("https://api.github.com/rate_limit", Vec::new())).await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::NoMockResponse { ref method, ref url }
                if method == "POST" && url == "https://api.github.com/rate_limit"
        ));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.json_bodies(), vec![serde_json::Value::Null]);
    }

    #[tokio::test]
    async fn test_reqwest_transport_reports_bad_urls() {
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(1)).unwrap();
        let err = transport.send(HttpRequest::get("not a url")).await.unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
