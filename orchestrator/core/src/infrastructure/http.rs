// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Outbound HTTP Transport
//
// JSON request/response seam between vendor backends and the network.
// Cancellation is cooperative: dropping the `send` future aborts the
// in-flight request, which is how per-call deadlines are enforced.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport. Non-2xx responses are returned, not raised, so
/// callers can classify the body.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Adds a connect timeout. Overall call deadlines are applied by the
    /// resilience layer, not here.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest(e.to_string())
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Canned response for [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl ScriptedResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }

    /// Responds only after `delay` has elapsed.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct Route {
    url_contains: String,
    responses: VecDeque<ScriptedResponse>,
}

/// In-memory transport that replays canned responses per URL fragment and
/// records every request. Used for offline runs and tests.
///
/// The last response queued on a route repeats once the queue drains.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for requests whose URL contains `url_contains`.
    /// Routes are matched in registration order.
    pub fn route(self, url_contains: impl Into<String>, response: ScriptedResponse) -> Self {
        let url_contains = url_contains.into();
        {
            let mut routes = self.routes.lock();
            match routes.iter_mut().find(|r| r.url_contains == url_contains) {
                Some(route) => route.responses.push_back(response),
                None => routes.push(Route {
                    url_contains,
                    responses: VecDeque::from([response]),
                }),
            }
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, url_contains: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.contains(url_contains))
            .count()
    }

    fn next_response(&self, url: &str) -> Option<ScriptedResponse> {
        let mut routes = self.routes.lock();
        let route = routes.iter_mut().find(|r| url.contains(&r.url_contains))?;
        if route.responses.len() > 1 {
            route.responses.pop_front()
        } else {
            route.responses.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        let response = self
            .next_response(&url)
            .ok_or_else(|| TransportError::Connection(format!("No scripted response for {}", url)))?;
        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(HttpResponse {
            status: response.status,
            body: response.body,
        })
    }
}
