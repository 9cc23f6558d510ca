// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resilience wrapper
//!
//! Every adapter call goes through [`ResilientCaller::call`]:
//!
//! ```text
//! idle -> in-flight -> success | timed-out | http-error | parse-error
//! ```
//!
//! - The optional deadline applies to each attempt. Expiry drops the
//!   in-flight transport future and yields [`ProviderError::Timeout`].
//! - A structured-output backend whose request is rejected with the
//!   unsupported-parameter marker is retried exactly once without the
//!   parameter. Any other failure propagates without retry.
//! - HTTP failures are classified through the error classifier table.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::call_log::{truncate_excerpt, truncate_to, CallLogSink, CallPhase, CallStatus, ProviderCallRecord};
use super::error_classifier::{classify, is_unsupported_structured_output};
use super::{CompletionBackend, CompletionRequest};
use crate::domain::llm::ProviderError;
use crate::domain::provider::ProviderId;
use crate::infrastructure::http::HttpTransport;

/// Vendor body text kept on an HTTP error.
const ERROR_BODY_CHARS: usize = 500;

pub struct ResilientCaller {
    provider: ProviderId,
    model: String,
    backend: Arc<dyn CompletionBackend>,
    transport: Arc<dyn HttpTransport>,
    timeout: Option<Duration>,
    call_log: Arc<dyn CallLogSink>,
}

struct AttemptRecord<'a> {
    phase: CallPhase,
    structured: bool,
    started: Instant,
    request_excerpt: &'a str,
}

impl ResilientCaller {
    pub fn new(
        provider: ProviderId,
        model: String,
        backend: Arc<dyn CompletionBackend>,
        transport: Arc<dyn HttpTransport>,
        timeout: Option<Duration>,
        call_log: Arc<dyn CallLogSink>,
    ) -> Self {
        Self {
            provider,
            model,
            backend,
            transport,
            timeout,
            call_log,
        }
    }

    pub fn backend(&self) -> &dyn CompletionBackend {
        self.backend.as_ref()
    }

    /// Same backend and transport under a different deadline.
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        Self {
            provider: self.provider.clone(),
            model: self.model.clone(),
            backend: self.backend.clone(),
            transport: self.transport.clone(),
            timeout,
            call_log: self.call_log.clone(),
        }
    }

    /// Sends `request` and parses the completion text with `parse`.
    pub async fn call<T, F>(
        &self,
        phase: CallPhase,
        request: &CompletionRequest,
        parse: F,
    ) -> Result<T, ProviderError>
    where
        T: Send,
        F: Fn(&str) -> Result<T, String> + Send + Sync,
    {
        let structured = phase.expects_json() && self.backend.supports_structured_output();

        match self.attempt(phase, request, structured, &parse).await {
            Err(ProviderError::UnsupportedCapability { .. }) if structured => {
                self.attempt(phase, request, false, &parse).await
            }
            result => result,
        }
    }

    async fn attempt<T, F>(
        &self,
        phase: CallPhase,
        request: &CompletionRequest,
        structured: bool,
        parse: &F,
    ) -> Result<T, ProviderError>
    where
        T: Send,
        F: Fn(&str) -> Result<T, String> + Send + Sync,
    {
        let http = self.backend.build_request(request, structured);
        let request_excerpt = http
            .body
            .as_ref()
            .map(|b| truncate_excerpt(&b.to_string()))
            .unwrap_or_default();
        let record = AttemptRecord {
            phase,
            structured,
            started: Instant::now(),
            request_excerpt: &request_excerpt,
        };

        let sent = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.transport.send(http)).await {
                Ok(sent) => sent,
                Err(_) => {
                    let error = ProviderError::Timeout {
                        provider: self.provider.clone(),
                        after: limit,
                    };
                    self.log(&record, CallStatus::Timeout, None, Some(&error), "");
                    return Err(error);
                }
            },
            None => self.transport.send(http).await,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let error = ProviderError::Connection {
                    provider: self.provider.clone(),
                    message: e.to_string(),
                };
                self.log(&record, CallStatus::ConnectionError, None, Some(&error), "");
                return Err(error);
            }
        };

        if !response.is_success() {
            if structured && is_unsupported_structured_output(response.status, &response.body) {
                let error = ProviderError::UnsupportedCapability {
                    provider: self.provider.clone(),
                    capability: "structured_output".to_string(),
                };
                self.log(&record, CallStatus::Downgraded, Some(response.status), Some(&error), &response.body);
                return Err(error);
            }

            let class = classify(self.backend.family(), response.status, &response.body);
            let error = ProviderError::Http {
                provider: self.provider.clone(),
                status: response.status,
                body: truncate_to(&response.body, ERROR_BODY_CHARS),
                class,
            };
            self.log(&record, CallStatus::HttpError, Some(response.status), Some(&error), &response.body);
            return Err(error);
        }

        match self.backend.extract_text(&response.body).and_then(|text| parse(&text)) {
            Ok(value) => {
                self.log(&record, CallStatus::Success, Some(response.status), None, &response.body);
                Ok(value)
            }
            Err(message) => {
                let error = ProviderError::Parse {
                    provider: self.provider.clone(),
                    message,
                };
                self.log(&record, CallStatus::ParseError, Some(response.status), Some(&error), &response.body);
                Err(error)
            }
        }
    }

    fn log(
        &self,
        record: &AttemptRecord<'_>,
        status: CallStatus,
        http_status: Option<u16>,
        error: Option<&ProviderError>,
        response_body: &str,
    ) {
        self.call_log.record(ProviderCallRecord {
            phase: record.phase,
            provider: self.provider.clone(),
            model: self.model.clone(),
            status,
            structured_output: record.structured,
            duration_ms: record.started.elapsed().as_millis() as u64,
            http_status,
            error: error.map(|e| e.to_string()),
            request_excerpt: record.request_excerpt.to_string(),
            response_excerpt: truncate_excerpt(response_body),
            recorded_at: chrono::Utc::now(),
        });
    }
}
