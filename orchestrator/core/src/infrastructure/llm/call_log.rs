// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider call log
//
// One record per outbound attempt. Excerpts are bounded so a runaway vendor
// response cannot flood the log sink.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::provider::ProviderId;

pub const MAX_EXCERPT_CHARS: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Generation,
    Validation,
    Ambiguity,
    EditProposal,
    Illustration,
    Liveness,
}

impl CallPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Validation => "validation",
            Self::Ambiguity => "ambiguity",
            Self::EditProposal => "edit_proposal",
            Self::Illustration => "illustration",
            Self::Liveness => "liveness",
        }
    }

    /// Phases whose response is a JSON document.
    pub fn expects_json(&self) -> bool {
        !matches!(self, Self::Illustration | Self::Liveness)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Timeout,
    HttpError,
    ParseError,
    ConnectionError,
    /// Structured output rejected; a downgraded retry follows.
    Downgraded,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::ParseError => "parse_error",
            Self::ConnectionError => "connection_error",
            Self::Downgraded => "downgraded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCallRecord {
    pub phase: CallPhase,
    pub provider: ProviderId,
    pub model: String,
    pub status: CallStatus,
    pub structured_output: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_excerpt: String,
    pub response_excerpt: String,
    pub recorded_at: DateTime<Utc>,
}

pub trait CallLogSink: Send + Sync {
    fn record(&self, record: ProviderCallRecord);
}

/// Emits each record as a structured `tracing` event and updates the
/// provider call metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCallLog;

impl CallLogSink for TracingCallLog {
    fn record(&self, record: ProviderCallRecord) {
        metrics::counter!(
            "geoquest_ai_provider_calls_total",
            "provider" => record.provider.to_string(),
            "phase" => record.phase.as_str(),
            "status" => record.status.as_str()
        )
        .increment(1);
        metrics::histogram!(
            "geoquest_ai_provider_call_duration_ms",
            "provider" => record.provider.to_string(),
            "phase" => record.phase.as_str()
        )
        .record(record.duration_ms as f64);

        match record.status {
            CallStatus::Success => tracing::debug!(
                phase = record.phase.as_str(),
                provider = %record.provider,
                model = %record.model,
                duration_ms = record.duration_ms,
                structured_output = record.structured_output,
                "Provider call succeeded"
            ),
            CallStatus::Downgraded => tracing::info!(
                phase = record.phase.as_str(),
                provider = %record.provider,
                model = %record.model,
                duration_ms = record.duration_ms,
                "Structured output rejected, retrying without it"
            ),
            _ => tracing::warn!(
                phase = record.phase.as_str(),
                provider = %record.provider,
                model = %record.model,
                status = record.status.as_str(),
                http_status = ?record.http_status,
                duration_ms = record.duration_ms,
                error = record.error.as_deref().unwrap_or(""),
                response_excerpt = %record.response_excerpt,
                "Provider call failed"
            ),
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCallLog {
    records: Arc<Mutex<Vec<ProviderCallRecord>>>,
}

impl InMemoryCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProviderCallRecord> {
        self.records.lock().clone()
    }
}

impl CallLogSink for InMemoryCallLog {
    fn record(&self, record: ProviderCallRecord) {
        self.records.lock().push(record);
    }
}

pub fn truncate_excerpt(text: &str) -> String {
    truncate_to(text, MAX_EXCERPT_CHARS)
}

pub fn truncate_to(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{}…(truncated {} chars)", kept, total - max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_excerpt() {
        assert_eq!(truncate_excerpt("short"), "short");

        let long = "å".repeat(MAX_EXCERPT_CHARS + 5);
        let truncated = truncate_excerpt(&long);
        assert!(truncated.ends_with("…(truncated 5 chars)"));
        assert_eq!(
            truncated.chars().count(),
            MAX_EXCERPT_CHARS + "…(truncated 5 chars)".chars().count()
        );
    }

    #[test]
    fn test_in_memory_sink_collects() {
        let sink = InMemoryCallLog::new();
        sink.record(ProviderCallRecord {
            phase: CallPhase::Liveness,
            provider: ProviderId::parse("groq").unwrap(),
            model: "m".into(),
            status: CallStatus::Success,
            structured_output: false,
            duration_ms: 3,
            http_status: Some(200),
            error: None,
            request_excerpt: String::new(),
            response_excerpt: String::new(),
            recorded_at: Utc::now(),
        });
        assert_eq!(sink.records().len(), 1);
    }
}
