// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure - Anti-Corruption Layer Implementations
//
// Each vendor family contributes a `CompletionBackend`: a pure wire codec
// that builds the vendor HTTP request and extracts completion text from the
// vendor response. `ProviderAdapter` implements the quiz capability contract
// once on top of any backend, with every call routed through the resilience
// wrapper.
//
// Family -> backend registration lives in `registry::backend_for`.

pub mod adapter;
pub mod anthropic;
pub mod call_log;
pub mod error_classifier;
pub mod gemini;
pub mod openai;
pub mod openai_compatible;
pub mod parsing;
pub mod prompts;
pub mod registry;
pub mod resilience;

pub use adapter::ProviderAdapter;
pub use registry::ProviderRegistry;

use crate::domain::provider::ProviderFamily;
use crate::infrastructure::http::HttpRequest;

/// Vendor-neutral completion parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Vendor wire protocol.
pub trait CompletionBackend: Send + Sync {
    fn family(&self) -> ProviderFamily;

    /// Whether the vendor accepts a JSON-output constraint parameter.
    fn supports_structured_output(&self) -> bool;

    /// Builds the HTTP request. `structured` is false after a downgrade or
    /// when the backend does not support the parameter.
    fn build_request(&self, request: &CompletionRequest, structured: bool) -> HttpRequest;

    /// Extracts the completion text from a 2xx response body.
    fn extract_text(&self, body: &str) -> Result<String, String>;
}
