// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI-Compatible Backend
//
// Generic backend for operator-declared endpoints speaking the chat
// completions dialect (vLLM, LM Studio, LiteLLM, Azure-style gateways).
// Parameterised by endpoint, static headers, structured-output support and
// batch cap; none of these are assumed from a vendor catalog.

use std::collections::BTreeMap;

use super::openai::{chat_body, extract_chat_text};
use super::{CompletionBackend, CompletionRequest};
use crate::domain::credential::ApiSecret;
use crate::domain::llm::ProviderError;
use crate::domain::provider::{ProviderDescriptor, ProviderFamily};
use crate::infrastructure::http::HttpRequest;

pub struct OpenAiCompatibleBackend {
    completions_url: String,
    api_key: ApiSecret,
    model: String,
    extra_headers: BTreeMap<String, String>,
    structured_output: bool,
}

impl OpenAiCompatibleBackend {
    pub fn new(descriptor: &ProviderDescriptor, api_key: ApiSecret) -> Result<Self, ProviderError> {
        let base = descriptor.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ProviderError::Configuration {
                provider: descriptor.id.clone(),
                message: "Custom provider requires a base URL".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ProviderError::Configuration {
                provider: descriptor.id.clone(),
                message: format!("Base URL must be http(s): {}", base),
            });
        }
        if descriptor.model.trim().is_empty() {
            return Err(ProviderError::Configuration {
                provider: descriptor.id.clone(),
                message: "Custom provider requires a model".to_string(),
            });
        }

        // Accept either a base URL or the full completions URL
        let completions_url = if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        };

        Ok(Self {
            completions_url,
            api_key,
            model: descriptor.model.trim().to_string(),
            extra_headers: descriptor.extra_headers.clone(),
            structured_output: descriptor.capabilities.structured_output,
        })
    }

    /// Gateways authenticating with their own header (e.g. `api-key`) declare
    /// it in the static headers; the bearer header is then omitted.
    fn overrides_auth(&self) -> bool {
        self.extra_headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("authorization") || k.eq_ignore_ascii_case("api-key"))
    }
}

impl CompletionBackend for OpenAiCompatibleBackend {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::OpenAiCompat
    }

    fn supports_structured_output(&self) -> bool {
        self.structured_output
    }

    fn build_request(&self, request: &CompletionRequest, structured: bool) -> HttpRequest {
        let mut http = HttpRequest::post(
            self.completions_url.clone(),
            chat_body(&self.model, request, structured),
        )
        .header("Content-Type", "application/json");
        if !self.overrides_auth() {
            http = http.bearer(self.api_key.expose());
        }
        for (name, value) in &self.extra_headers {
            http = http.header(name, value);
        }
        http
    }

    fn extract_text(&self, body: &str) -> Result<String, String> {
        extract_chat_text(body)
    }
}
