// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Anthropic Messages Backend
//
// Anti-Corruption Layer for the Anthropic messages API. There is no JSON
// output parameter; prompts carry the JSON contract instead.

use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use super::{CompletionBackend, CompletionRequest};
use crate::domain::credential::ApiSecret;
use crate::domain::provider::{ProviderDescriptor, ProviderFamily};
use crate::infrastructure::http::HttpRequest;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicBackend {
    base_url: String,
    api_key: ApiSecret,
    model: String,
    extra_headers: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type", default)]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicBackend {
    pub fn new(descriptor: &ProviderDescriptor, api_key: ApiSecret) -> Self {
        Self {
            base_url: descriptor.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: descriptor.model.clone(),
            extra_headers: descriptor.extra_headers.clone(),
        }
    }
}

impl CompletionBackend for AnthropicBackend {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Anthropic
    }

    fn supports_structured_output(&self) -> bool {
        false
    }

    fn build_request(&self, request: &CompletionRequest, _structured: bool) -> HttpRequest {
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        let mut http = HttpRequest::post(format!("{}/messages", self.base_url), body)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json");
        for (name, value) in &self.extra_headers {
            http = http.header(name, value);
        }
        http
    }

    fn extract_text(&self, body: &str) -> Result<String, String> {
        let response: AnthropicResponse =
            serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;
        let text: String = response
            .content
            .into_iter()
            .filter(|c| c.content_type.is_empty() || c.content_type == "text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err("No response from model".to_string());
        }
        Ok(text)
    }
}
