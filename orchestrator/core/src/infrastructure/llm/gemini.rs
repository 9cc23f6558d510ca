// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gemini generateContent Backend
//
// Anti-Corruption Layer for Google Gemini. Structured output is requested
// with `generationConfig.responseMimeType = application/json`.

use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use super::{CompletionBackend, CompletionRequest};
use crate::domain::credential::ApiSecret;
use crate::domain::provider::{ProviderDescriptor, ProviderFamily};
use crate::infrastructure::http::HttpRequest;

pub struct GeminiBackend {
    base_url: String,
    api_key: ApiSecret,
    model: String,
    extra_headers: BTreeMap<String, String>,
    structured_output: bool,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiBackend {
    pub fn new(descriptor: &ProviderDescriptor, api_key: ApiSecret) -> Self {
        Self {
            base_url: descriptor.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: descriptor.model.clone(),
            extra_headers: descriptor.extra_headers.clone(),
            structured_output: descriptor.capabilities.structured_output,
        }
    }
}

impl CompletionBackend for GeminiBackend {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Gemini
    }

    fn supports_structured_output(&self) -> bool {
        self.structured_output
    }

    fn build_request(&self, request: &CompletionRequest, structured: bool) -> HttpRequest {
        let mut generation_config = json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        if structured {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": request.prompt}]}],
            "generationConfig": generation_config,
        });
        if !request.system.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": request.system}]});
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let mut http = HttpRequest::post(url, body)
            .header("x-goog-api-key", self.api_key.expose())
            .header("Content-Type", "application/json");
        for (name, value) in &self.extra_headers {
            http = http.header(name, value);
        }
        http
    }

    fn extract_text(&self, body: &str) -> Result<String, String> {
        let response: GeminiResponse =
            serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err("No response from model".to_string());
        }
        Ok(text)
    }
}
