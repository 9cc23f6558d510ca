// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI Chat Completions Backend
//
// Anti-Corruption Layer for the OpenAI chat completions dialect. Serves the
// `openai` family and the `openai_chat` presets (Mistral, Groq, OpenRouter,
// Together, Fireworks), which speak the same wire format at their own base
// URLs.

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{CompletionBackend, CompletionRequest};
use crate::domain::credential::ApiSecret;
use crate::domain::provider::{ProviderDescriptor, ProviderFamily};
use crate::infrastructure::http::HttpRequest;

pub struct OpenAiBackend {
    family: ProviderFamily,
    base_url: String,
    api_key: ApiSecret,
    model: String,
    extra_headers: BTreeMap<String, String>,
    structured_output: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(descriptor: &ProviderDescriptor, api_key: ApiSecret) -> Self {
        Self {
            family: descriptor.family,
            base_url: descriptor.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: descriptor.model.clone(),
            extra_headers: descriptor.extra_headers.clone(),
            structured_output: descriptor.capabilities.structured_output,
        }
    }
}

/// Chat completions body shared with the OpenAI-compatible backend.
pub(crate) fn chat_body(model: &str, request: &CompletionRequest, structured: bool) -> Value {
    let mut messages = Vec::with_capacity(2);
    if !request.system.is_empty() {
        messages.push(json!({"role": "system", "content": request.system}));
    }
    messages.push(json!({"role": "user", "content": request.prompt}));

    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": request.temperature,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if structured {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

pub(crate) fn extract_chat_text(body: &str) -> Result<String, String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {}", e))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| "No response from model".to_string())
}

impl CompletionBackend for OpenAiBackend {
    fn family(&self) -> ProviderFamily {
        self.family
    }

    fn supports_structured_output(&self) -> bool {
        self.structured_output
    }

    fn build_request(&self, request: &CompletionRequest, structured: bool) -> HttpRequest {
        let url = format!("{}/chat/completions", self.base_url);
        let mut http = HttpRequest::post(url, chat_body(&self.model, request, structured))
            .bearer(self.api_key.expose())
            .header("Content-Type", "application/json");
        for (name, value) in &self.extra_headers {
            http = http.header(name, value);
        }
        http
    }

    fn extract_text(&self, body: &str) -> Result<String, String> {
        extract_chat_text(body)
    }
}
