// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Adapter
//
// Implements the quiz capability contract once for every vendor family. The
// family-specific parts (request shape, auth, response envelope) live in the
// `CompletionBackend` held by the resilient caller.

use async_trait::async_trait;
use std::time::Duration;

use super::call_log::CallPhase;
use super::parsing::{self, Provenance};
use super::prompts;
use super::resilience::ResilientCaller;
use super::CompletionRequest;
use crate::domain::llm::{AiProvider, LivenessReport, ProviderDescription, ProviderError};
use crate::domain::provider::{ProviderDescriptor, ProviderId};
use crate::domain::quiz::{
    AmbiguityResult, EditContext, EditProposal, GeneratedItem, GenerationRequest, Illustration,
    QuizItem, ValidationCriteria, ValidationResult,
};

pub struct ProviderAdapter {
    descriptor: ProviderDescriptor,
    caller: ResilientCaller,
    probe: ResilientCaller,
}

impl ProviderAdapter {
    /// `liveness_timeout` bounds the probe; every other call uses the
    /// caller's own deadline.
    pub fn new(descriptor: ProviderDescriptor, caller: ResilientCaller, liveness_timeout: Option<Duration>) -> Self {
        let probe = caller.with_timeout(liveness_timeout);
        Self {
            descriptor,
            caller,
            probe,
        }
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn origin(&self) -> Provenance<'_> {
        Provenance {
            provider: &self.descriptor.id,
            model: &self.descriptor.model,
        }
    }

    fn prompt_failure(&self, error: prompts::PromptError) -> ProviderError {
        tracing::error!(provider = %self.descriptor.id, error = %error, "Prompt rendering failed");
        ProviderError::Configuration {
            provider: self.descriptor.id.clone(),
            message: error.to_string(),
        }
    }

    /// Requested quantity capped at the provider batch size.
    fn batch_size(&self, requested: u32) -> u32 {
        requested.min(self.descriptor.capabilities.max_batch_size.max(1))
    }
}

#[async_trait]
impl AiProvider for ProviderAdapter {
    fn id(&self) -> &ProviderId {
        &self.descriptor.id
    }

    fn model(&self) -> &str {
        &self.descriptor.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedItem>, ProviderError> {
        let amount = self.batch_size(request.quantity);
        if amount == 0 {
            return Ok(Vec::new());
        }
        if amount < request.quantity {
            tracing::debug!(
                provider = %self.descriptor.id,
                requested = request.quantity,
                amount,
                "Capping generation to provider batch size"
            );
        }

        let completion = CompletionRequest::new(
            prompts::GENERATION_SYSTEM,
            prompts::generation_prompt(request, amount).map_err(|e| self.prompt_failure(e))?,
            prompts::GENERATION_TEMPERATURE,
        );
        let origin = self.origin();
        let mut items = self
            .caller
            .call(CallPhase::Generation, &completion, |text| parsing::parse_generated(text, origin))
            .await?;
        items.truncate(amount as usize);

        tracing::info!(
            provider = %self.descriptor.id,
            model = %self.descriptor.model,
            count = items.len(),
            "Generated quiz items"
        );
        Ok(items)
    }

    async fn validate(
        &self,
        item: &QuizItem,
        criteria: &ValidationCriteria,
    ) -> Result<ValidationResult, ProviderError> {
        let completion = CompletionRequest::new(
            prompts::VALIDATION_SYSTEM,
            prompts::validation_prompt(item, criteria).map_err(|e| self.prompt_failure(e))?,
            prompts::VALIDATION_TEMPERATURE,
        );
        let origin = self.origin();
        self.caller
            .call(CallPhase::Validation, &completion, |text| {
                parsing::parse_validation(text, item, origin)
            })
            .await
    }

    async fn check_ambiguity(&self, item: &QuizItem) -> Result<AmbiguityResult, ProviderError> {
        let completion = CompletionRequest::new(
            prompts::AMBIGUITY_SYSTEM,
            prompts::ambiguity_prompt(item).map_err(|e| self.prompt_failure(e))?,
            prompts::AMBIGUITY_TEMPERATURE,
        );
        let origin = self.origin();
        self.caller
            .call(CallPhase::Ambiguity, &completion, |text| {
                parsing::parse_ambiguity(text, item, origin)
            })
            .await
    }

    async fn propose_edits(
        &self,
        item: &QuizItem,
        issues: &[String],
        analysis: &EditContext,
    ) -> Result<EditProposal, ProviderError> {
        let completion = CompletionRequest::new(
            prompts::EDIT_SYSTEM,
            prompts::edit_prompt(item, issues, analysis).map_err(|e| self.prompt_failure(e))?,
            prompts::EDIT_TEMPERATURE,
        );
        let origin = self.origin();
        self.caller
            .call(CallPhase::EditProposal, &completion, |text| {
                parsing::parse_edit_proposal(text, item, origin)
            })
            .await
    }

    async fn illustrate(&self, item: &QuizItem) -> Result<Illustration, ProviderError> {
        let completion = CompletionRequest::new(
            prompts::ILLUSTRATION_SYSTEM,
            prompts::illustration_prompt(item).map_err(|e| self.prompt_failure(e))?,
            prompts::ILLUSTRATION_TEMPERATURE,
        )
        .with_max_tokens(prompts::ILLUSTRATION_MAX_TOKENS);
        let origin = self.origin();
        self.caller
            .call(CallPhase::Illustration, &completion, |text| {
                parsing::parse_illustration(text, origin)
            })
            .await
    }

    async fn check_liveness(&self) -> LivenessReport {
        let completion = CompletionRequest::new("", prompts::LIVENESS_PROMPT, 0.0)
            .with_max_tokens(prompts::LIVENESS_MAX_TOKENS);
        match self.probe.call(CallPhase::Liveness, &completion, |_| Ok(())).await {
            Ok(()) => LivenessReport::available(self.descriptor.id.clone()),
            Err(e) => {
                tracing::warn!(provider = %self.descriptor.id, error = %e, "Liveness probe failed");
                LivenessReport::from_error(self.descriptor.id.clone(), &e)
            }
        }
    }

    fn describe(&self) -> ProviderDescription {
        ProviderDescription::from_capabilities(
            self.descriptor.id.clone(),
            self.descriptor.label.clone(),
            self.descriptor.model.clone(),
            &self.descriptor.capabilities,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credential::ApiSecret;
    use crate::domain::llm::LivenessError;
    use crate::domain::provider::{BuiltinProvider, ProviderCapabilities};
    use crate::infrastructure::http::{ScriptedResponse, ScriptedTransport};
    use crate::infrastructure::llm::call_log::InMemoryCallLog;
    use crate::infrastructure::llm::registry::backend_for;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn descriptor(id: &str, max_batch_size: u32) -> ProviderDescriptor {
        let builtin = BuiltinProvider::lookup(&ProviderId::parse(id).unwrap()).unwrap();
        ProviderDescriptor {
            id: builtin.provider_id(),
            label: builtin.label.into(),
            family: builtin.family,
            model: builtin.default_model.into(),
            base_url: builtin.base_url.into(),
            extra_headers: BTreeMap::new(),
            capabilities: ProviderCapabilities {
                structured_output: true,
                max_batch_size,
            },
            is_custom: false,
        }
    }

    fn adapter(id: &str, transport: Arc<ScriptedTransport>, max_batch_size: u32) -> ProviderAdapter {
        let descriptor = descriptor(id, max_batch_size);
        let backend = backend_for(&descriptor, ApiSecret::new("key-1234").unwrap()).unwrap();
        let caller = ResilientCaller::new(
            descriptor.id.clone(),
            descriptor.model.clone(),
            backend,
            transport,
            Some(Duration::from_secs(60)),
            Arc::new(InMemoryCallLog::new()),
        );
        ProviderAdapter::new(descriptor, caller, Some(Duration::from_secs(15)))
    }

    fn chat(content: &str) -> String {
        json!({"choices": [{"message": {"content": content}}]}).to_string()
    }

    fn question(n: u8) -> serde_json::Value {
        json!({
            "question_sv": format!("Fråga {}?", n),
            "question_en": format!("Question {}?", n),
            "options_sv": ["a", "b", "c", "d"],
            "options_en": ["a", "b", "c", "d"],
            "correctOption": n % 4,
            "explanation_sv": "e",
            "explanation_en": "e",
            "background_sv": "b",
            "background_en": "b"
        })
    }

    fn sample_item() -> QuizItem {
        QuizItem {
            question_sv: "Vad är 2+2?".into(),
            question_en: "What is 2+2?".into(),
            options_sv: vec!["3".into(), "4".into(), "5".into(), "22".into()],
            options_en: vec!["3".into(), "4".into(), "5".into(), "22".into()],
            correct_option: 1,
            explanation_sv: String::new(),
            explanation_en: String::new(),
            background_sv: "Aritmetik".into(),
            background_en: "Arithmetic".into(),
            emoji: None,
            target_audience: None,
        }
    }

    #[tokio::test]
    async fn test_generate_caps_batch_and_stamps_provenance() {
        let content = json!({"questions": [question(0), question(1), question(2), question(3)]}).to_string();
        let transport = Arc::new(ScriptedTransport::new().route("api.groq.com", ScriptedResponse::ok(chat(&content))));
        let adapter = adapter("groq", transport.clone(), 3);

        let items = adapter.generate(&GenerationRequest::new(10)).await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.provider.as_str() == "groq" && i.model == "llama-3.1-8b-instant"));

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["temperature"], json!(prompts::GENERATION_TEMPERATURE));
        assert!(body["messages"][1]["content"].as_str().unwrap().starts_with("Create 3 quiz questions"));
    }

    #[tokio::test]
    async fn test_validate_through_anthropic() {
        let verdict = json!({"isValid": true, "confidence": 92, "issues": [], "suggestions": [], "feedback": "ok"});
        let body = json!({"content": [{"type": "text", "text": format!("```json\n{}\n```", verdict)}]}).to_string();
        let transport = Arc::new(ScriptedTransport::new().route("api.anthropic.com", ScriptedResponse::ok(body)));
        let adapter = adapter("anthropic", transport, 3);

        let result = adapter.validate(&sample_item(), &ValidationCriteria::default()).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.confidence, 92);
        assert_eq!(result.provider.as_str(), "anthropic");
    }

    #[tokio::test]
    async fn test_illustrate_through_gemini() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": " ➕\n"}]}}]}).to_string();
        let transport = Arc::new(ScriptedTransport::new().route("generativelanguage", ScriptedResponse::ok(body)));
        let adapter = adapter("gemini", transport.clone(), 3);

        let illustration = adapter.illustrate(&sample_item()).await.unwrap();
        assert_eq!(illustration.emoji, "➕");
        let request = transport.requests()[0].body.clone().unwrap();
        assert!(request["generationConfig"].get("responseMimeType").is_none());
    }

    #[tokio::test]
    async fn test_liveness_classifies_credit_exhaustion() {
        let transport = Arc::new(ScriptedTransport::new().route(
            "api.openai.com",
            ScriptedResponse::status(429, r#"{"error":{"code":"insufficient_quota","message":"You exceeded your current quota"}}"#),
        ));
        let adapter = adapter("openai", transport.clone(), 3);

        let report = adapter.check_liveness().await;
        assert!(!report.available);
        assert_eq!(report.error, Some(LivenessError::InsufficientCredits));
        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["max_tokens"], 5);
        assert_eq!(body["messages"][0]["content"], "Hi");
    }

    #[tokio::test]
    async fn test_describe_reports_capabilities() {
        let adapter = adapter("mistral", Arc::new(ScriptedTransport::new()), 5);
        let description = adapter.describe();
        assert_eq!(description.max_batch_size, 5);
        assert_eq!(description.supported_languages, vec!["sv", "en"]);
        assert_eq!(description.capabilities.len(), 5);
    }
}
