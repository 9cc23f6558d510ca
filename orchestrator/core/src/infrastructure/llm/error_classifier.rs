// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Vendor error classification
//!
//! Failed HTTP calls are mapped onto [`CredentialErrorClass`] through an
//! ordered rule table of `(family, status, body pattern) -> class`. The first
//! matching rule wins; vendor-specific rules precede generic ones. Body
//! patterns are matched case-insensitively.
//!
//! Bump [`RULES_VERSION`] whenever the table changes so call logs can be
//! correlated with the rules that produced them.
//!
//! The structured-output downgrade marker is detected separately by
//! [`is_unsupported_structured_output`].

use crate::domain::llm::CredentialErrorClass;
use crate::domain::provider::ProviderFamily;

pub const RULES_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    /// `None` matches every family.
    pub family: Option<ProviderFamily>,
    /// `None` matches every status.
    pub status: Option<u16>,
    /// Lowercase substring of the response body. `None` matches any body.
    pub pattern: Option<&'static str>,
    pub class: CredentialErrorClass,
}

const fn rule(
    family: Option<ProviderFamily>,
    status: Option<u16>,
    pattern: Option<&'static str>,
    class: CredentialErrorClass,
) -> ClassificationRule {
    ClassificationRule {
        family,
        status,
        pattern,
        class,
    }
}

use CredentialErrorClass::{Authentication, InsufficientCredits, RateLimit};
use ProviderFamily::{Anthropic, Gemini, OpenAi, OpenAiChat};

pub const RULES: &[ClassificationRule] = &[
    // Vendor-specific
    rule(Some(OpenAi), None, Some("insufficient_quota"), InsufficientCredits),
    rule(Some(OpenAi), None, Some("billing_hard_limit"), InsufficientCredits),
    rule(Some(Anthropic), None, Some("credit balance"), InsufficientCredits),
    rule(Some(Anthropic), Some(529), None, RateLimit),
    rule(Some(Anthropic), None, Some("overloaded_error"), RateLimit),
    rule(Some(OpenAiChat), None, Some("quota"), InsufficientCredits),
    rule(Some(Gemini), None, Some("resource_exhausted"), RateLimit),
    rule(Some(Gemini), None, Some("api_key_invalid"), Authentication),
    // Generic body heuristics
    rule(None, None, Some("credit"), InsufficientCredits),
    rule(None, None, Some("balance"), InsufficientCredits),
    rule(None, None, Some("insufficient"), InsufficientCredits),
    rule(None, None, Some("billing"), InsufficientCredits),
    rule(None, None, Some("rate limit"), RateLimit),
    rule(None, None, Some("rate_limit"), RateLimit),
    rule(None, None, Some("too many requests"), RateLimit),
    rule(None, None, Some("quota"), RateLimit),
    rule(None, None, Some("authentication"), Authentication),
    rule(None, None, Some("api key"), Authentication),
    rule(None, None, Some("api_key"), Authentication),
    rule(None, None, Some("unauthorized"), Authentication),
    // Status fallbacks
    rule(None, Some(402), None, InsufficientCredits),
    rule(None, Some(429), None, RateLimit),
    rule(None, Some(401), None, Authentication),
    rule(None, Some(403), None, Authentication),
];

impl ClassificationRule {
    fn matches(&self, family: ProviderFamily, status: u16, body_lower: &str) -> bool {
        self.family.is_none_or(|f| f == family)
            && self.status.is_none_or(|s| s == status)
            && self.pattern.is_none_or(|p| body_lower.contains(p))
    }
}

pub fn classify(family: ProviderFamily, status: u16, body: &str) -> CredentialErrorClass {
    classify_with(RULES, family, status, body)
}

pub fn classify_with(
    rules: &[ClassificationRule],
    family: ProviderFamily,
    status: u16,
    body: &str,
) -> CredentialErrorClass {
    let body_lower = body.to_lowercase();
    rules
        .iter()
        .find(|r| r.matches(family, status, &body_lower))
        .map(|r| r.class)
        .unwrap_or(CredentialErrorClass::Unknown)
}

/// Parameter names that constrain output to JSON across vendor dialects.
const STRUCTURED_OUTPUT_PARAMS: &[&str] = &["response_format", "json_object", "responsemimetype", "response_mime_type"];

const UNSUPPORTED_MARKERS: &[&str] = &[
    "not supported",
    "unsupported",
    "unknown parameter",
    "unrecognized",
    "extra inputs are not permitted",
    "invalid parameter",
    "not allowed",
];

/// True when a 4xx body says the structured-output parameter itself was
/// rejected.
pub fn is_unsupported_structured_output(status: u16, body: &str) -> bool {
    if !(400..500).contains(&status) || status == 401 || status == 403 || status == 429 {
        return false;
    }
    let body_lower = body.to_lowercase();
    STRUCTURED_OUTPUT_PARAMS.iter().any(|p| body_lower.contains(p))
        && UNSUPPORTED_MARKERS.iter().any(|m| body_lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_heuristics() {
        assert_eq!(
            classify(ProviderFamily::OpenAiCompat, 400, "Your credit is exhausted"),
            InsufficientCredits
        );
        assert_eq!(classify(ProviderFamily::OpenAiCompat, 500, "rate_limit hit"), RateLimit);
        assert_eq!(
            classify(ProviderFamily::OpenAiCompat, 400, "Invalid API key provided"),
            Authentication
        );
        assert_eq!(classify(ProviderFamily::OpenAiCompat, 401, ""), Authentication);
        assert_eq!(classify(ProviderFamily::OpenAiCompat, 429, ""), RateLimit);
        assert_eq!(
            classify(ProviderFamily::OpenAiCompat, 500, "internal error"),
            CredentialErrorClass::Unknown
        );
    }

    #[test]
    fn test_vendor_rules_take_precedence() {
        // OpenAI reports quota exhaustion with a 429
        assert_eq!(
            classify(ProviderFamily::OpenAi, 429, r#"{"error":{"code":"insufficient_quota"}}"#),
            InsufficientCredits
        );
        assert_eq!(classify(ProviderFamily::OpenAiChat, 429, "quota exceeded"), InsufficientCredits);
        assert_eq!(classify(ProviderFamily::Gemini, 429, "quota exceeded"), RateLimit);
        assert_eq!(
            classify(ProviderFamily::Gemini, 429, r#"{"status":"RESOURCE_EXHAUSTED"}"#),
            RateLimit
        );
        assert_eq!(classify(ProviderFamily::Anthropic, 529, "overloaded"), RateLimit);
    }

    #[test]
    fn test_unsupported_structured_output_marker() {
        assert!(is_unsupported_structured_output(
            400,
            r#"{"error":{"message":"'response_format' of type 'json_object' is not supported with this model."}}"#
        ));
        assert!(is_unsupported_structured_output(422, "Unknown parameter: response_format"));
        assert!(!is_unsupported_structured_output(400, "max_tokens is not supported"));
        assert!(!is_unsupported_structured_output(500, "response_format unsupported"));
        assert!(!is_unsupported_structured_output(401, "response_format unsupported"));
    }

    #[test]
    fn test_custom_rule_table() {
        let rules = [rule(Some(ProviderFamily::OpenAiCompat), Some(418), None, RateLimit)];
        assert_eq!(classify_with(&rules, ProviderFamily::OpenAiCompat, 418, ""), RateLimit);
        assert_eq!(
            classify_with(&rules, ProviderFamily::OpenAi, 418, ""),
            CredentialErrorClass::Unknown
        );
    }
}
