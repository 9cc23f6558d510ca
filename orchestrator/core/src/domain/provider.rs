// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provider Descriptors
//!
//! Static identity of every AI backend the orchestrator can talk to: the
//! built-in vendor catalog plus operator-declared custom endpoints.
//!
//! | Type | Description |
//! |------|-------------|
//! | `ProviderId` | Normalised (trimmed, lowercase) provider key |
//! | `ProviderFamily` | Wire protocol family used to pick a backend |
//! | `ProviderDescriptor` | Label, model, endpoint, headers, capabilities |
//! | `BuiltinProvider` | Catalog entry for a vendor shipped by default |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default number of questions a single generation request may ask for.
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 3;

/// Normalised provider identifier.
///
/// Construction trims and lowercases the input so that `"OpenAI "` and
/// `"openai"` address the same row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Returns `None` when the value is blank after trimming.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// For compile-time constants that are already normalised.
    pub(crate) fn from_static(id: &'static str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_builtin(&self) -> bool {
        BuiltinProvider::lookup(self).is_some()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProviderId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "provider id cannot be empty".to_string())
    }
}

impl From<ProviderId> for String {
    fn from(id: ProviderId) -> Self {
        id.0
    }
}

/// Wire protocol family. Selects which backend implementation the
/// registry constructs for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// OpenAI chat completions with `response_format` support.
    OpenAi,
    /// Vendors speaking the OpenAI chat completions dialect (Mistral, Groq, ...).
    OpenAiChat,
    /// Anthropic messages API.
    Anthropic,
    /// Google Gemini `generateContent`.
    Gemini,
    /// Operator-declared endpoint compatible with OpenAI chat completions.
    OpenAiCompat,
}

impl ProviderFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenAiChat => "openai_chat",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::OpenAiCompat => "openai_compat",
        }
    }

    /// Resolves the stored `provider_type` column. `builtin` defers to the
    /// catalog entry for the id.
    pub fn from_provider_type(provider_type: &str, id: &ProviderId) -> Option<Self> {
        match provider_type.trim().to_lowercase().as_str() {
            "openai_compat" | "openai-compatible" | "custom" => Some(Self::OpenAiCompat),
            "openai" => Some(Self::OpenAi),
            "openai_chat" => Some(Self::OpenAiChat),
            "anthropic" => Some(Self::Anthropic),
            "gemini" => Some(Self::Gemini),
            "builtin" | "" => BuiltinProvider::lookup(id).map(|b| b.family),
            _ => None,
        }
    }
}

/// Static capability flags of a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Backend accepts a parameter constraining output to a JSON object.
    pub structured_output: bool,
    /// Maximum number of items per generation request.
    pub max_batch_size: u32,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            structured_output: true,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Resolved, secret-free description of a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub label: String,
    pub family: ProviderFamily,
    pub model: String,
    pub base_url: String,
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
    pub capabilities: ProviderCapabilities,
    pub is_custom: bool,
}

/// Entry in the built-in vendor catalog.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinProvider {
    pub id: &'static str,
    pub label: &'static str,
    pub family: ProviderFamily,
    pub default_model: &'static str,
    pub base_url: &'static str,
    /// Process environment variable holding the fallback credential.
    pub env_key: &'static str,
}

pub const BUILTIN_PROVIDERS: &[BuiltinProvider] = &[
    BuiltinProvider {
        id: "openai",
        label: "OpenAI",
        family: ProviderFamily::OpenAi,
        default_model: "gpt-4o-mini",
        base_url: "https://api.openai.com/v1",
        env_key: "OPENAI_API_KEY",
    },
    BuiltinProvider {
        id: "gemini",
        label: "Gemini",
        family: ProviderFamily::Gemini,
        default_model: "gemini-2.0-flash",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        env_key: "GEMINI_API_KEY",
    },
    BuiltinProvider {
        id: "anthropic",
        label: "Claude",
        family: ProviderFamily::Anthropic,
        default_model: "claude-3-5-sonnet-20241022",
        base_url: "https://api.anthropic.com/v1",
        env_key: "ANTHROPIC_API_KEY",
    },
    BuiltinProvider {
        id: "mistral",
        label: "Mistral",
        family: ProviderFamily::OpenAiChat,
        default_model: "mistral-small-latest",
        base_url: "https://api.mistral.ai/v1",
        env_key: "MISTRAL_API_KEY",
    },
    BuiltinProvider {
        id: "groq",
        label: "Groq",
        family: ProviderFamily::OpenAiChat,
        default_model: "llama-3.1-8b-instant",
        base_url: "https://api.groq.com/openai/v1",
        env_key: "GROQ_API_KEY",
    },
    BuiltinProvider {
        id: "openrouter",
        label: "OpenRouter",
        family: ProviderFamily::OpenAiChat,
        default_model: "openai/gpt-4o-mini",
        base_url: "https://openrouter.ai/api/v1",
        env_key: "OPENROUTER_API_KEY",
    },
    BuiltinProvider {
        id: "together",
        label: "Together AI",
        family: ProviderFamily::OpenAiChat,
        default_model: "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo",
        base_url: "https://api.together.xyz/v1",
        env_key: "TOGETHER_API_KEY",
    },
    BuiltinProvider {
        id: "fireworks",
        label: "Fireworks AI",
        family: ProviderFamily::OpenAiChat,
        default_model: "accounts/fireworks/models/llama-v3p1-8b-instruct",
        base_url: "https://api.fireworks.ai/inference/v1",
        env_key: "FIREWORKS_API_KEY",
    },
];

impl BuiltinProvider {
    pub fn lookup(id: &ProviderId) -> Option<&'static BuiltinProvider> {
        BUILTIN_PROVIDERS.iter().find(|b| b.id == id.as_str())
    }

    pub fn provider_id(&self) -> ProviderId {
        ProviderId::from_static(self.id)
    }

    pub fn all_ids() -> Vec<ProviderId> {
        BUILTIN_PROVIDERS.iter().map(|b| b.provider_id()).collect()
    }
}
