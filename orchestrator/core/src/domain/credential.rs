// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provider Credentials
//!
//! Credentials are stored encrypted; only a four character hint is kept in
//! clear. A decrypted [`ApiSecret`] lives for a single orchestration cycle and
//! never appears in `Debug` output or serialized settings.
//!
//! Precedence when resolving a provider's credential:
//!
//! 1. Stored secret, decrypted with the deployment key
//! 2. Process-level fallback (environment) for built-in providers
//! 3. Absent: provider is ineligible for every purpose

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::provider::ProviderId;

/// Cleartext API key held in memory for one cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSecret(String);

impl ApiSecret {
    /// Returns `None` for blank input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Last four characters, or the whole value when it is four or shorter.
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() > 4 {
            chars[chars.len() - 4..].iter().collect()
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiSecret(****{})", self.hint())
    }
}

/// Where the effective credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Db,
    Env,
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption key is not configured")]
    MissingKey,

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Malformed encrypted value")]
    MalformedBlob,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Reversible encryption scoped to a deployment secret.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;
    fn decrypt(&self, blob: &str) -> Result<String, CryptoError>;
}

/// Process-level fallback credential lookup keyed by provider id.
pub trait FallbackCredentials: Send + Sync {
    fn lookup(&self, provider: &ProviderId) -> Option<ApiSecret>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_rejects_blank() {
        assert!(ApiSecret::new("   ").is_none());
        assert!(ApiSecret::new("").is_none());
    }

    #[test]
    fn test_hint_is_last_four() {
        assert_eq!(ApiSecret::new("sk-abcdef1234").unwrap().hint(), "1234");
        assert_eq!(ApiSecret::new("abc").unwrap().hint(), "abc");
    }

    #[test]
    fn test_debug_redacts() {
        let secret = ApiSecret::new("sk-super-secret-9876").unwrap();
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.ends_with("9876)"));
    }
}
