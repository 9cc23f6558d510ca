// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provider Settings Row Store
//!
//! Persistence contract for provider settings. The storage engine itself is
//! an external collaborator; the orchestrator only relies on four row
//! operations keyed by provider id.
//!
//! ## Atomicity
//!
//! `upsert_row` applies a [`RowPatch`] as one atomic per-row write. Callers
//! never read-modify-write a row, so concurrent saves cannot interleave
//! partial field updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderId;

/// One persisted provider settings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettingsRow {
    pub provider_id: ProviderId,
    pub is_enabled: bool,
    pub is_available: bool,
    /// JSON object of purpose -> bool.
    pub purpose_settings: Option<String>,
    pub model: Option<String>,
    pub display_name: Option<String>,
    /// `builtin`, `openai_compat`, or an explicit family name.
    pub provider_type: Option<String>,
    pub base_url: Option<String>,
    /// JSON object of header name -> value.
    pub extra_headers: Option<String>,
    pub supports_response_format: Option<bool>,
    pub max_questions_per_request: Option<u32>,
    pub is_custom: bool,
    pub encrypted_api_key: Option<String>,
    pub api_key_hint: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderSettingsRow {
    /// Empty row with column defaults.
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            is_enabled: true,
            is_available: true,
            purpose_settings: None,
            model: None,
            display_name: None,
            provider_type: None,
            base_url: None,
            extra_headers: None,
            supports_response_format: None,
            max_questions_per_request: None,
            is_custom: false,
            encrypted_api_key: None,
            api_key_hint: None,
            updated_at: Utc::now(),
        }
    }

    pub fn has_stored_credential(&self) -> bool {
        self.encrypted_api_key
            .as_deref()
            .is_some_and(|blob| !blob.trim().is_empty())
    }

    /// Applies every field the patch carries.
    pub fn apply(&mut self, patch: RowPatch) {
        if let Some(v) = patch.is_enabled {
            self.is_enabled = v;
        }
        if let Some(v) = patch.is_available {
            self.is_available = v;
        }
        if let Some(v) = patch.purpose_settings {
            self.purpose_settings = Some(v);
        }
        if let Some(v) = patch.model {
            self.model = Some(v);
        }
        if let Some(v) = patch.display_name {
            self.display_name = Some(v);
        }
        if let Some(v) = patch.provider_type {
            self.provider_type = Some(v);
        }
        if let Some(v) = patch.base_url {
            self.base_url = v;
        }
        if let Some(v) = patch.extra_headers {
            self.extra_headers = v;
        }
        if let Some(v) = patch.supports_response_format {
            self.supports_response_format = Some(v);
        }
        if let Some(v) = patch.max_questions_per_request {
            self.max_questions_per_request = v;
        }
        if let Some(v) = patch.is_custom {
            self.is_custom = v;
        }
        if let Some((blob, hint)) = patch.credential {
            self.encrypted_api_key = Some(blob);
            self.api_key_hint = Some(hint);
        }
        self.updated_at = Utc::now();
    }
}

/// Field-level update. `None` leaves a column untouched; nullable columns use
/// `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
    pub is_enabled: Option<bool>,
    pub is_available: Option<bool>,
    pub purpose_settings: Option<String>,
    pub model: Option<String>,
    pub display_name: Option<String>,
    pub provider_type: Option<String>,
    pub base_url: Option<Option<String>>,
    pub extra_headers: Option<Option<String>>,
    pub supports_response_format: Option<bool>,
    pub max_questions_per_request: Option<Option<u32>>,
    pub is_custom: Option<bool>,
    /// Encrypted blob and cleartext hint, written together or not at all.
    pub credential: Option<(String, String)>,
}

/// Row store for provider settings.
#[async_trait]
pub trait ProviderSettingsStore: Send + Sync {
    async fn get_row(&self, id: &ProviderId) -> Result<Option<ProviderSettingsRow>, RepositoryError>;

    /// Create or update a row atomically, returning the resulting row.
    async fn upsert_row(&self, id: &ProviderId, patch: RowPatch) -> Result<ProviderSettingsRow, RepositoryError>;

    async fn list_rows(&self) -> Result<Vec<ProviderSettingsRow>, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete_row(&self, id: &ProviderId) -> Result<bool, RepositoryError>;

    /// Insert `row` unless one already exists for its id. Returns whether an
    /// insert happened. Stores with a native conditional insert should
    /// override this.
    async fn insert_if_missing(&self, row: ProviderSettingsRow) -> Result<bool, RepositoryError> {
        if self.get_row(&row.provider_id).await?.is_some() {
            return Ok(false);
        }
        let id = row.provider_id.clone();
        let patch = RowPatch {
            is_enabled: Some(row.is_enabled),
            is_available: Some(row.is_available),
            purpose_settings: row.purpose_settings,
            model: row.model,
            display_name: row.display_name,
            provider_type: row.provider_type,
            base_url: Some(row.base_url),
            extra_headers: Some(row.extra_headers),
            supports_response_format: row.supports_response_format,
            max_questions_per_request: Some(row.max_questions_per_request),
            is_custom: Some(row.is_custom),
            credential: None,
        };
        self.upsert_row(&id, patch).await?;
        Ok(true)
    }
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
