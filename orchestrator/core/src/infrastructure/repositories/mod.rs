// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the provider settings row store.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve provider settings rows
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **InMemoryProviderSettingsStore** - Thread-safe map-backed storage for
//!   tests, development and single-process deployments
//!
//! Production storage engines implement [`ProviderSettingsStore`] outside
//! this crate.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::provider::ProviderId;
use crate::domain::repository::{
    ProviderSettingsRow, ProviderSettingsStore, RepositoryError, RowPatch,
};

#[derive(Clone, Default)]
pub struct InMemoryProviderSettingsStore {
    rows: Arc<RwLock<BTreeMap<ProviderId, ProviderSettingsRow>>>,
}

impl InMemoryProviderSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, mainly for tests.
    pub fn with_rows(rows: impl IntoIterator<Item = ProviderSettingsRow>) -> Self {
        let map = rows
            .into_iter()
            .map(|row| (row.provider_id.clone(), row))
            .collect();
        Self {
            rows: Arc::new(RwLock::new(map)),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl ProviderSettingsStore for InMemoryProviderSettingsStore {
    async fn get_row(&self, id: &ProviderId) -> Result<Option<ProviderSettingsRow>, RepositoryError> {
        Ok(self.rows.read().get(id).cloned())
    }

    async fn upsert_row(&self, id: &ProviderId, patch: RowPatch) -> Result<ProviderSettingsRow, RepositoryError> {
        // Single write guard for the whole patch
        let mut rows = self.rows.write();
        let row = rows
            .entry(id.clone())
            .or_insert_with(|| ProviderSettingsRow::new(id.clone()));
        row.apply(patch);
        Ok(row.clone())
    }

    async fn list_rows(&self) -> Result<Vec<ProviderSettingsRow>, RepositoryError> {
        Ok(self.rows.read().values().cloned().collect())
    }

    async fn delete_row(&self, id: &ProviderId) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().remove(id).is_some())
    }

    async fn insert_if_missing(&self, row: ProviderSettingsRow) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.write();
        if rows.contains_key(&row.provider_id) {
            return Ok(false);
        }
        rows.insert(row.provider_id.clone(), row);
        Ok(true)
    }
}
