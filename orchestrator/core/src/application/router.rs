// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Purpose router
//!
//! Selection policy per purpose over the eligible provider set:
//!
//! | Purpose | Policy |
//! |---------|--------|
//! | generation | uniform random pick |
//! | validation | every eligible provider except the generator |
//! | migration | exactly one, trusted provider first |
//! | illustration | uniform random pick |
//!
//! Providers whose adapter fails to construct are dropped from the
//! candidate set. An empty eligible set is `NotConfigured`; a non-empty set
//! with nothing usable left is `NoneAvailable`.

use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::llm::{AiProvider, ProviderLookup};
use crate::domain::provider::ProviderId;
use crate::domain::purpose::Purpose;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurposeError {
    #[error("No providers configured for {purpose}")]
    NotConfigured { purpose: Purpose },

    #[error("No providers available for {purpose} ({candidates} configured, none usable)")]
    NoneAvailable { purpose: Purpose, candidates: usize },
}

impl PurposeError {
    pub fn purpose(&self) -> Purpose {
        match self {
            Self::NotConfigured { purpose } | Self::NoneAvailable { purpose, .. } => *purpose,
        }
    }
}

/// Validators for one fan-out plus the eligible providers that could not be
/// constructed.
#[derive(Default)]
pub struct ValidatorSet {
    pub validators: Vec<Arc<dyn AiProvider>>,
    pub skipped: Vec<ProviderId>,
}

pub struct PurposeRouter {
    lookup: Arc<dyn ProviderLookup>,
    trusted_migration: ProviderId,
}

impl PurposeRouter {
    pub fn new(lookup: Arc<dyn ProviderLookup>, trusted_migration: ProviderId) -> Self {
        Self {
            lookup,
            trusted_migration,
        }
    }

    pub fn available(&self, purpose: Purpose) -> Vec<ProviderId> {
        self.lookup.list_available(Some(purpose))
    }

    /// Random generator, or `preferred` when it is eligible and constructs.
    pub fn select_generator(&self, preferred: Option<&ProviderId>) -> Result<Arc<dyn AiProvider>, PurposeError> {
        self.random_pick(Purpose::Generation, preferred)
    }

    pub fn select_illustrator(&self) -> Result<Arc<dyn AiProvider>, PurposeError> {
        self.random_pick(Purpose::Illustration, None)
    }

    /// Every validation-eligible provider except `generator`.
    pub fn select_validators(&self, generator: Option<&ProviderId>) -> Result<ValidatorSet, PurposeError> {
        let purpose = Purpose::Validation;
        let eligible = self.available(purpose);
        if eligible.is_empty() {
            return Err(PurposeError::NotConfigured { purpose });
        }

        let mut set = ValidatorSet::default();
        for id in eligible.into_iter().filter(|id| Some(id) != generator) {
            match self.construct(purpose, &id) {
                Some(adapter) => set.validators.push(adapter),
                None => set.skipped.push(id),
            }
        }

        if set.validators.is_empty() {
            return Err(PurposeError::NoneAvailable {
                purpose,
                candidates: set.skipped.len(),
            });
        }
        debug!(
            count = set.validators.len(),
            skipped = set.skipped.len(),
            excluded = ?generator.map(ProviderId::as_str),
            "Selected validators"
        );
        Ok(set)
    }

    /// Single migration provider. The trusted provider wins when eligible.
    pub fn select_migrator(&self) -> Result<Arc<dyn AiProvider>, PurposeError> {
        let purpose = Purpose::Migration;
        let mut eligible = self.available(purpose);
        if eligible.is_empty() {
            return Err(PurposeError::NotConfigured { purpose });
        }
        eligible.sort_by_key(|id| id != &self.trusted_migration);

        let candidates = eligible.len();
        eligible
            .iter()
            .find_map(|id| self.construct(purpose, id))
            .ok_or(PurposeError::NoneAvailable { purpose, candidates })
    }

    fn random_pick(&self, purpose: Purpose, preferred: Option<&ProviderId>) -> Result<Arc<dyn AiProvider>, PurposeError> {
        let mut eligible = self.available(purpose);
        if eligible.is_empty() {
            return Err(PurposeError::NotConfigured { purpose });
        }

        eligible.shuffle(&mut rand::rng());
        if let Some(preferred) = preferred {
            if let Some(position) = eligible.iter().position(|id| id == preferred) {
                eligible.swap(0, position);
            } else {
                debug!(purpose = purpose.as_str(), preferred = %preferred, "Preferred provider not eligible, picking randomly");
            }
        }

        let candidates = eligible.len();
        eligible
            .iter()
            .find_map(|id| self.construct(purpose, id))
            .ok_or(PurposeError::NoneAvailable { purpose, candidates })
    }

    fn construct(&self, purpose: Purpose, id: &ProviderId) -> Option<Arc<dyn AiProvider>> {
        match self.lookup.get_adapter(id) {
            Ok(adapter) => Some(adapter),
            Err(e) => {
                warn!(provider = %id, purpose = purpose.as_str(), error = %e, "Dropping provider that failed to construct");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::llm::{LivenessReport, ProviderDescription, ProviderError};
    use crate::domain::provider::ProviderCapabilities;
    use crate::domain::quiz::{
        AmbiguityResult, EditContext, EditProposal, GeneratedItem, GenerationRequest, Illustration,
        QuizItem, ValidationCriteria, ValidationResult,
    };
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};

    pub(crate) struct NamedProvider(pub ProviderId);

    #[async_trait]
    impl AiProvider for NamedProvider {
        fn id(&self) -> &ProviderId {
            &self.0
        }
        fn model(&self) -> &str {
            "test-model"
        }
        async fn generate(&self, _: &GenerationRequest) -> Result<Vec<GeneratedItem>, ProviderError> {
            Ok(Vec::new())
        }
        async fn validate(&self, _: &QuizItem, _: &ValidationCriteria) -> Result<ValidationResult, ProviderError> {
            Err(ProviderError::Parse {
                provider: self.0.clone(),
                message: "not scripted".into(),
            })
        }
        async fn check_ambiguity(&self, _: &QuizItem) -> Result<AmbiguityResult, ProviderError> {
            Err(ProviderError::Parse {
                provider: self.0.clone(),
                message: "not scripted".into(),
            })
        }
        async fn propose_edits(&self, _: &QuizItem, _: &[String], _: &EditContext) -> Result<EditProposal, ProviderError> {
            Err(ProviderError::Parse {
                provider: self.0.clone(),
                message: "not scripted".into(),
            })
        }
        async fn illustrate(&self, _: &QuizItem) -> Result<Illustration, ProviderError> {
            Err(ProviderError::Parse {
                provider: self.0.clone(),
                message: "not scripted".into(),
            })
        }
        async fn check_liveness(&self) -> LivenessReport {
            LivenessReport::available(self.0.clone())
        }
        fn describe(&self) -> ProviderDescription {
            ProviderDescription::from_capabilities(
                self.0.clone(),
                self.0.to_string(),
                "test-model".into(),
                &ProviderCapabilities::default(),
            )
        }
    }

    /// Lookup with fixed per-purpose eligibility; ids in `broken` fail to
    /// construct.
    #[derive(Default)]
    pub(crate) struct FixedLookup {
        pub eligible: BTreeMap<Purpose, Vec<ProviderId>>,
        pub broken: BTreeSet<ProviderId>,
    }

    impl ProviderLookup for FixedLookup {
        fn get_adapter(&self, id: &ProviderId) -> Result<Arc<dyn AiProvider>, ProviderError> {
            if self.broken.contains(id) {
                return Err(ProviderError::MissingCredential { provider: id.clone() });
            }
            Ok(Arc::new(NamedProvider(id.clone())))
        }

        fn list_available(&self, purpose: Option<Purpose>) -> Vec<ProviderId> {
            match purpose {
                Some(p) => self.eligible.get(&p).cloned().unwrap_or_default(),
                None => self.eligible.values().flatten().cloned().collect(),
            }
        }
    }

    fn ids(values: &[&str]) -> Vec<ProviderId> {
        values.iter().map(|v| ProviderId::parse(v).unwrap()).collect()
    }

    fn router(lookup: FixedLookup) -> PurposeRouter {
        PurposeRouter::new(Arc::new(lookup), ProviderId::parse("anthropic").unwrap())
    }

    #[test]
    fn test_generator_never_validates_itself() {
        let lookup = FixedLookup {
            eligible: BTreeMap::from([(Purpose::Validation, ids(&["openai", "gemini", "anthropic"]))]),
            ..Default::default()
        };
        let router = router(lookup);
        for generator in ids(&["openai", "gemini", "anthropic"]) {
            let set = router.select_validators(Some(&generator)).unwrap();
            assert_eq!(set.validators.len(), 2);
            assert!(set.validators.iter().all(|v| v.id() != &generator));
        }
    }

    #[test]
    fn test_construction_failures_shrink_validator_set() {
        let lookup = FixedLookup {
            eligible: BTreeMap::from([(Purpose::Validation, ids(&["openai", "gemini", "mistral"]))]),
            broken: ids(&["gemini"]).into_iter().collect(),
        };
        let set = router(lookup).select_validators(None).unwrap();
        let selected: Vec<&str> = set.validators.iter().map(|v| v.id().as_str()).collect();
        assert_eq!(selected, vec!["openai", "mistral"]);
        assert_eq!(set.skipped, ids(&["gemini"]));
    }

    #[test]
    fn test_not_configured_vs_none_available() {
        let empty = router(FixedLookup::default());
        assert_eq!(
            empty.select_generator(None).err(),
            Some(PurposeError::NotConfigured { purpose: Purpose::Generation })
        );

        let only_self = router(FixedLookup {
            eligible: BTreeMap::from([(Purpose::Validation, ids(&["openai"]))]),
            ..Default::default()
        });
        assert_eq!(
            only_self.select_validators(ids(&["openai"]).first()).err(),
            Some(PurposeError::NoneAvailable { purpose: Purpose::Validation, candidates: 0 })
        );

        let all_broken = router(FixedLookup {
            eligible: BTreeMap::from([(Purpose::Generation, ids(&["openai", "groq"]))]),
            broken: ids(&["openai", "groq"]).into_iter().collect(),
        });
        assert_eq!(
            all_broken.select_generator(None).err(),
            Some(PurposeError::NoneAvailable { purpose: Purpose::Generation, candidates: 2 })
        );
    }

    #[test]
    fn test_generation_pick_is_spread() {
        let router = router(FixedLookup {
            eligible: BTreeMap::from([(Purpose::Generation, ids(&["openai", "gemini", "groq"]))]),
            ..Default::default()
        });
        let picked: BTreeSet<String> = (0..200)
            .map(|_| router.select_generator(None).unwrap().id().to_string())
            .collect();
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn test_preferred_generator_wins_when_eligible() {
        let router = router(FixedLookup {
            eligible: BTreeMap::from([(Purpose::Generation, ids(&["openai", "gemini", "groq"]))]),
            ..Default::default()
        });
        let preferred = ProviderId::parse("gemini").unwrap();
        for _ in 0..20 {
            assert_eq!(router.select_generator(Some(&preferred)).unwrap().id(), &preferred);
        }
    }

    #[test]
    fn test_migration_prefers_trusted_provider() {
        let router = router(FixedLookup {
            eligible: BTreeMap::from([(Purpose::Migration, ids(&["gemini", "anthropic", "openai"]))]),
            ..Default::default()
        });
        assert_eq!(router.select_migrator().unwrap().id().as_str(), "anthropic");

        let fallback = router_with_broken_trusted();
        assert_eq!(fallback.select_migrator().unwrap().id().as_str(), "gemini");
    }

    fn router_with_broken_trusted() -> PurposeRouter {
        router(FixedLookup {
            eligible: BTreeMap::from([(Purpose::Migration, ids(&["gemini", "anthropic"]))]),
            broken: ids(&["anthropic"]).into_iter().collect(),
        })
    }
}
