// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod liveness;
pub mod orchestration;
pub mod router;
pub mod settings_service;
pub mod validation_fanout;

pub use liveness::{ProviderStatus, ProviderStatusReport, ProviderStatusService};
pub use orchestration::{GenerationOutcome, OrchestrationCycle, OrchestrationError};
pub use router::{PurposeError, PurposeRouter, ValidatorSet};
pub use settings_service::{ProviderSettingsInput, ProviderSettingsService, SaveReport, SettingsError, SettingsPayload};
pub use validation_fanout::{FanOutOutcome, ValidationFanOut, ValidatorFailure};
