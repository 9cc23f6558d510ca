// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod crypto;
pub mod env;
pub mod http;
pub mod llm;
pub mod repositories;
pub mod telemetry;

pub use crypto::AesGcmCipher;
pub use env::EnvFallbackCredentials;
pub use http::{HttpTransport, ReqwestTransport};
pub use repositories::InMemoryProviderSettingsStore;
