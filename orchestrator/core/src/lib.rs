// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! GeoQuest AI Core
//!
//! Multi-provider AI orchestration for bilingual quiz content: provider
//! settings with encrypted credentials, a per-cycle provider registry, vendor
//! adapters behind one capability contract, purpose routing and resilient
//! calls.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain, application, infrastructure and presentation layers

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
