// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Provider identity, purposes, credentials, quiz content shapes and the
//! ports the orchestration core depends on.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and traits with no I/O

pub mod config;
pub mod credential;
pub mod llm;
pub mod provider;
pub mod purpose;
pub mod quiz;
pub mod repository;
pub mod settings;
