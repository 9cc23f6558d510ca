// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`geoquest-ai-core`)
//!
//! JSON shapes handed to the content pipeline, the admin settings UI and the
//! liveness endpoint. Routing is left to the embedding service; this layer
//! only converts application results and errors into wire DTOs.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Response DTOs, `ErrorBody` and status-code mapping |

pub mod api;
