// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP server for Warden.
//!
//! The server boots sealed. Operators unseal it by posting key pieces to
//! `/api/unseal`; every other route answers 503 until the root key is loaded.

pub mod api;
pub mod error;
pub mod gate_layer;
pub mod routes;

pub use api::{create_app_state, create_router, AppState};
pub use error::{ErrorResponse, ServerError};
pub use gate_layer::{operation_for_path, SealGateLayer};
pub use warden_server_config::ServerConfig;
