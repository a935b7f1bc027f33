// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;

use axum::{
	http::StatusCode,
	response::IntoResponse,
	routing::{get, post},
	Json, Router,
};
use warden_server_config::ServerConfig;
use warden_server_unseal::{
	DigestStore, Keystore, RequestGate, SealGate, ShareCollector, UnsealCoordinator, UnsealError,
};

use crate::error::{ErrorResponse, ServerError};
use crate::gate_layer::SealGateLayer;
use crate::routes;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	pub coordinator: Arc<UnsealCoordinator>,
	pub gate: RequestGate,
}

/// Wire the custody components together.
///
/// The server starts sealed: the keystore is empty and the gate only admits
/// the configured allow-list. The collector threshold comes from the sharing
/// parameters recorded at bootstrap; the configured threshold is only used
/// before the root key exists.
pub async fn create_app_state(
	config: &ServerConfig,
	digests: Arc<dyn DigestStore>,
) -> Result<AppState, ServerError> {
	let threshold = match digests.get_sharing().await {
		Ok(sharing) => {
			if sharing.threshold != config.unseal.threshold {
				tracing::warn!(
					stored = sharing.threshold,
					configured = config.unseal.threshold,
					"configured threshold differs from the root key's, using the stored value"
				);
			}
			sharing.threshold
		}
		Err(UnsealError::NotFound(_)) => {
			tracing::warn!("no root key initialised yet, run `warden-server init`");
			config.unseal.threshold
		}
		Err(e) => return Err(e.into()),
	};

	let keystore = Arc::new(Keystore::new());
	let collector = Arc::new(ShareCollector::new(threshold));
	let coordinator = Arc::new(UnsealCoordinator::new(
		collector,
		Arc::clone(&keystore),
		digests,
	));

	let gate = RequestGate::new().with_check(Arc::new(SealGate::new(
		Arc::clone(&keystore),
		&config.unseal.gate_allow_list,
	)));

	tracing::debug!(threshold, checks = gate.len(), "application state created");

	Ok(AppState { coordinator, gate })
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/api/unseal", post(routes::unseal::submit_key_piece))
		.fallback(not_found)
		.layer(SealGateLayer::new(state.gate.clone()))
		.with_state(state)
}

async fn not_found() -> impl IntoResponse {
	(
		StatusCode::NOT_FOUND,
		Json(ErrorResponse::new("not_found", "no such route")),
	)
}
