// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key piece submission.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use warden_server_unseal::Share;

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Deserialize)]
pub struct UnsealRequest {
	/// Hex-encoded key piece.
	pub share: String,
}

#[derive(Debug, Serialize)]
pub struct UnsealResponse {
	pub status: &'static str,
	pub message: String,
}

/// POST /api/unseal
pub async fn submit_key_piece(
	State(state): State<AppState>,
	Json(request): Json<UnsealRequest>,
) -> Result<Json<UnsealResponse>, ServerError> {
	let share = Share::from_hex(&request.share)?;
	let outcome = state.coordinator.unseal(share).await;

	Ok(Json(UnsealResponse {
		status: outcome.status.as_str(),
		message: outcome.message,
	}))
}
