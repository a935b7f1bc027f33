// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use warden_server_unseal::UnsealError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error(transparent)]
	Unseal(#[from] UnsealError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
		}
	}
}

fn status_from(code: u16) -> StatusCode {
	StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			ServerError::BadRequest(msg) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::new("bad_request", msg.clone()),
			),
			ServerError::Unseal(e) if e.is_internal() => {
				tracing::error!(error = %e, "unseal error");
				(
					status_from(e.status_code()),
					ErrorResponse::new("internal_error", "An internal error occurred"),
				)
			}
			ServerError::Unseal(e) => {
				let code = match e {
					UnsealError::InvalidInput(_) => "bad_request",
					UnsealError::NotFound(_) => "not_found",
					UnsealError::Conflict(_) => "conflict",
					UnsealError::NotReady(_) => "sealed",
					_ => "error",
				};
				(status_from(e.status_code()), ErrorResponse::new(code, e.to_string()))
			}
		};

		(status, Json(body)).into_response()
	}
}
