// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for sealing and unsealing.

use thiserror::Error;

/// Result type alias for unseal operations.
pub type UnsealResult<T> = Result<T, UnsealError>;

#[derive(Debug, Error)]
pub enum UnsealError {
	// =========================================================================
	// Caller Errors
	// =========================================================================
	#[error("invalid input: {0}")]
	InvalidInput(String),

	// =========================================================================
	// State Errors
	// =========================================================================
	#[error("conflict: {0}")]
	Conflict(String),

	#[error("not ready: {0}")]
	NotReady(String),

	#[error("not found: {0}")]
	NotFound(String),

	// =========================================================================
	// Infrastructure Errors
	// =========================================================================
	#[error("key error: {0}")]
	Keys(#[from] warden_server_keys::KeysError),

	#[error("database error: {0}")]
	Database(#[from] warden_server_db::DbError),

	#[error("internal error: {0}")]
	Internal(String),
}

impl UnsealError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		match self {
			UnsealError::Database(_) | UnsealError::Internal(_) => true,
			UnsealError::Keys(e) => e.is_internal(),
			_ => false,
		}
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			UnsealError::InvalidInput(_) => 400,
			UnsealError::NotFound(_) => 404,
			UnsealError::Conflict(_) => 409,
			UnsealError::NotReady(_) => 503,
			UnsealError::Keys(e) => e.status_code(),
			UnsealError::Database(_) | UnsealError::Internal(_) => 500,
		}
	}
}
