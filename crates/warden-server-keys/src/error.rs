// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for key hierarchy operations.

use thiserror::Error;

/// Result type alias for key operations.
pub type KeysResult<T> = Result<T, KeysError>;

/// Errors produced by key generation, derivation, wrapping and stream
/// encryption.
///
/// Cryptographic failures deliberately carry no detail beyond their category.
#[derive(Debug, Error)]
pub enum KeysError {
	// =========================================================================
	// Caller Errors
	// =========================================================================
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("invalid credential")]
	InvalidCredential,

	// =========================================================================
	// Cryptographic Errors
	// =========================================================================
	#[error("decryption failed")]
	DecryptFailed,

	// =========================================================================
	// Infrastructure Errors
	// =========================================================================
	#[error("internal error: {0}")]
	Internal(String),
}

impl KeysError {
	pub(crate) fn invalid_key_size(actual: usize) -> Self {
		KeysError::InvalidInput(format!(
			"key must be {} bytes, got {actual}",
			crate::KEY_SIZE
		))
	}

	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(self, KeysError::Internal(_))
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			KeysError::InvalidInput(_) => 400,
			KeysError::InvalidCredential => 401,
			KeysError::DecryptFailed | KeysError::Internal(_) => 500,
		}
	}
}
