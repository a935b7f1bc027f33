// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// True when `e` is a SQLite UNIQUE or PRIMARY KEY violation.
pub fn is_unique_constraint_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Database(db_err) => {
			let message = db_err.message();
			message.contains("UNIQUE constraint failed")
				|| message.contains("PRIMARY KEY constraint failed")
		}
		_ => false,
	}
}
