// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Root key digest repository.
//!
//! The table holds at most one row: the root key digest plus the piece count
//! and threshold chosen at bootstrap. The first insert wins and later inserts
//! report [`DigestInsert::AlreadyExists`] without touching the stored value.

use sqlx::sqlite::SqlitePool;

use crate::error::{is_unique_constraint_error, DbError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestInsert {
	Inserted,
	AlreadyExists,
}

/// Piece count and threshold recorded next to the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharingRecord {
	pub total_shares: i64,
	pub threshold: i64,
}

#[derive(Clone)]
pub struct RootKeyDigestRepository {
	pool: SqlitePool,
}

impl RootKeyDigestRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Store the digest and sharing parameters unless a row is already present.
	#[tracing::instrument(skip(self, digest))]
	pub async fn insert_digest(
		&self,
		digest: &[u8],
		total_shares: u8,
		threshold: u8,
	) -> Result<DigestInsert, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO root_key_digest (id, digest, total_shares, threshold)
			VALUES (1, ?, ?, ?)
			"#,
		)
		.bind(digest)
		.bind(i64::from(total_shares))
		.bind(i64::from(threshold))
		.execute(&self.pool)
		.await;

		match result {
			Ok(_) => {
				tracing::debug!("root key digest stored");
				Ok(DigestInsert::Inserted)
			}
			Err(e) if is_unique_constraint_error(&e) => {
				tracing::debug!("root key digest already present");
				Ok(DigestInsert::AlreadyExists)
			}
			Err(e) => Err(e.into()),
		}
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_digest(&self) -> Result<Option<Vec<u8>>, DbError> {
		let row: Option<(Vec<u8>,)> = sqlx::query_as(
			r#"
			SELECT digest
			FROM root_key_digest
			WHERE id = 1
			"#,
		)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(|(digest,)| digest))
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_sharing(&self) -> Result<Option<SharingRecord>, DbError> {
		let row: Option<(i64, i64)> = sqlx::query_as(
			r#"
			SELECT total_shares, threshold
			FROM root_key_digest
			WHERE id = 1
			"#,
		)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(|(total_shares, threshold)| SharingRecord {
			total_shares,
			threshold,
		}))
	}
}
