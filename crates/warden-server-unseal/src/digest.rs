// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable storage of the root key digest and the sharing parameters the root
//! key was split with.

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::SqlitePool;
use tracing::instrument;
use warden_server_db::{DigestInsert, RootKeyDigestRepository, SharingRecord};
use warden_server_keys::DIGEST_SIZE;

use crate::error::{UnsealError, UnsealResult};

/// Result of a write-once digest store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
	Stored,
	/// A digest was already present and was left untouched.
	Exists,
}

/// How many key pieces the root key was split into and how many of them
/// reconstruct it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharingParams {
	pub total_shares: u8,
	pub threshold: u8,
}

impl SharingParams {
	pub fn new(total_shares: u8, threshold: u8) -> Self {
		Self {
			total_shares,
			threshold,
		}
	}
}

#[async_trait]
pub trait DigestStore: Send + Sync {
	/// Persist the digest and sharing parameters unless a digest already
	/// exists. Never overwrites.
	async fn store_digest(
		&self,
		digest: &[u8; DIGEST_SIZE],
		sharing: SharingParams,
	) -> UnsealResult<StoreOutcome>;

	/// Fails with `NotFound` before bootstrap.
	async fn get_digest(&self) -> UnsealResult<[u8; DIGEST_SIZE]>;

	/// Sharing parameters recorded with the digest. Fails with `NotFound`
	/// before bootstrap.
	async fn get_sharing(&self) -> UnsealResult<SharingParams>;
}

/// Process-local store for tests and throwaway deployments.
#[derive(Default)]
pub struct InMemoryDigestStore {
	record: Mutex<Option<([u8; DIGEST_SIZE], SharingParams)>>,
}

impl InMemoryDigestStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl DigestStore for InMemoryDigestStore {
	async fn store_digest(
		&self,
		digest: &[u8; DIGEST_SIZE],
		sharing: SharingParams,
	) -> UnsealResult<StoreOutcome> {
		let mut slot = self.record.lock();
		if slot.is_some() {
			return Ok(StoreOutcome::Exists);
		}
		*slot = Some((*digest, sharing));
		Ok(StoreOutcome::Stored)
	}

	async fn get_digest(&self) -> UnsealResult<[u8; DIGEST_SIZE]> {
		(*self.record.lock())
			.map(|(digest, _)| digest)
			.ok_or_else(|| UnsealError::NotFound("root key digest".to_string()))
	}

	async fn get_sharing(&self) -> UnsealResult<SharingParams> {
		(*self.record.lock())
			.map(|(_, sharing)| sharing)
			.ok_or_else(|| UnsealError::NotFound("root key sharing parameters".to_string()))
	}
}

/// SQLite-backed store over the single-row `root_key_digest` table.
#[derive(Clone)]
pub struct SqliteDigestStore {
	repo: RootKeyDigestRepository,
}

impl SqliteDigestStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			repo: RootKeyDigestRepository::new(pool),
		}
	}
}

#[async_trait]
impl DigestStore for SqliteDigestStore {
	#[instrument(skip(self, digest))]
	async fn store_digest(
		&self,
		digest: &[u8; DIGEST_SIZE],
		sharing: SharingParams,
	) -> UnsealResult<StoreOutcome> {
		match self
			.repo
			.insert_digest(digest, sharing.total_shares, sharing.threshold)
			.await?
		{
			DigestInsert::Inserted => Ok(StoreOutcome::Stored),
			DigestInsert::AlreadyExists => Ok(StoreOutcome::Exists),
		}
	}

	#[instrument(skip(self))]
	async fn get_digest(&self) -> UnsealResult<[u8; DIGEST_SIZE]> {
		let stored = self
			.repo
			.get_digest()
			.await?
			.ok_or_else(|| UnsealError::NotFound("root key digest".to_string()))?;

		<[u8; DIGEST_SIZE]>::try_from(stored.as_slice()).map_err(|_| {
			UnsealError::Internal(format!(
				"stored root key digest has length {}, expected {DIGEST_SIZE}",
				stored.len()
			))
		})
	}

	#[instrument(skip(self))]
	async fn get_sharing(&self) -> UnsealResult<SharingParams> {
		let SharingRecord {
			total_shares,
			threshold,
		} = self
			.repo
			.get_sharing()
			.await?
			.ok_or_else(|| UnsealError::NotFound("root key sharing parameters".to_string()))?;

		match (u8::try_from(total_shares), u8::try_from(threshold)) {
			(Ok(total_shares), Ok(threshold)) => Ok(SharingParams::new(total_shares, threshold)),
			_ => Err(UnsealError::Internal(format!(
				"stored sharing parameters out of range: {threshold} of {total_shares}"
			))),
		}
	}
}
