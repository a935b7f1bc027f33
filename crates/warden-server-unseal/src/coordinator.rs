// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The sealed to unsealed transition.
//!
//! Operators submit key pieces one at a time. Once the collector holds enough
//! of them the root key is reconstructed, checked against the stored digest
//! and loaded into the keystore. Any validation failure wipes every collected
//! piece so that operators start again from a clean slate.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use warden_server_keys::verify_root_key_digest;

use crate::collector::ShareCollector;
use crate::digest::DigestStore;
use crate::error::UnsealError;
use crate::keystore::Keystore;
use crate::shamir::Share;

pub const MSG_UNSEALED_PREVIOUSLY: &str = "unsealed previously";
pub const MSG_COLLECT_FAILED: &str = "failed to collect provided key piece";
pub const MSG_BAD_PIECES: &str = "bad root key pieces collected; all key pieces wiped";
pub const MSG_VALIDATION_ERROR: &str = "internal error during root key validation";
pub const MSG_BAD_ROOT_KEY: &str = "bad root key provided; all key pieces wiped";
pub const MSG_STORE_ERROR: &str = "internal error during root key store";
pub const MSG_UNSEALED_NOW: &str = "unsealed now";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealStatus {
	Sealed,
	Unsealed,
}

impl SealStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			SealStatus::Sealed => "sealed",
			SealStatus::Unsealed => "unsealed",
		}
	}
}

impl fmt::Display for SealStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What an operator sees after submitting a key piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsealOutcome {
	pub status: SealStatus,
	pub message: String,
}

impl UnsealOutcome {
	fn sealed(message: impl Into<String>) -> Self {
		Self {
			status: SealStatus::Sealed,
			message: message.into(),
		}
	}

	fn unsealed(message: impl Into<String>) -> Self {
		Self {
			status: SealStatus::Unsealed,
			message: message.into(),
		}
	}
}

pub struct UnsealCoordinator {
	collector: Arc<ShareCollector>,
	keystore: Arc<Keystore>,
	digests: Arc<dyn DigestStore>,
}

impl UnsealCoordinator {
	pub fn new(
		collector: Arc<ShareCollector>,
		keystore: Arc<Keystore>,
		digests: Arc<dyn DigestStore>,
	) -> Self {
		Self {
			collector,
			keystore,
			digests,
		}
	}

	pub fn status(&self) -> SealStatus {
		if self.keystore.is_loaded() {
			SealStatus::Unsealed
		} else {
			SealStatus::Sealed
		}
	}

	pub fn collector(&self) -> &ShareCollector {
		&self.collector
	}

	/// Submit one key piece.
	///
	/// Never returns an error: every failure is reported to the operator as a
	/// sealed outcome with a message, and logged here.
	#[instrument(skip(self, share))]
	pub async fn unseal(&self, share: Share) -> UnsealOutcome {
		if self.keystore.is_loaded() {
			return UnsealOutcome::unsealed(MSG_UNSEALED_PREVIOUSLY);
		}

		match self.collector.collect(share) {
			Ok(()) => {}
			Err(UnsealError::Conflict(reason)) => {
				debug!(%reason, "key piece not collected, threshold already met");
			}
			Err(e) => {
				warn!(error = %e, "failed to collect key piece");
				return UnsealOutcome::sealed(MSG_COLLECT_FAILED);
			}
		}

		let root_key = match self.collector.reconstruct() {
			Ok(root_key) => root_key,
			Err(UnsealError::NotReady(message)) => {
				info!(%message, "waiting for more key pieces");
				return UnsealOutcome::sealed(message);
			}
			Err(e) => {
				warn!(error = %e, "root key reconstruction failed");
				self.collector.reset();
				return UnsealOutcome::sealed(MSG_BAD_PIECES);
			}
		};

		let digest = match self.digests.get_digest().await {
			Ok(digest) => digest,
			Err(e) => {
				error!(error = %e, "failed to fetch root key digest");
				return UnsealOutcome::sealed(MSG_VALIDATION_ERROR);
			}
		};

		if !verify_root_key_digest(root_key.expose(), &digest) {
			warn!("reconstructed root key does not match stored digest");
			self.collector.reset();
			return UnsealOutcome::sealed(MSG_BAD_ROOT_KEY);
		}

		if let Err(e) = self.keystore.load(root_key.expose()) {
			error!(error = %e, "failed to load root key into keystore");
			return UnsealOutcome::sealed(MSG_STORE_ERROR);
		}

		self.collector.reset();
		info!("root key loaded, server unsealed");
		UnsealOutcome::unsealed(MSG_UNSEALED_NOW)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collector::ROOT_KEY_PIECE_LEN;
	use crate::digest::{DigestStore, InMemoryDigestStore, SharingParams, StoreOutcome};
	use crate::shamir::split;
	use async_trait::async_trait;
	use rand::RngCore;
	use warden_common_secret::SecretBuffer;
	use warden_server_keys::{digest_root_key, generate_root_key, DIGEST_SIZE};

	struct Harness {
		coordinator: UnsealCoordinator,
		keystore: Arc<Keystore>,
		collector: Arc<ShareCollector>,
		root_key: SecretBuffer,
		shares: Vec<Share>,
	}

	async fn harness(total: u8, threshold: u8) -> Harness {
		let root_key = generate_root_key();
		let shares = split(root_key.expose(), total, threshold).unwrap();

		let digests = Arc::new(InMemoryDigestStore::new());
		digests
			.store_digest(
				&digest_root_key(root_key.expose()),
				SharingParams::new(total, threshold),
			)
			.await
			.unwrap();

		let collector = Arc::new(ShareCollector::new(threshold));
		let keystore = Arc::new(Keystore::new());
		let coordinator = UnsealCoordinator::new(collector.clone(), keystore.clone(), digests);

		Harness {
			coordinator,
			keystore,
			collector,
			root_key,
			shares,
		}
	}

	struct FailingDigestStore;

	#[async_trait]
	impl DigestStore for FailingDigestStore {
		async fn store_digest(
			&self,
			_digest: &[u8; DIGEST_SIZE],
			_sharing: SharingParams,
		) -> crate::UnsealResult<StoreOutcome> {
			Err(UnsealError::Internal("store offline".to_string()))
		}

		async fn get_digest(&self) -> crate::UnsealResult<[u8; DIGEST_SIZE]> {
			Err(UnsealError::Internal("store offline".to_string()))
		}

		async fn get_sharing(&self) -> crate::UnsealResult<SharingParams> {
			Err(UnsealError::Internal("store offline".to_string()))
		}
	}

	fn random_piece(len: usize) -> Share {
		let mut bytes = vec![0u8; len];
		rand::thread_rng().fill_bytes(&mut bytes);
		if bytes[0] == 0 {
			bytes[0] = 1;
		}
		Share::from_bytes(&bytes).unwrap()
	}

	#[tokio::test]
	async fn ten_of_five_end_to_end() {
		let h = harness(10, 5).await;

		for (i, share) in h.shares[..4].iter().enumerate() {
			let outcome = h.coordinator.unseal(share.duplicate()).await;
			assert_eq!(outcome.status, SealStatus::Sealed);
			assert_eq!(
				outcome.message,
				format!("collected {} of 5 root key pieces", i + 1)
			);
		}

		let outcome = h.coordinator.unseal(h.shares[4].duplicate()).await;
		assert_eq!(outcome, UnsealOutcome::unsealed(MSG_UNSEALED_NOW));
		assert!(h.keystore.is_loaded());
		assert_eq!(h.keystore.get().unwrap().expose(), h.root_key.expose());
		assert_eq!(h.coordinator.status(), SealStatus::Unsealed);

		let outcome = h.coordinator.unseal(h.shares[5].duplicate()).await;
		assert_eq!(outcome, UnsealOutcome::unsealed(MSG_UNSEALED_PREVIOUSLY));
	}

	#[tokio::test]
	async fn resubmitted_piece_does_not_advance() {
		let h = harness(5, 3).await;

		h.coordinator.unseal(h.shares[0].duplicate()).await;
		let outcome = h.coordinator.unseal(h.shares[0].duplicate()).await;

		assert_eq!(outcome.message, "collected 1 of 3 root key pieces");
	}

	#[tokio::test]
	async fn corrupted_piece_wipes_collector() {
		let h = harness(10, 5).await;

		for share in &h.shares[..4] {
			h.coordinator.unseal(share.duplicate()).await;
		}

		let mut bytes = h.shares[4].as_bytes().to_vec();
		bytes[10] ^= 0x40;
		let corrupted = Share::from_bytes(&bytes).unwrap();

		let outcome = h.coordinator.unseal(corrupted).await;
		assert_eq!(outcome, UnsealOutcome::sealed(MSG_BAD_ROOT_KEY));
		assert_eq!(h.collector.size(), 0);
		assert!(!h.keystore.is_loaded());

		for share in &h.shares[5..10] {
			h.coordinator.unseal(share.duplicate()).await;
		}
		assert!(h.keystore.is_loaded());
	}

	#[tokio::test]
	async fn repeated_index_wipes_collector() {
		let h = harness(5, 2).await;

		h.coordinator.unseal(h.shares[0].duplicate()).await;

		let mut bytes = h.shares[0].as_bytes().to_vec();
		bytes[1] ^= 0x01;
		let same_index = Share::from_bytes(&bytes).unwrap();

		let outcome = h.coordinator.unseal(same_index).await;
		assert_eq!(outcome, UnsealOutcome::sealed(MSG_BAD_PIECES));
		assert_eq!(h.collector.size(), 0);
	}

	#[tokio::test]
	async fn mismatched_length_is_collect_failure() {
		let h = harness(5, 3).await;

		h.coordinator.unseal(h.shares[0].duplicate()).await;
		let outcome = h
			.coordinator
			.unseal(Share::from_bytes(&[7, 1, 2]).unwrap())
			.await;

		assert_eq!(outcome, UnsealOutcome::sealed(MSG_COLLECT_FAILED));
		assert_eq!(h.collector.size(), 1);
	}

	#[tokio::test]
	async fn missing_digest_is_validation_error() {
		let root_key = generate_root_key();
		let shares = split(root_key.expose(), 3, 2).unwrap();
		let collector = Arc::new(ShareCollector::new(2));
		let keystore = Arc::new(Keystore::new());
		let coordinator = UnsealCoordinator::new(
			collector.clone(),
			keystore.clone(),
			Arc::new(InMemoryDigestStore::new()),
		);

		coordinator.unseal(shares[0].duplicate()).await;
		let outcome = coordinator.unseal(shares[1].duplicate()).await;

		assert_eq!(outcome, UnsealOutcome::sealed(MSG_VALIDATION_ERROR));
		assert!(!keystore.is_loaded());
		// Pieces are kept so a retry after the store recovers can succeed.
		assert_eq!(collector.size(), 2);
	}

	#[tokio::test]
	async fn digest_store_failure_is_validation_error() {
		let root_key = generate_root_key();
		let shares = split(root_key.expose(), 3, 2).unwrap();
		let coordinator = UnsealCoordinator::new(
			Arc::new(ShareCollector::new(2)),
			Arc::new(Keystore::new()),
			Arc::new(FailingDigestStore),
		);

		coordinator.unseal(shares[0].duplicate()).await;
		let outcome = coordinator.unseal(shares[2].duplicate()).await;
		assert_eq!(outcome, UnsealOutcome::sealed(MSG_VALIDATION_ERROR));
	}

	#[tokio::test]
	async fn extra_piece_after_threshold_with_bad_store_retries() {
		let root_key = generate_root_key();
		let shares = split(root_key.expose(), 4, 2).unwrap();
		let digests = Arc::new(InMemoryDigestStore::new());
		let keystore = Arc::new(Keystore::new());
		let coordinator = UnsealCoordinator::new(
			Arc::new(ShareCollector::new(2)),
			keystore.clone(),
			digests.clone(),
		);

		coordinator.unseal(shares[0].duplicate()).await;
		coordinator.unseal(shares[1].duplicate()).await;

		digests
			.store_digest(&digest_root_key(root_key.expose()), SharingParams::new(4, 2))
			.await
			.unwrap();

		// Collector is full: the third piece is a conflict and is ignored, the
		// held pieces are reconstructed again.
		let outcome = coordinator.unseal(shares[2].duplicate()).await;
		assert_eq!(outcome, UnsealOutcome::unsealed(MSG_UNSEALED_NOW));
		assert!(keystore.is_loaded());
	}

	/// Loads the keystore while the coordinator is fetching the digest, as a
	/// concurrent unseal finishing first would.
	struct RacingDigestStore {
		inner: InMemoryDigestStore,
		keystore: Arc<Keystore>,
		root_key: SecretBuffer,
	}

	#[async_trait]
	impl DigestStore for RacingDigestStore {
		async fn store_digest(
			&self,
			digest: &[u8; DIGEST_SIZE],
			sharing: SharingParams,
		) -> crate::UnsealResult<StoreOutcome> {
			self.inner.store_digest(digest, sharing).await
		}

		async fn get_digest(&self) -> crate::UnsealResult<[u8; DIGEST_SIZE]> {
			let _ = self.keystore.load(self.root_key.expose());
			self.inner.get_digest().await
		}

		async fn get_sharing(&self) -> crate::UnsealResult<SharingParams> {
			self.inner.get_sharing().await
		}
	}

	#[tokio::test]
	async fn keystore_load_failure_is_store_error() {
		let root_key = generate_root_key();
		let shares = split(root_key.expose(), 3, 2).unwrap();
		let keystore = Arc::new(Keystore::new());
		let digests = RacingDigestStore {
			inner: InMemoryDigestStore::new(),
			keystore: keystore.clone(),
			root_key: root_key.duplicate(),
		};
		digests
			.store_digest(&digest_root_key(root_key.expose()), SharingParams::new(3, 2))
			.await
			.unwrap();
		let coordinator = UnsealCoordinator::new(
			Arc::new(ShareCollector::new(2)),
			keystore.clone(),
			Arc::new(digests),
		);

		coordinator.unseal(shares[0].duplicate()).await;
		let outcome = coordinator.unseal(shares[1].duplicate()).await;
		assert_eq!(outcome, UnsealOutcome::sealed(MSG_STORE_ERROR));
		assert!(keystore.is_loaded());

		let outcome = coordinator.unseal(shares[2].duplicate()).await;
		assert_eq!(outcome, UnsealOutcome::unsealed(MSG_UNSEALED_PREVIOUSLY));
	}

	#[tokio::test]
	async fn random_piece_among_threshold_wipes_collector() {
		let h = harness(10, 5).await;

		for share in &h.shares[..4] {
			h.coordinator.unseal(share.duplicate()).await;
		}

		let outcome = h.coordinator.unseal(random_piece(ROOT_KEY_PIECE_LEN)).await;
		assert_eq!(outcome.status, SealStatus::Sealed);
		assert!(
			outcome.message == MSG_BAD_ROOT_KEY || outcome.message == MSG_BAD_PIECES,
			"unexpected message: {}",
			outcome.message
		);
		assert_eq!(h.collector.size(), 0);
		assert!(!h.keystore.is_loaded());

		for share in &h.shares[5..10] {
			h.coordinator.unseal(share.duplicate()).await;
		}
		assert!(h.keystore.is_loaded());
		assert_eq!(h.keystore.get().unwrap().expose(), h.root_key.expose());
	}

	#[tokio::test]
	async fn random_data_at_valid_index_is_bad_root_key() {
		let h = harness(5, 3).await;

		let mut bytes = vec![0u8; ROOT_KEY_PIECE_LEN];
		rand::thread_rng().fill_bytes(&mut bytes[1..]);
		bytes[0] = h.shares[2].index();
		let forged = Share::from_bytes(&bytes).unwrap();

		h.coordinator.unseal(h.shares[0].duplicate()).await;
		h.coordinator.unseal(h.shares[1].duplicate()).await;
		let outcome = h.coordinator.unseal(forged).await;

		assert_eq!(outcome, UnsealOutcome::sealed(MSG_BAD_ROOT_KEY));
		assert_eq!(h.collector.size(), 0);
	}

	#[tokio::test]
	async fn wrong_length_first_piece_does_not_block_unseal() {
		let h = harness(10, 5).await;

		let outcome = h
			.coordinator
			.unseal(Share::from_bytes(&[7, 1, 2]).unwrap())
			.await;
		assert_eq!(outcome, UnsealOutcome::sealed(MSG_COLLECT_FAILED));

		let outcome = h.coordinator.unseal(random_piece(ROOT_KEY_PIECE_LEN + 9)).await;
		assert_eq!(outcome, UnsealOutcome::sealed(MSG_COLLECT_FAILED));
		assert_eq!(h.collector.size(), 0);

		for share in &h.shares[..4] {
			h.coordinator.unseal(share.duplicate()).await;
		}
		let outcome = h.coordinator.unseal(h.shares[4].duplicate()).await;
		assert_eq!(outcome, UnsealOutcome::unsealed(MSG_UNSEALED_NOW));
		assert_eq!(h.keystore.get().unwrap().expose(), h.root_key.expose());
	}

	#[tokio::test]
	async fn concurrent_submissions_unseal_once() {
		let h = Arc::new(harness(10, 5).await);

		let tasks: Vec<_> = (0..10)
			.map(|i| {
				let h = Arc::clone(&h);
				tokio::spawn(async move { h.coordinator.unseal(h.shares[i].duplicate()).await })
			})
			.collect();

		let mut now = 0;
		for task in tasks {
			let outcome = task.await.unwrap();
			if outcome.message == MSG_UNSEALED_NOW {
				now += 1;
			}
		}

		assert_eq!(now, 1);
		assert!(h.keystore.is_loaded());
		assert_eq!(h.keystore.get().unwrap().expose(), h.root_key.expose());
	}

	#[test]
	fn seal_status_strings() {
		assert_eq!(SealStatus::Sealed.to_string(), "sealed");
		assert_eq!(SealStatus::Unsealed.as_str(), "unsealed");
	}
}
