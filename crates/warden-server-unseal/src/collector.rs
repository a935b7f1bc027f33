// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Accumulates key pieces submitted by operators until the threshold is met.

use parking_lot::Mutex;
use warden_common_secret::SecretBuffer;
use warden_server_keys::KEY_SIZE;

use crate::error::{UnsealError, UnsealResult};
use crate::shamir::{combine, Share};

/// Length of a root key piece: the x-coordinate byte followed by one byte per
/// root key byte.
pub const ROOT_KEY_PIECE_LEN: usize = KEY_SIZE + 1;

/// Holds distinct key pieces, up to `threshold` of them.
///
/// Every operation takes the same lock, so `collect`, `reconstruct` and
/// `reset` never interleave.
pub struct ShareCollector {
	threshold: usize,
	shares: Mutex<Vec<Share>>,
}

impl ShareCollector {
	pub fn new(threshold: u8) -> Self {
		Self {
			threshold: usize::from(threshold),
			shares: Mutex::new(Vec::with_capacity(usize::from(threshold))),
		}
	}

	pub fn threshold(&self) -> usize {
		self.threshold
	}

	/// Add a key piece.
	///
	/// Pieces that are not [`ROOT_KEY_PIECE_LEN`] bytes are rejected with
	/// `InvalidInput` and never held. Fails with `Conflict` once `threshold`
	/// pieces are held. Resubmitting a piece that is already held succeeds
	/// without changing anything.
	pub fn collect(&self, share: Share) -> UnsealResult<()> {
		if share.len() != ROOT_KEY_PIECE_LEN {
			return Err(UnsealError::InvalidInput(format!(
				"key piece is {} bytes, expected {ROOT_KEY_PIECE_LEN}",
				share.len()
			)));
		}

		let mut shares = self.shares.lock();

		if shares.len() >= self.threshold {
			return Err(UnsealError::Conflict(format!(
				"already holding {} key pieces",
				shares.len()
			)));
		}

		if shares.iter().any(|held| held.ct_eq(&share)) {
			tracing::debug!(collected = shares.len(), "duplicate key piece ignored");
			return Ok(());
		}

		shares.push(share);
		tracing::debug!(collected = shares.len(), threshold = self.threshold, "key piece collected");
		Ok(())
	}

	pub fn size(&self) -> usize {
		self.shares.lock().len()
	}

	pub fn threshold_met(&self) -> bool {
		self.size() >= self.threshold
	}

	/// Operator-facing progress line.
	pub fn status_message(&self) -> String {
		progress_message(self.size(), self.threshold)
	}

	/// Combine the held pieces. The result is not verified.
	///
	/// Below the threshold this fails with `NotReady` carrying the progress
	/// line, counted under the same lock as the check.
	pub fn reconstruct(&self) -> UnsealResult<SecretBuffer> {
		let shares = self.shares.lock();
		if shares.len() < self.threshold {
			return Err(UnsealError::NotReady(progress_message(
				shares.len(),
				self.threshold,
			)));
		}
		combine(&shares)
	}

	/// Drop every held piece. Each piece zeroes itself on drop.
	pub fn reset(&self) {
		let mut shares = self.shares.lock();
		let dropped = shares.len();
		shares.clear();
		tracing::debug!(dropped, "key pieces wiped");
	}
}

fn progress_message(collected: usize, threshold: usize) -> String {
	format!("collected {collected} of {threshold} root key pieces")
}
