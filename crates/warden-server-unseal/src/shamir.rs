// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Threshold splitting of the root key over GF(2^8).
//!
//! Each secret byte is the constant term of its own random polynomial of
//! degree `threshold - 1`. Key piece `x` holds the evaluations at `x` for every
//! byte, so a piece is `[x, y_0, y_1, ...]` and is one byte longer than the
//! secret. Any `threshold` pieces recover the secret by Lagrange interpolation
//! at zero; fewer reveal nothing about it.
//!
//! [`combine`] does not and cannot detect inconsistent pieces: a corrupted
//! piece yields a wrong secret, not an error. Callers must check the result
//! against the stored root key digest.

use std::fmt;

use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use warden_common_secret::SecretBuffer;
use zeroize::Zeroize;

use crate::error::{UnsealError, UnsealResult};

/// Smallest threshold accepted by [`split`].
pub const MIN_THRESHOLD: u8 = 2;

/// One key piece: x-coordinate followed by one y-value per secret byte.
pub struct Share {
	bytes: SecretBuffer,
}

impl Share {
	/// Parse a key piece. It must hold an index and at least one data byte, and
	/// the index must not be zero (that point is the secret itself).
	pub fn from_bytes(bytes: &[u8]) -> UnsealResult<Self> {
		if bytes.len() < 2 {
			return Err(UnsealError::InvalidInput(
				"key piece must be at least 2 bytes".to_string(),
			));
		}
		if bytes[0] == 0 {
			return Err(UnsealError::InvalidInput(
				"key piece index 0 is reserved".to_string(),
			));
		}
		Ok(Self {
			bytes: SecretBuffer::from_slice(bytes),
		})
	}

	pub fn from_hex(encoded: &str) -> UnsealResult<Self> {
		let mut bytes = hex::decode(encoded.trim())
			.map_err(|_| UnsealError::InvalidInput("key piece is not valid hex".to_string()))?;
		let share = Self::from_bytes(&bytes);
		bytes.zeroize();
		share
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.bytes.expose())
	}

	/// The x-coordinate of this piece.
	pub fn index(&self) -> u8 {
		self.bytes.expose()[0]
	}

	pub fn data(&self) -> &[u8] {
		&self.bytes.expose()[1..]
	}

	pub fn as_bytes(&self) -> &[u8] {
		self.bytes.expose()
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	pub fn duplicate(&self) -> Self {
		Self {
			bytes: self.bytes.duplicate(),
		}
	}

	/// Constant-time comparison of the full piece contents.
	pub fn ct_eq(&self, other: &Share) -> bool {
		self.bytes.ct_eq(other.as_bytes())
	}
}

impl fmt::Debug for Share {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Share")
			.field("index", &self.index())
			.field("len", &self.len())
			.field("data", &warden_common_secret::REDACTED)
			.finish()
	}
}

// ─────────────────────────────────────────────────────────────────────────────
// GF(2^8) arithmetic, AES polynomial x^8 + x^4 + x^3 + x + 1
// ─────────────────────────────────────────────────────────────────────────────

const MODULUS: u16 = 0x11B;

/// Branch-free multiplication.
fn gf_mul(a: u8, b: u8) -> u8 {
	let mut a = u16::from(a);
	let mut b = u16::from(b);
	let mut result: u16 = 0;

	for _ in 0..8 {
		let mask = 0u16.wrapping_sub(b & 1);
		result ^= a & mask;

		let reduce_mask = 0u16.wrapping_sub((a >> 7) & 1);
		a = (a << 1) ^ (MODULUS & reduce_mask);

		b >>= 1;
	}

	(result & 0xFF) as u8
}

/// a^254 = a^-1. Maps 0 to 0.
fn gf_inv(a: u8) -> u8 {
	let a2 = gf_mul(a, a);
	let a4 = gf_mul(a2, a2);
	let a8 = gf_mul(a4, a4);
	let a16 = gf_mul(a8, a8);
	let a32 = gf_mul(a16, a16);
	let a64 = gf_mul(a32, a32);
	let a128 = gf_mul(a64, a64);

	[a64, a32, a16, a8, a4, a2]
		.into_iter()
		.fold(a128, gf_mul)
}

/// Horner evaluation; `coefficients[0]` is the constant term.
fn poly_eval(coefficients: &[u8], x: u8) -> u8 {
	coefficients
		.iter()
		.rev()
		.fold(0u8, |acc, &c| gf_mul(acc, x) ^ c)
}

/// Split `secret` into `total` key pieces, any `threshold` of which recover it.
pub fn split(secret: &[u8], total: u8, threshold: u8) -> UnsealResult<Vec<Share>> {
	if threshold < MIN_THRESHOLD {
		return Err(UnsealError::InvalidInput(format!(
			"threshold must be at least {MIN_THRESHOLD}, got {threshold}"
		)));
	}
	if threshold > total {
		return Err(UnsealError::InvalidInput(format!(
			"threshold ({threshold}) cannot exceed total key pieces ({total})"
		)));
	}
	if secret.is_empty() {
		return Err(UnsealError::InvalidInput("secret must not be empty".to_string()));
	}

	let mut pieces: Vec<Vec<u8>> = (1..=total)
		.map(|x| {
			let mut piece = Vec::with_capacity(secret.len() + 1);
			piece.push(x);
			piece
		})
		.collect();

	let mut coefficients = vec![0u8; usize::from(threshold)];
	for &secret_byte in secret {
		coefficients[0] = secret_byte;
		OsRng.fill_bytes(&mut coefficients[1..]);

		for piece in &mut pieces {
			let x = piece[0];
			piece.push(poly_eval(&coefficients, x));
		}
	}
	coefficients.zeroize();

	Ok(pieces
		.into_iter()
		.map(|piece| Share {
			bytes: SecretBuffer::new(piece),
		})
		.collect())
}

/// Recover the secret from key pieces by interpolating at zero.
///
/// Errors only on structurally unusable input: fewer than two pieces, pieces
/// of differing length, or a repeated index. The result is not verified.
pub fn combine(shares: &[Share]) -> UnsealResult<SecretBuffer> {
	if shares.len() < usize::from(MIN_THRESHOLD) {
		return Err(UnsealError::InvalidInput(format!(
			"at least {MIN_THRESHOLD} key pieces are required, got {}",
			shares.len()
		)));
	}

	let len = shares[0].len();
	for (i, share) in shares.iter().enumerate() {
		if share.len() != len || share.len() < 2 {
			return Err(UnsealError::InvalidInput(
				"key pieces have mismatched lengths".to_string(),
			));
		}
		if share.index() == 0 {
			return Err(UnsealError::InvalidInput(
				"key piece index 0 is reserved".to_string(),
			));
		}
		if shares[..i]
			.iter()
			.any(|other| other.index().ct_eq(&share.index()).into())
		{
			return Err(UnsealError::InvalidInput(
				"duplicate key piece index".to_string(),
			));
		}
	}

	// Lagrange basis values at zero depend only on the x-coordinates:
	// L_i(0) = prod_{j != i} x_j / (x_i - x_j), with subtraction being XOR.
	let basis: Vec<u8> = shares
		.iter()
		.enumerate()
		.map(|(i, share)| {
			shares
				.iter()
				.enumerate()
				.filter(|(j, _)| *j != i)
				.fold(1u8, |acc, (_, other)| {
					let denominator = share.index() ^ other.index();
					gf_mul(acc, gf_mul(other.index(), gf_inv(denominator)))
				})
		})
		.collect();

	let mut secret = SecretBuffer::new(vec![0u8; len - 1]);
	for (position, out) in secret.expose_mut().iter_mut().enumerate() {
		*out = shares
			.iter()
			.zip(&basis)
			.fold(0u8, |acc, (share, &l)| acc ^ gf_mul(share.data()[position], l));
	}

	Ok(secret)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn gf_mul_known_values() {
		// FIPS-197 section 4.2 example: {57} * {83} = {c1}.
		assert_eq!(gf_mul(0x57, 0x83), 0xC1);
		assert_eq!(gf_mul(0x57, 0x13), 0xFE);
		assert_eq!(gf_mul(0, 0x13), 0);
		assert_eq!(gf_mul(1, 0xAB), 0xAB);
	}

	#[test]
	fn gf_inv_is_inverse_for_all_nonzero() {
		for a in 1..=255u8 {
			assert_eq!(gf_mul(a, gf_inv(a)), 1, "inverse failed for {a}");
		}
		assert_eq!(gf_inv(0), 0);
	}

	#[test]
	fn split_produces_indexed_pieces() {
		let shares = split(&[0xAA; 32], 10, 5).unwrap();
		assert_eq!(shares.len(), 10);
		for (i, share) in shares.iter().enumerate() {
			assert_eq!(share.index() as usize, i + 1);
			assert_eq!(share.len(), 33);
		}
	}

	#[test]
	fn split_rejects_bad_parameters() {
		assert!(matches!(split(b"k", 5, 1), Err(UnsealError::InvalidInput(_))));
		assert!(matches!(split(b"k", 3, 4), Err(UnsealError::InvalidInput(_))));
		assert!(matches!(split(b"", 3, 2), Err(UnsealError::InvalidInput(_))));
	}

	#[test]
	fn threshold_pieces_recover_secret() {
		let secret = SecretBuffer::random(32);
		let shares = split(secret.expose(), 10, 5).unwrap();

		let recovered = combine(&shares[3..8]).unwrap();
		assert_eq!(recovered.expose(), secret.expose());
	}

	#[test]
	fn all_pieces_recover_secret() {
		let secret = SecretBuffer::random(32);
		let shares = split(secret.expose(), 10, 5).unwrap();
		assert_eq!(combine(&shares).unwrap().expose(), secret.expose());
	}

	#[test]
	fn below_threshold_does_not_recover() {
		let secret = SecretBuffer::random(32);
		let shares = split(secret.expose(), 10, 5).unwrap();

		let recovered = combine(&shares[..4]).unwrap();
		assert_ne!(recovered.expose(), secret.expose());
	}

	#[test]
	fn corrupted_piece_yields_wrong_secret_silently() {
		let secret = SecretBuffer::random(32);
		let shares = split(secret.expose(), 5, 3).unwrap();

		let mut bytes = shares[1].as_bytes().to_vec();
		bytes[5] ^= 0x01;
		let corrupted = Share::from_bytes(&bytes).unwrap();

		let subset = [shares[0].duplicate(), corrupted, shares[2].duplicate()];
		let recovered = combine(&subset).unwrap();
		assert_ne!(recovered.expose(), secret.expose());
	}

	#[test]
	fn combine_rejects_structural_problems() {
		let shares = split(b"secret", 5, 3).unwrap();

		assert!(combine(&shares[..1]).is_err());

		let duplicate = [shares[0].duplicate(), shares[0].duplicate(), shares[1].duplicate()];
		assert!(combine(&duplicate).is_err());

		let short = Share::from_bytes(&[9, 1, 2]).unwrap();
		let mismatched = [shares[0].duplicate(), short];
		assert!(combine(&mismatched).is_err());
	}

	#[test]
	fn share_parsing_validates() {
		assert!(Share::from_bytes(&[]).is_err());
		assert!(Share::from_bytes(&[1]).is_err());
		assert!(Share::from_bytes(&[0, 1, 2]).is_err());
		assert!(Share::from_hex("not hex").is_err());

		let share = Share::from_hex("0102ff").unwrap();
		assert_eq!(share.index(), 1);
		assert_eq!(share.data(), &[0x02, 0xFF]);
		assert_eq!(share.to_hex(), "0102ff");
	}

	#[test]
	fn share_debug_is_redacted() {
		let share = Share::from_bytes(&[3, 0xDE, 0xAD]).unwrap();
		let debug = format!("{share:?}");
		assert!(debug.contains("index: 3"));
		assert!(debug.contains("[REDACTED]"));
		assert!(!debug.contains("222"));
	}

	proptest! {
		#[test]
		fn prop_any_threshold_subset_recovers(
			secret in proptest::collection::vec(any::<u8>(), 1..64),
			total in 2u8..12,
			threshold_seed in any::<u8>(),
			start_seed in any::<u8>(),
		) {
			let threshold = MIN_THRESHOLD + threshold_seed % (total - MIN_THRESHOLD + 1);
			let shares = split(&secret, total, threshold).unwrap();

			let start = usize::from(start_seed) % (usize::from(total - threshold) + 1);
			let subset: Vec<Share> = shares[start..start + usize::from(threshold)]
				.iter()
				.map(Share::duplicate)
				.collect();

			let recovered = combine(&subset).unwrap();
			prop_assert_eq!(recovered.expose(), secret.as_slice());
		}

		#[test]
		fn prop_piece_length_is_secret_plus_one(
			secret in proptest::collection::vec(any::<u8>(), 1..64),
		) {
			for share in split(&secret, 5, 3).unwrap() {
				prop_assert_eq!(share.len(), secret.len() + 1);
			}
		}
	}
}
