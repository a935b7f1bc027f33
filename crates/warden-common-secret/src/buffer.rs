// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::REDACTED;

/// Heap buffer for raw key material.
///
/// The contents are zeroed when the buffer drops. There is intentionally no
/// `Clone` impl: use [`SecretBuffer::duplicate`] to make an explicit copy.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer {
	bytes: Vec<u8>,
}

impl SecretBuffer {
	/// Takes ownership of `bytes`.
	pub fn new(bytes: Vec<u8>) -> Self {
		Self { bytes }
	}

	/// Copies `bytes` into a fresh buffer. The caller remains responsible for
	/// zeroing its own copy.
	pub fn from_slice(bytes: &[u8]) -> Self {
		Self {
			bytes: bytes.to_vec(),
		}
	}

	/// Fills a new buffer of `len` bytes from the operating system CSPRNG.
	pub fn random(len: usize) -> Self {
		let mut bytes = vec![0u8; len];
		OsRng.fill_bytes(&mut bytes);
		Self { bytes }
	}

	pub fn expose(&self) -> &[u8] {
		&self.bytes
	}

	pub fn expose_mut(&mut self) -> &mut [u8] {
		&mut self.bytes
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Makes an independent copy. Both copies are zeroed on drop.
	pub fn duplicate(&self) -> Self {
		Self::from_slice(&self.bytes)
	}

	/// Constant-time content comparison. Length mismatch returns false.
	pub fn ct_eq(&self, other: &[u8]) -> bool {
		self.bytes.as_slice().ct_eq(other).into()
	}
}

impl fmt::Debug for SecretBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SecretBuffer")
			.field("len", &self.bytes.len())
			.field("bytes", &REDACTED)
			.finish()
	}
}
