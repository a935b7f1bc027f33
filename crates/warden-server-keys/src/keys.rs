// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Root and data key generation, AES-256-GCM key wrapping and the root key
//! digest.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use warden_common_secret::SecretBuffer;

use crate::error::{KeysError, KeysResult};

/// Size of every key in the hierarchy in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce prefixed to wrapped keys.
pub const NONCE_SIZE: usize = 12;

/// Size of the root key digest (SHA-256).
pub const DIGEST_SIZE: usize = 32;

/// A key sealed under another key: `nonce || AES-256-GCM ciphertext`.
///
/// Safe to persist; the payload key is only recoverable with the wrapping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
	bytes: Vec<u8>,
}

impl WrappedKey {
	pub fn from_bytes(bytes: Vec<u8>) -> Self {
		Self { bytes }
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.bytes
	}

	pub fn to_hex(&self) -> String {
		hex::encode(&self.bytes)
	}

	pub fn from_hex(encoded: &str) -> KeysResult<Self> {
		hex::decode(encoded)
			.map(Self::from_bytes)
			.map_err(|_| KeysError::InvalidInput("wrapped key is not valid hex".to_string()))
	}
}

/// Generate a fresh root encryption key from the OS CSPRNG.
pub fn generate_root_key() -> SecretBuffer {
	SecretBuffer::random(KEY_SIZE)
}

/// Generate a fresh data encryption key. Every call yields an independent key.
pub fn generate_dek() -> SecretBuffer {
	SecretBuffer::random(KEY_SIZE)
}

pub(crate) fn cipher_for(key: &[u8]) -> KeysResult<Aes256Gcm> {
	if key.len() != KEY_SIZE {
		return Err(KeysError::invalid_key_size(key.len()));
	}
	Aes256Gcm::new_from_slice(key).map_err(|_| KeysError::invalid_key_size(key.len()))
}

/// Seal `payload_key` under `wrapping_key` with a fresh random nonce.
///
/// Both keys must be exactly [`KEY_SIZE`] bytes.
pub fn wrap_key(wrapping_key: &[u8], payload_key: &[u8]) -> KeysResult<WrappedKey> {
	let cipher = cipher_for(wrapping_key)?;
	if payload_key.len() != KEY_SIZE {
		return Err(KeysError::invalid_key_size(payload_key.len()));
	}

	let mut nonce_bytes = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce_bytes);
	let nonce = Nonce::from_slice(&nonce_bytes);

	let ciphertext = cipher
		.encrypt(nonce, payload_key)
		.map_err(|_| KeysError::Internal("key wrapping failed".to_string()))?;

	let mut bytes = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
	bytes.extend_from_slice(&nonce_bytes);
	bytes.extend_from_slice(&ciphertext);
	Ok(WrappedKey { bytes })
}

/// Recover the payload key sealed by [`wrap_key`].
///
/// The authentication tag is checked in constant time by the AEAD; any
/// tampering or a wrong key yields [`KeysError::DecryptFailed`].
pub fn unwrap_key(wrapping_key: &[u8], wrapped: &[u8]) -> KeysResult<SecretBuffer> {
	let cipher = cipher_for(wrapping_key)?;
	if wrapped.len() < NONCE_SIZE {
		return Err(KeysError::InvalidInput(format!(
			"wrapped key must be at least {NONCE_SIZE} bytes, got {}",
			wrapped.len()
		)));
	}

	let (nonce_bytes, ciphertext) = wrapped.split_at(NONCE_SIZE);
	let plaintext = cipher
		.decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
		.map_err(|_| KeysError::DecryptFailed)?;

	Ok(SecretBuffer::new(plaintext))
}

/// SHA-256 of the root key. Used only to recognise the correct root key after
/// reconstruction, never as key material.
pub fn digest_root_key(root_key: &[u8]) -> [u8; DIGEST_SIZE] {
	Sha256::digest(root_key).into()
}

/// Constant-time check of `root_key` against a stored digest.
pub fn verify_root_key_digest(root_key: &[u8], expected: &[u8]) -> bool {
	digest_root_key(root_key).as_slice().ct_eq(expected).into()
}
