// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-user key encryption keys.
//!
//! A user's KEK is never stored. It is re-derived from the user's password and
//! per-user salt with PBKDF2-HMAC-SHA256 each time it is needed, and only after
//! the password has been verified against the stored Argon2 credential hash.

use argon2::password_hash::{
	rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use rand::RngCore;
use sha2::Sha256;
use warden_common_secret::{SecretBuffer, SecretString};

use crate::argon2_config::argon2_instance;
use crate::error::{KeysError, KeysResult};
use crate::keys::KEY_SIZE;

/// PBKDF2 iteration count for KEK derivation. Changing it changes every
/// user's KEK, so it is part of the stored-data format.
pub const KEK_PBKDF2_ITERATIONS: u32 = 210_000;

/// Size of the per-user KEK salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Generate a random per-user KEK salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
	let mut salt = [0u8; SALT_SIZE];
	OsRng.fill_bytes(&mut salt);
	salt
}

/// Hash a password into an Argon2id PHC string for credential storage.
pub fn hash_credential(password: &SecretString) -> KeysResult<String> {
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(password.expose().as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|_| KeysError::Internal("failed to hash credential".to_string()))
}

/// Check a password against a stored Argon2 PHC hash.
pub fn verify_credential(password: &SecretString, credential_hash: &str) -> KeysResult<bool> {
	let parsed = PasswordHash::new(credential_hash)
		.map_err(|_| KeysError::Internal("invalid credential hash format".to_string()))?;

	Ok(
		argon2_instance()
			.verify_password(password.expose().as_bytes(), &parsed)
			.is_ok(),
	)
}

/// Derive the user's KEK.
///
/// Fails with [`KeysError::InvalidCredential`] unless `password` matches
/// `credential_hash`. For a given password and salt the result is always the
/// same [`KEY_SIZE`]-byte key.
#[tracing::instrument(skip_all)]
pub fn derive_kek(
	password: &SecretString,
	salt: &[u8],
	credential_hash: &str,
) -> KeysResult<SecretBuffer> {
	if salt.is_empty() {
		return Err(KeysError::InvalidInput("salt must not be empty".to_string()));
	}

	if !verify_credential(password, credential_hash)? {
		tracing::debug!("credential verification failed before KEK derivation");
		return Err(KeysError::InvalidCredential);
	}

	let mut kek = SecretBuffer::new(vec![0u8; KEY_SIZE]);
	pbkdf2::pbkdf2_hmac::<Sha256>(
		password.expose().as_bytes(),
		salt,
		KEK_PBKDF2_ITERATIONS,
		kek.expose_mut(),
	);
	Ok(kek)
}
