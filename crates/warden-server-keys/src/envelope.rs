// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Envelope encryption of secret payloads: a fresh DEK per payload, sealed
//! under the owner's KEK and stored next to the ciphertext.

use std::io::Read;

use crate::error::KeysResult;
use crate::keys::{generate_dek, unwrap_key, wrap_key, WrappedKey};
use crate::stream::{decrypt_stream, encrypt_stream, DecryptingReader, EncryptingReader};

/// Generate a DEK for a new payload, wrap it under `kek` and return the wrapped
/// DEK together with a reader producing the encrypted payload.
///
/// The plaintext DEK is zeroed before this returns.
pub fn seal_stream<R: Read>(kek: &[u8], payload: R) -> KeysResult<(WrappedKey, EncryptingReader<R>)> {
	let dek = generate_dek();
	let wrapped = wrap_key(kek, dek.expose())?;
	let reader = encrypt_stream(payload, dek.expose())?;
	Ok((wrapped, reader))
}

/// Unwrap the payload's DEK with `kek` and return a reader producing plaintext.
pub fn open_stream<R: Read>(
	kek: &[u8],
	wrapped_dek: &WrappedKey,
	ciphertext: R,
) -> KeysResult<DecryptingReader<R>> {
	let dek = unwrap_key(kek, wrapped_dek.as_bytes())?;
	decrypt_stream(ciphertext, dek.expose())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::KeysError;
	use std::io::Cursor;

	#[test]
	fn seal_then_open() {
		let kek = generate_dek();
		let (wrapped, mut sealed) = seal_stream(kek.expose(), Cursor::new(b"top secret".to_vec())).unwrap();

		let mut ciphertext = Vec::new();
		sealed.read_to_end(&mut ciphertext).unwrap();

		let mut plaintext = Vec::new();
		open_stream(kek.expose(), &wrapped, Cursor::new(ciphertext))
			.unwrap()
			.read_to_end(&mut plaintext)
			.unwrap();
		assert_eq!(plaintext, b"top secret");
	}

	#[test]
	fn open_with_other_kek_fails_before_reading() {
		let (wrapped, _) = seal_stream(generate_dek().expose(), Cursor::new(Vec::new())).unwrap();
		let result = open_stream(generate_dek().expose(), &wrapped, Cursor::new(Vec::new()));
		assert!(matches!(result, Err(KeysError::DecryptFailed)));
	}
}
