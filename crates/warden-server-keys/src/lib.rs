// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key hierarchy for Warden.
//!
//! Three classes of key protect user secrets:
//!
//! - **Root key (REK)**: 32 random bytes, split into key pieces at bootstrap and
//!   only ever resident in memory after unsealing. Its SHA-256 digest is the
//!   only durable trace.
//! - **Key encryption key (KEK)**: derived per user from their password and salt
//!   with PBKDF2-HMAC-SHA256. Never stored.
//! - **Data encryption key (DEK)**: random per secret, stored wrapped under the
//!   owner's KEK.
//!
//! Payloads are encrypted with the DEK using a chunked AEAD stream
//! ([`stream`]) so arbitrarily large secrets never need to be buffered.
//!
//! Wrapping a KEK under the REK is supported by the primitives here
//! ([`wrap_key`] with the REK as wrapping key) but no workflow does so yet.

mod argon2_config;
pub mod envelope;
pub mod error;
pub mod kek;
pub mod keys;
pub mod stream;

pub use envelope::{open_stream, seal_stream};
pub use error::{KeysError, KeysResult};
pub use kek::{
	derive_kek, generate_salt, hash_credential, verify_credential, KEK_PBKDF2_ITERATIONS, SALT_SIZE,
};
pub use keys::{
	digest_root_key, generate_dek, generate_root_key, unwrap_key, verify_root_key_digest, wrap_key,
	WrappedKey, DIGEST_SIZE, KEY_SIZE, NONCE_SIZE,
};
pub use stream::{
	decrypt_stream, encrypt_stream, DecryptingReader, EncryptingReader, STREAM_CHUNK_SIZE,
	STREAM_NONCE_PREFIX_SIZE,
};
