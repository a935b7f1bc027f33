// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory home of the reconstructed root key.

use parking_lot::RwLock;
use warden_common_secret::SecretBuffer;
use warden_server_keys::{unwrap_key, wrap_key, WrappedKey};

use crate::error::{UnsealError, UnsealResult};

/// Write-once holder for the root key.
///
/// `is_loaded` takes the shared lock so the request gate never contends with
/// other readers. Everything else takes the exclusive lock.
#[derive(Default)]
pub struct Keystore {
	root_key: RwLock<Option<SecretBuffer>>,
}

impl Keystore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy `root_key` in. Fails with `Conflict` if a key is already loaded;
	/// the loaded key is never replaced.
	pub fn load(&self, root_key: &[u8]) -> UnsealResult<()> {
		let mut slot = self.root_key.write();
		if slot.is_some() {
			return Err(UnsealError::Conflict("root key already loaded".to_string()));
		}
		*slot = Some(SecretBuffer::from_slice(root_key));
		Ok(())
	}

	/// A fresh copy of the root key. The caller owns the copy and it is zeroed
	/// when dropped.
	pub fn get(&self) -> UnsealResult<SecretBuffer> {
		let slot = self.root_key.write();
		slot
			.as_ref()
			.map(SecretBuffer::duplicate)
			.ok_or_else(|| UnsealError::NotReady("root key not loaded".to_string()))
	}

	pub fn is_loaded(&self) -> bool {
		self.root_key.read().is_some()
	}

	/// Zero and release the root key. Safe to call when nothing is loaded.
	pub fn wipe(&self) {
		let mut slot = self.root_key.write();
		if slot.take().is_some() {
			tracing::info!("root key wiped from keystore");
		}
	}

	/// Seal `key` under the root key.
	///
	/// Extension point for protecting user KEKs with the root key. Fails with
	/// `NotReady` while sealed.
	pub fn wrap_with_root_key(&self, key: &[u8]) -> UnsealResult<WrappedKey> {
		let root_key = self.get()?;
		Ok(wrap_key(root_key.expose(), key)?)
	}

	/// Reverse of [`Keystore::wrap_with_root_key`].
	pub fn unwrap_with_root_key(&self, wrapped: &WrappedKey) -> UnsealResult<SecretBuffer> {
		let root_key = self.get()?;
		Ok(unwrap_key(root_key.expose(), wrapped.as_bytes())?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use warden_server_keys::{generate_dek, generate_root_key, KeysError};

	#[test]
	fn starts_unloaded() {
		let keystore = Keystore::new();
		assert!(!keystore.is_loaded());
		assert!(matches!(keystore.get(), Err(UnsealError::NotReady(_))));
	}

	#[test]
	fn load_then_get_returns_copy() {
		let keystore = Keystore::new();
		let root_key = generate_root_key();

		keystore.load(root_key.expose()).unwrap();
		assert!(keystore.is_loaded());
		assert_eq!(keystore.get().unwrap().expose(), root_key.expose());
	}

	#[test]
	fn second_load_is_conflict_and_keeps_first() {
		let keystore = Keystore::new();
		let first = generate_root_key();
		let second = generate_root_key();

		keystore.load(first.expose()).unwrap();
		assert!(matches!(
			keystore.load(second.expose()),
			Err(UnsealError::Conflict(_))
		));
		assert_eq!(keystore.get().unwrap().expose(), first.expose());
	}

	#[test]
	fn wipe_resets_and_is_idempotent() {
		let keystore = Keystore::new();
		keystore.load(&[1u8; 32]).unwrap();

		keystore.wipe();
		assert!(!keystore.is_loaded());
		keystore.wipe();

		keystore.load(&[2u8; 32]).unwrap();
		assert_eq!(keystore.get().unwrap().expose(), &[2u8; 32]);
	}

	#[test]
	fn concurrent_loads_admit_exactly_one() {
		let keystore = Arc::new(Keystore::new());
		let handles: Vec<_> = (0..8u8)
			.map(|i| {
				let keystore = Arc::clone(&keystore);
				std::thread::spawn(move || keystore.load(&[i; 32]).is_ok())
			})
			.collect();

		let successes = handles
			.into_iter()
			.map(|h| h.join().unwrap())
			.filter(|ok| *ok)
			.count();
		assert_eq!(successes, 1);
	}

	#[test]
	fn wrap_with_root_key_requires_unseal() {
		let keystore = Keystore::new();
		let kek = generate_dek();
		assert!(matches!(
			keystore.wrap_with_root_key(kek.expose()),
			Err(UnsealError::NotReady(_))
		));

		keystore.load(generate_root_key().expose()).unwrap();
		let wrapped = keystore.wrap_with_root_key(kek.expose()).unwrap();
		let unwrapped = keystore.unwrap_with_root_key(&wrapped).unwrap();
		assert_eq!(unwrapped.expose(), kek.expose());
	}

	#[test]
	fn unwrap_with_other_root_key_fails() {
		let keystore = Keystore::new();
		keystore.load(generate_root_key().expose()).unwrap();
		let wrapped = keystore.wrap_with_root_key(generate_dek().expose()).unwrap();

		keystore.wipe();
		keystore.load(generate_root_key().expose()).unwrap();
		assert!(matches!(
			keystore.unwrap_with_root_key(&wrapped),
			Err(UnsealError::Keys(KeysError::DecryptFailed))
		));
	}
}
