// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-time creation of a deployment's root key.

use tracing::{info, instrument, warn};
use warden_server_keys::{digest_root_key, generate_root_key};

use crate::digest::{DigestStore, SharingParams, StoreOutcome};
use crate::error::{UnsealError, UnsealResult};
use crate::shamir::{split, Share};

/// Generate a root key, record its digest and sharing parameters, and hand
/// back the key pieces.
///
/// The root key itself is zeroed before this returns; the pieces are the only
/// way to recover it. Fails with `Conflict` if the deployment already has a
/// root key digest, in which case nothing new is handed out.
#[instrument(skip(store))]
pub async fn bootstrap_root_key(
	store: &dyn DigestStore,
	total: u8,
	threshold: u8,
) -> UnsealResult<Vec<Share>> {
	match store.get_digest().await {
		Ok(_) => {
			return Err(UnsealError::Conflict(
				"root key already initialised".to_string(),
			))
		}
		Err(UnsealError::NotFound(_)) => {}
		Err(e) => return Err(e),
	}

	let root_key = generate_root_key();
	let shares = split(root_key.expose(), total, threshold)?;

	let digest = digest_root_key(root_key.expose());
	match store
		.store_digest(&digest, SharingParams::new(total, threshold))
		.await?
	{
		StoreOutcome::Stored => {
			info!(total, threshold, "root key initialised");
			Ok(shares)
		}
		StoreOutcome::Exists => {
			warn!("root key digest appeared during initialisation, discarding new key");
			Err(UnsealError::Conflict(
				"root key already initialised".to_string(),
			))
		}
	}
}
