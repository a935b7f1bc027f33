// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Root key custody for Warden.
//!
//! The server starts sealed: the root key exists only as key pieces held by
//! operators. Pieces are submitted one at a time to the [`UnsealCoordinator`],
//! which collects them in a [`ShareCollector`], reconstructs the root key once
//! the threshold is met, checks it against the stored digest and loads it into
//! the [`Keystore`]. Until then the [`RequestGate`] turns away every operation
//! outside its allow-list.

pub mod bootstrap;
pub mod collector;
pub mod coordinator;
pub mod digest;
pub mod error;
pub mod gate;
pub mod keystore;
pub mod shamir;

pub use bootstrap::bootstrap_root_key;
pub use collector::{ShareCollector, ROOT_KEY_PIECE_LEN};
pub use coordinator::{SealStatus, UnsealCoordinator, UnsealOutcome};
pub use digest::{
	DigestStore, InMemoryDigestStore, SharingParams, SqliteDigestStore, StoreOutcome,
};
pub use error::{UnsealError, UnsealResult};
pub use gate::{GateRejection, RequestCheck, RequestGate, SealGate, DEFAULT_ALLOW_LIST};
pub use keystore::Keystore;
pub use shamir::{combine, split, Share};
