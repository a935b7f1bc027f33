// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for Warden server.

pub mod digest;
pub mod error;
pub mod pool;
pub mod testing;

pub use digest::{DigestInsert, RootKeyDigestRepository, SharingRecord};
pub use error::{is_unique_constraint_error, DbError, Result};
pub use pool::{create_pool, run_migrations};
