// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request boundary checks.
//!
//! Every inbound operation is passed through an ordered list of
//! [`RequestCheck`]s before it reaches a handler. The first rejection wins.
//! [`SealGate`] is the check that refuses service while the root key is not
//! in memory.

use std::collections::HashSet;
use std::sync::Arc;

use crate::keystore::Keystore;

/// Operations that stay reachable while sealed unless configured otherwise.
pub const DEFAULT_ALLOW_LIST: &[&str] = &["unseal", "login"];

/// Why a request was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRejection {
	pub check: &'static str,
	pub status_code: u16,
	pub code: &'static str,
	pub message: String,
}

impl GateRejection {
	pub fn sealed() -> Self {
		Self {
			check: SealGate::NAME,
			status_code: 503,
			code: "sealed",
			message: "server is sealed".to_string(),
		}
	}
}

pub trait RequestCheck: Send + Sync {
	fn name(&self) -> &'static str;

	fn check(&self, operation: &str) -> Result<(), GateRejection>;
}

/// Rejects everything outside the allow-list until the keystore is loaded.
pub struct SealGate {
	keystore: Arc<Keystore>,
	allow_list: HashSet<String>,
}

impl SealGate {
	pub const NAME: &'static str = "seal";

	pub fn new<I, S>(keystore: Arc<Keystore>, allow_list: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self {
			keystore,
			allow_list: allow_list
				.into_iter()
				.map(|op| op.as_ref().trim().to_ascii_lowercase())
				.filter(|op| !op.is_empty())
				.collect(),
		}
	}

	pub fn with_default_allow_list(keystore: Arc<Keystore>) -> Self {
		Self::new(keystore, DEFAULT_ALLOW_LIST.iter().copied())
	}

	pub fn is_allowed_while_sealed(&self, operation: &str) -> bool {
		self.allow_list.contains(&operation.to_ascii_lowercase())
	}
}

impl RequestCheck for SealGate {
	fn name(&self) -> &'static str {
		Self::NAME
	}

	fn check(&self, operation: &str) -> Result<(), GateRejection> {
		if self.is_allowed_while_sealed(operation) || self.keystore.is_loaded() {
			return Ok(());
		}
		tracing::debug!(operation, "request rejected while sealed");
		Err(GateRejection::sealed())
	}
}

/// Ordered chain of request checks.
#[derive(Clone, Default)]
pub struct RequestGate {
	checks: Vec<Arc<dyn RequestCheck>>,
}

impl RequestGate {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_check(mut self, check: Arc<dyn RequestCheck>) -> Self {
		self.checks.push(check);
		self
	}

	pub fn len(&self) -> usize {
		self.checks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.checks.is_empty()
	}

	pub fn check(&self, operation: &str) -> Result<(), GateRejection> {
		self
			.checks
			.iter()
			.try_for_each(|check| check.check(operation))
	}
}
