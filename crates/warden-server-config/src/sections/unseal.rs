// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Root key splitting and seal gate configuration.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_TOTAL_SHARES: u8 = 10;
const DEFAULT_THRESHOLD: u8 = 5;

fn default_allow_list() -> Vec<String> {
	vec!["unseal".to_string(), "login".to_string()]
}

/// Unseal configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct UnsealConfig {
	/// Key pieces produced when the root key is initialised.
	pub total_shares: u8,
	/// Key pieces needed to unseal.
	pub threshold: u8,
	/// Operations served while sealed.
	pub gate_allow_list: Vec<String>,
}

impl Default for UnsealConfig {
	fn default() -> Self {
		Self {
			total_shares: DEFAULT_TOTAL_SHARES,
			threshold: DEFAULT_THRESHOLD,
			gate_allow_list: default_allow_list(),
		}
	}
}

impl UnsealConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.threshold < 2 {
			return Err(ConfigError::Validation(format!(
				"unseal threshold must be at least 2, got {}",
				self.threshold
			)));
		}
		if self.threshold > self.total_shares {
			return Err(ConfigError::Validation(format!(
				"unseal threshold ({}) cannot exceed total shares ({})",
				self.threshold, self.total_shares
			)));
		}
		Ok(())
	}
}

/// Unseal configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsealConfigLayer {
	#[serde(default)]
	pub total_shares: Option<u8>,
	#[serde(default)]
	pub threshold: Option<u8>,
	#[serde(default)]
	pub gate_allow_list: Option<Vec<String>>,
}

impl UnsealConfigLayer {
	pub fn merge(&mut self, other: UnsealConfigLayer) {
		if other.total_shares.is_some() {
			self.total_shares = other.total_shares;
		}
		if other.threshold.is_some() {
			self.threshold = other.threshold;
		}
		if other.gate_allow_list.is_some() {
			self.gate_allow_list = other.gate_allow_list;
		}
	}

	pub fn finalize(self) -> UnsealConfig {
		UnsealConfig {
			total_shares: self.total_shares.unwrap_or(DEFAULT_TOTAL_SHARES),
			threshold: self.threshold.unwrap_or(DEFAULT_THRESHOLD),
			gate_allow_list: self.gate_allow_list.unwrap_or_else(default_allow_list),
		}
	}
}
