// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database configuration.
//!
//! The database holds the write-once root key digest record: the SHA-256
//! digest of the root key and the piece count and threshold it was split
//! with. Losing it means the key pieces can no longer be verified, so the
//! default points at a file rather than an in-memory database.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite:./warden.db";

/// Database configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	/// SQLite connection URL for the root key digest record.
	pub url: String,
}

impl DatabaseConfig {
	/// Only SQLite is supported, and an in-memory database would drop the
	/// digest record on restart.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.url.starts_with("sqlite:") {
			return Err(ConfigError::Validation(format!(
				"database url must be a sqlite: url, got {}",
				self.url
			)));
		}
		if self.url.contains(":memory:") {
			return Err(ConfigError::Validation(
				"an in-memory database cannot keep the root key digest record".to_string(),
			));
		}
		Ok(())
	}
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_DATABASE_URL.to_string(),
		}
	}
}

/// Database configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_url() {
		let config = DatabaseConfigLayer::default().finalize();
		assert_eq!(config.url, "sqlite:./warden.db");
	}

	#[test]
	fn test_custom_url() {
		let layer = DatabaseConfigLayer {
			url: Some("sqlite:/var/lib/warden/data.db".to_string()),
		};
		let config = layer.finalize();
		assert_eq!(config.url, "sqlite:/var/lib/warden/data.db");
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_non_sqlite_url_is_rejected() {
		let config = DatabaseConfigLayer {
			url: Some("postgres://localhost/warden".to_string()),
		}
		.finalize();
		assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_in_memory_url_is_rejected() {
		let config = DatabaseConfigLayer {
			url: Some("sqlite::memory:".to_string()),
		}
		.finalize();
		assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
	}
}
