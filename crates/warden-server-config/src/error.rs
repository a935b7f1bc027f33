// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration error types.

use std::path::PathBuf;

/// Errors raised while loading the server configuration. All of them stop
/// startup before the database is opened or a key piece is accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// A `WARDEN_SERVER_*` variable that does not parse.
	#[error("Invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("Failed to parse TOML config at {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// A setting that parses but cannot run a custodian, such as a threshold
	/// above the piece count.
	#[error("Validation error: {0}")]
	Validation(String),
}
