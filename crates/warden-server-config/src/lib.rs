// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for Warden server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`WARDEN_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use warden_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("unseal needs {} of {} pieces", config.unseal.threshold, config.unseal.total_shares);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub unseal: UnsealConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`WARDEN_SERVER_*`)
/// 2. Config file (`/etc/warden/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let unseal = layer.unseal.unwrap_or_default().finalize();

	database.validate()?;
	unseal.validate()?;

	info!(
		host = %http.host,
		port = http.port,
		database = %database.url,
		total_shares = unseal.total_shares,
		threshold = unseal.threshold,
		allow_list = ?unseal.gate_allow_list,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		database,
		logging,
		unseal,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_finalize_defaults() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.socket_addr(), "0.0.0.0:8080");
		assert_eq!(config.database.url, "sqlite:./warden.db");
		assert_eq!(config.logging.level, "info");
		assert_eq!(config.unseal.total_shares, 10);
		assert_eq!(config.unseal.threshold, 5);
	}

	#[test]
	fn test_finalize_rejects_bad_threshold() {
		let layer = ServerConfigLayer {
			unseal: Some(UnsealConfigLayer {
				total_shares: Some(3),
				threshold: Some(5),
				..Default::default()
			}),
			..Default::default()
		};
		let err = finalize(layer).unwrap_err();
		assert!(err.to_string().contains("cannot exceed"));
	}

	#[test]
	fn test_later_sources_override_earlier() {
		struct Fixed(Precedence, u8);

		impl ConfigSource for Fixed {
			fn name(&self) -> &'static str {
				"fixed"
			}

			fn precedence(&self) -> Precedence {
				self.0
			}

			fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
				Ok(ServerConfigLayer {
					unseal: Some(UnsealConfigLayer {
						threshold: Some(self.1),
						..Default::default()
					}),
					..Default::default()
				})
			}
		}

		// Deliberately out of order; sorting decides the winner.
		let sources: Vec<Box<dyn ConfigSource>> = vec![
			Box::new(Fixed(Precedence::Environment, 4)),
			Box::new(Fixed(Precedence::ConfigFile, 3)),
			Box::new(DefaultsSource),
		];
		let config = load_from_sources(sources).unwrap();
		assert_eq!(config.unseal.threshold, 4);
	}

	#[test]
	fn test_socket_addr() {
		let config = ServerConfig {
			http: HttpConfig {
				host: "127.0.0.1".to_string(),
				port: 9000,
			},
			..Default::default()
		};
		assert_eq!(config.socket_addr(), "127.0.0.1:9000");
	}
}
