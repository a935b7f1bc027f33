// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_server::{create_app_state, create_router};
use warden_server_config::ServerConfig;
use warden_server_unseal::{bootstrap_root_key, DigestStore, SqliteDigestStore};

/// Warden server - root key custody over HTTP.
#[derive(Parser, Debug)]
#[command(name = "warden-server", about = "Warden root key custody server", version)]
struct Args {
	/// Config file path (defaults to /etc/warden/server.toml)
	#[arg(long, env = "WARDEN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Generate the root key and print its key pieces, one hex piece per line
	Init {
		/// Number of key pieces to produce
		#[arg(long)]
		shares: Option<u8>,
		/// Key pieces needed to unseal
		#[arg(long)]
		threshold: Option<u8>,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => warden_server_config::load_config_with_file(path)?,
		None => warden_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let pool = warden_server_db::create_pool(&config.database.url).await?;
	warden_server_db::run_migrations(&pool).await?;
	let digests: Arc<dyn DigestStore> = Arc::new(SqliteDigestStore::new(pool));

	match args.command.unwrap_or(Command::Serve) {
		Command::Init { shares, threshold } => {
			let total = shares.unwrap_or(config.unseal.total_shares);
			let threshold = threshold.unwrap_or(config.unseal.threshold);
			init(digests.as_ref(), total, threshold).await
		}
		Command::Serve => serve(&config, digests).await,
	}
}

async fn init(
	digests: &dyn DigestStore,
	total: u8,
	threshold: u8,
) -> Result<(), Box<dyn std::error::Error>> {
	let shares = bootstrap_root_key(digests, total, threshold).await?;
	for share in &shares {
		println!("{}", share.to_hex());
	}
	tracing::info!(total, threshold, "distribute each key piece to a different operator");
	Ok(())
}

async fn serve(
	config: &ServerConfig,
	digests: Arc<dyn DigestStore>,
) -> Result<(), Box<dyn std::error::Error>> {
	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting warden-server (sealed)"
	);

	let state = create_app_state(config, digests).await?;
	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
