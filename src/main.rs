use std::{net::SocketAddr, sync::Arc};

use axum::{extract::Request, ServiceExt};
use devfolio::{
	backend::{self, MemoryBackend, PgBackend},
	config::{self, Config},
	ratelimit, trace, RateLimits, State,
};
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

#[derive(Debug, thiserror::Error)]
enum Error {
	#[error("configuration: {0}")]
	Config(#[from] config::Error),
	#[error("tracing: {0}")]
	Trace(#[from] trace::Error),
	#[error("backend: {0}")]
	Backend(#[from] backend::Error),
	#[error(transparent)]
	RateLimit(#[from] ratelimit::InvalidConfig),
	#[error("server: {0}")]
	Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), Error> {
	let config = Config::from_env()?;
	let _guard = trace::init_tracing_subscriber(&config)?;

	let state = if let Some(database_url) = &config.database_url {
		let backend = Arc::new(PgBackend::connect(database_url, &config.public_url).await?);

		State::new(
			backend.clone(),
			backend.clone(),
			backend,
			&config.avatar_bucket,
		)
	} else {
		tracing::warn!("DATABASE_URL is not set, content is kept in memory and lost on exit");

		let backend = Arc::new(MemoryBackend::new(&config.public_url));

		State::new(
			backend.clone(),
			backend.clone(),
			backend,
			&config.avatar_bucket,
		)
	};

	let limits = if config.rate_limit {
		let limits = RateLimits {
			default: ratelimit::default()?,
			secure: ratelimit::secure()?,
		};

		ratelimit::spawn_cleanup(&[&limits.default, &limits.secure], ratelimit::CLEANUP_INTERVAL);
		Some(limits)
	} else {
		None
	};

	let app = NormalizePathLayer::trim_trailing_slash().layer(devfolio::router(state, limits));
	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!(address = %listener.local_addr()?, public_url = %config.public_url, "listening");

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await?;

	Ok(())
}
