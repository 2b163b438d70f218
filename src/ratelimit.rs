use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::middleware::StateInformationMiddleware;
use tokio::task::JoinHandle;
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::PeerIpKeyExtractor,
	GovernorError,
};

use crate::error::AppError;

/// How often idle clients are forgotten.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

pub type Config = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

#[derive(Debug, thiserror::Error)]
#[error("invalid rate limit configuration")]
pub struct InvalidConfig;

/// The limit applied to the whole API: bursts of 50, refilled at 10 per second.
pub fn default() -> Result<Config, InvalidConfig> {
	build(100, 50)
}

/// The limit applied to the authentication routes, where every request
/// hashes a password: bursts of 5, refilled at 1 per second.
pub fn secure() -> Result<Config, InvalidConfig> {
	build(1000, 5)
}

/// A per-client limit that replenishes one request every `refill_ms`.
fn build(refill_ms: u64, burst_size: u32) -> Result<Config, InvalidConfig> {
	GovernorConfigBuilder::default()
		.per_millisecond(refill_ms)
		.burst_size(burst_size)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
		.ok_or(InvalidConfig)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

/// Spawns a task that periodically forgets the clients that have not been
/// seen recently, so the limiter state does not grow without bound.
pub fn spawn_cleanup(configs: &[&Config], every: Duration) -> JoinHandle<()> {
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();

	tokio::spawn(async move {
		let mut interval = tokio::time::interval(every);

		// The first tick completes immediately
		interval.tick().await;

		loop {
			interval.tick().await;

			for limiter in &limiters {
				limiter.retain_recent();
				limiter.shrink_to_fit();

				tracing::debug!(clients = limiter.len(), "pruned rate limiting state");
			}
		}
	})
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_configs_build() {
		assert!(default().is_ok());
		assert!(secure().is_ok());
	}

	#[test]
	fn test_zero_rate_is_invalid() {
		assert!(build(0, 5).is_err());
	}

	#[tokio::test]
	async fn test_cleanup_runs_until_aborted() {
		let config = secure().unwrap();
		let task = spawn_cleanup(&[&config], Duration::from_millis(5));

		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(!task.is_finished());

		task.abort();
		assert!(task.await.unwrap_err().is_cancelled());
	}
}
