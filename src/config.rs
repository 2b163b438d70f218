//! Runtime configuration, read from the environment.
//!
//! A `.env` file in the working directory is loaded first, without
//! overriding variables that are already set.

use std::{env, net::IpAddr, str::FromStr};

use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{name} has an invalid value {value:?}: {reason}")]
	Invalid {
		name: &'static str,
		value: String,
		reason: String,
	},
	#[error("{name} is not valid unicode")]
	NotUnicode { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct Config {
	pub host: IpAddr,
	pub port: u16,
	/// The Postgres database. The in-memory backend is used when unset.
	pub database_url: Option<String>,
	/// The address the server is reachable at, used to build preview URLs.
	pub public_url: String,
	pub avatar_bucket: String,
	pub log_level: Level,
	/// Whether traces and metrics are exported over OTLP.
	pub otel_enabled: bool,
	/// The OTLP collector, the exporter's default when unset.
	pub otel_endpoint: Option<String>,
	/// The share of traces that are sampled, between 0 and 1.
	pub otel_sample_ratio: f64,
	pub rate_limit: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			host: IpAddr::from([127, 0, 0, 1]),
			port: 3000,
			database_url: None,
			public_url: "http://127.0.0.1:3000".into(),
			avatar_bucket: "files".into(),
			log_level: Level::INFO,
			otel_enabled: false,
			otel_endpoint: None,
			otel_sample_ratio: 1.0,
			rate_limit: true,
		}
	}
}

impl Config {
	/// Loads `.env`, then reads the configuration from the environment.
	pub fn from_env() -> Result<Self, Error> {
		dotenvy::dotenv().ok();

		Self::from_lookup(|name| env::var(name))
	}

	fn from_lookup<F>(lookup: F) -> Result<Self, Error>
	where
		F: Fn(&'static str) -> Result<String, env::VarError>,
	{
		let var = |name: &'static str| match lookup(name) {
			Ok(value) if value.trim().is_empty() => Ok(None),
			Ok(value) => Ok(Some(value)),
			Err(env::VarError::NotPresent) => Ok(None),
			Err(env::VarError::NotUnicode(..)) => Err(Error::NotUnicode { name }),
		};

		let defaults = Self::default();
		let host = parse(var("HOST")?, "HOST", defaults.host)?;
		let port = parse(var("PORT")?, "PORT", defaults.port)?;
		let otel_sample_ratio = parse(
			var("OTEL_SAMPLE_RATIO")?,
			"OTEL_SAMPLE_RATIO",
			defaults.otel_sample_ratio,
		)?;

		if !(0.0..=1.0).contains(&otel_sample_ratio) {
			return Err(Error::Invalid {
				name: "OTEL_SAMPLE_RATIO",
				value: otel_sample_ratio.to_string(),
				reason: "must be between 0 and 1".into(),
			});
		}

		let public_url = var("PUBLIC_URL")?
			.map_or_else(|| format!("http://{host}:{port}"), |url| url.trim_end_matches('/').to_owned());

		Ok(Self {
			host,
			port,
			database_url: var("DATABASE_URL")?,
			public_url,
			avatar_bucket: var("AVATAR_BUCKET")?.unwrap_or(defaults.avatar_bucket),
			log_level: parse(var("LOG_LEVEL")?, "LOG_LEVEL", defaults.log_level)?,
			otel_enabled: flag(var("OTEL_ENABLED")?, "OTEL_ENABLED", defaults.otel_enabled)?,
			otel_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT")?,
			otel_sample_ratio,
			rate_limit: flag(var("RATE_LIMIT")?, "RATE_LIMIT", defaults.rate_limit)?,
		})
	}
}

fn parse<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, Error>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	let Some(value) = value else {
		return Ok(default);
	};

	match value.trim().parse() {
		Ok(parsed) => Ok(parsed),
		Err(error) => Err(Error::Invalid {
			name,
			reason: error.to_string(),
			value,
		}),
	}
}

fn flag(value: Option<String>, name: &'static str, default: bool) -> Result<bool, Error> {
	let Some(value) = value else {
		return Ok(default);
	};

	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(Error::Invalid {
			name,
			value,
			reason: "expected true or false".into(),
		}),
	}
}
