use std::{env, net::IpAddr};

use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{name} is not valid: {value:?}")]
	Invalid { name: &'static str, value: String },
}

/// Settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
	/// PostgreSQL connection string. Without one, posts are kept in memory.
	pub database_url: Option<String>,
	pub host: IpAddr,
	pub port: u16,
	/// The login page of the identity service, anonymous clients are sent
	/// here when a page requires a session.
	pub login_url: String,
	/// Enables the OpenTelemetry exporters when set.
	pub otlp_endpoint: Option<String>,
	pub log_level: Level,
	/// The most rendered pages kept in the page cache at once.
	pub page_cache_max_entries: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			database_url: None,
			host: IpAddr::from([127, 0, 0, 1]),
			port: 3000,
			login_url: "/auth/login/".into(),
			otlp_endpoint: None,
			log_level: Level::INFO,
			page_cache_max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
		}
	}
}

/// Reads a variable, treating an empty value as unset.
fn var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, Error> {
	match var(name) {
		Some(value) => value.trim().parse().map_err(|_| Error::Invalid { name, value }),
		None => Ok(default),
	}
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		let defaults = Self::default();

		Ok(Self {
			database_url: var("DATABASE_URL"),
			host: parse("HOST", defaults.host)?,
			port: parse("PORT", defaults.port)?,
			login_url: var("LOGIN_URL").unwrap_or(defaults.login_url),
			otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
			log_level: parse("LOG_LEVEL", defaults.log_level)?,
			page_cache_max_entries: parse(
				"PAGE_CACHE_MAX_ENTRIES",
				defaults.page_cache_max_entries,
			)?,
		})
	}
}
