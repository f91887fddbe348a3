use std::{net::IpAddr, path::PathBuf};

/// An invalid configuration value.
#[derive(Debug, thiserror::Error)]
#[error("{name} must be a valid {kind}, got {value:?}")]
pub struct Error {
	name: &'static str,
	kind: &'static str,
	value: String,
}

/// Service configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
	/// PostgreSQL connection string. Posts are kept in memory when unset.
	pub database_url: Option<String>,
	pub host: IpAddr,
	pub port: u16,
	/// Directory uploaded files are stored in.
	pub media_root: PathBuf,
	/// Whether to export traces and metrics over OTLP.
	pub otlp: bool,
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		fn parse<T: std::str::FromStr>(
			name: &'static str,
			kind: &'static str,
			value: Option<String>,
			default: T,
		) -> Result<T, Error> {
			match value {
				Some(value) => value.parse().map_err(|_| Error { name, kind, value }),
				None => Ok(default),
			}
		}

		Ok(Self {
			database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
			host: parse("HOST", "ip address", lookup("HOST"), [127, 0, 0, 1].into())?,
			port: parse("PORT", "port number", lookup("PORT"), 3000)?,
			media_root: lookup("MEDIA_ROOT").map_or_else(|| "media".into(), PathBuf::from),
			otlp: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").is_some_and(|endpoint| !endpoint.is_empty()),
		})
	}
}

#[cfg(test)]
mod test {
	use std::collections::HashMap;

	use super::*;

	fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
		let vars = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect::<HashMap<_, _>>();

		Config::from_lookup(|name| vars.get(name).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = config(&[]).unwrap();

		assert_eq!(config.database_url, None);
		assert_eq!(config.host, IpAddr::from([127, 0, 0, 1]));
		assert_eq!(config.port, 3000);
		assert_eq!(config.media_root, PathBuf::from("media"));
		assert!(!config.otlp);
	}

	#[test]
	fn test_overrides() {
		let config = config(&[
			("DATABASE_URL", "postgres://localhost/blog"),
			("HOST", "0.0.0.0"),
			("PORT", "8080"),
			("MEDIA_ROOT", "/var/media"),
			("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
		])
		.unwrap();

		assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/blog"));
		assert_eq!(config.host, IpAddr::from([0, 0, 0, 0]));
		assert_eq!(config.port, 8080);
		assert_eq!(config.media_root, PathBuf::from("/var/media"));
		assert!(config.otlp);
	}

	#[test]
	fn test_invalid_port() {
		let error = config(&[("PORT", "http")]).unwrap_err();

		assert_eq!(error.to_string(), r#"PORT must be a valid port number, got "http""#);
	}
}
