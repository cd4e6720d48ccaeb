use clap::Parser;
use serde::{Deserialize, Serialize};

/// Process configuration, env-first with CLI-flag overrides.
///
/// Every knob is a `clap` arg with an `env` fallback so the process can be
/// driven purely by environment variables in a container, or overridden on
/// the command line for local runs.
#[derive(Parser, Clone, Debug, Serialize, Deserialize)]
#[command(author, version, about = "Bouncer coordination service", long_about = None)]
pub struct Config {
	/// TCP port the HTTP coordination surface listens on.
	#[arg(long, env = "BOUNCER_PORT", default_value = "8089")]
	pub port: u16,

	/// Log verbosity passed to the tracing `EnvFilter` (e.g. "info", "debug").
	#[arg(long, env = "BOUNCER_LOGLEVEL", default_value = "info")]
	pub loglevel: String,

	/// Port the Prometheus `/metrics` text exposition is served on.
	#[arg(long, env = "BOUNCER_METRICS_PORT", default_value = "9089")]
	pub metrics_port: u16,

	/// Grace period allotted to in-flight waiters during shutdown before
	/// they're woken with `resource_deleted`.
	#[arg(long, env = "BOUNCER_SHUTDOWN_GRACE_SECS", default_value = "5")]
	pub shutdown_grace_secs: u64,
}

impl Config {
	pub fn new() -> Self {
		Self::parse()
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			port: 8089,
			loglevel: "info".to_string(),
			metrics_port: 9089,
			shutdown_grace_secs: 5,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = Config::default();
		assert_eq!(config.port, 8089);
		assert_eq!(config.loglevel, "info");
	}

	#[test]
	fn test_config_parser_overrides() {
		let args = vec!["bouncer", "--port", "9999", "--loglevel", "debug"];
		let config = Config::try_parse_from(args).unwrap();
		assert_eq!(config.port, 9999);
		assert_eq!(config.loglevel, "debug");
	}
}
