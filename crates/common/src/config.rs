//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Poll limits.
    #[serde(default)]
    pub poll: PollConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Limits applied when a poll is defined.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Maximum number of options on a choice poll.
    #[serde(default = "default_max_options")]
    pub max_options: usize,
    /// Maximum option text length, in characters.
    #[serde(default = "default_max_option_length")]
    pub max_option_length: usize,
    /// Maximum question text length, in characters.
    #[serde(default = "default_max_question_length")]
    pub max_question_length: usize,
    /// Maximum likert label length, in characters.
    #[serde(default = "default_max_label_length")]
    pub max_label_length: usize,
    /// Largest accepted likert `scale_points`.
    #[serde(default = "default_max_scale_points")]
    pub max_scale_points: i32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_options: default_max_options(),
            max_option_length: default_max_option_length(),
            max_question_length: default_max_question_length(),
            max_label_length: default_max_label_length(),
            max_scale_points: default_max_scale_points(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_max_options() -> usize {
    10
}

const fn default_max_option_length() -> usize {
    100
}

const fn default_max_question_length() -> usize {
    500
}

const fn default_max_label_length() -> usize {
    50
}

const fn default_max_scale_points() -> i32 {
    10
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `POLIS_ENV`)
    /// 3. Environment variables with `POLIS_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("POLIS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("POLIS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("POLIS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_config_defaults() {
        let poll = PollConfig::default();
        assert_eq!(poll.max_options, 10);
        assert_eq!(poll.max_option_length, 100);
        assert_eq!(poll.max_scale_points, 10);
    }

    #[test]
    fn test_poll_section_is_optional() {
        let config: Config = config::Config::builder()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("database.url", "postgres://localhost/polis")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.poll.max_question_length, 500);
    }

    #[test]
    fn test_from_file_reads_sample_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = Config::from_file(path).unwrap();

        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.poll.max_label_length, 50);
    }
}
