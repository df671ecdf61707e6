use std::env;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::Level;
use url::Url;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_env")]
    pub env: String, // file / server
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub prefix: Option<String>,
    /// Origin and path that share URLs are built on.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Extra fonts loaded on top of the system ones.
    pub font_dir: Option<String>,
    /// Named preview slots kept alive at once; the least recent is evicted.
    #[serde(default = "default_max_previews")]
    pub max_previews: usize,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_env() -> String {
    "file".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_public_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_max_previews() -> usize {
    64
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: default_env(),
            host: default_host(),
            port: default_port(),
            prefix: None,
            public_url: default_public_url(),
            font_dir: None,
            max_previews: default_max_previews(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn public_url(&self) -> Result<Url> {
        Url::parse(&self.public_url)
            .with_context(|| format!("invalid PUBLIC_URL {:?}", self.public_url))
    }

    /// Unknown level names fall back to `INFO`.
    pub fn log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

/// Where the configuration came from, for logging once tracing is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    DotEnv,
    Environment,
}

impl ConfigSource {
    pub fn describe(&self) -> &'static str {
        match self {
            ConfigSource::DotEnv => "using .env file as environment variable",
            ConfigSource::Environment => "using server environment as environment variable",
        }
    }
}

/// Reads the configuration. Nothing is logged here: this runs before the
/// subscriber is installed, so callers log `ConfigSource::describe` later.
pub fn get_config() -> Result<(Config, ConfigSource)> {
    let env_var = env::var("env").unwrap_or("file".to_string());
    let source = if env_var == "file" {
        let _ = dotenvy::dotenv();
        ConfigSource::DotEnv
    } else {
        ConfigSource::Environment
    };
    let config =
        envy::from_env::<Config>().context("failed to read configuration from environment")?;
    Ok((config, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.public_url().unwrap().as_str(), "http://localhost:8000/");
        assert_eq!(config.log_level(), Level::INFO);
        assert_eq!(config.max_previews, 64);
    }

    #[test]
    fn config_source_describes_itself() {
        assert!(ConfigSource::DotEnv.describe().contains(".env"));
        assert!(ConfigSource::Environment.describe().contains("server"));
    }

    #[test]
    fn log_level_parses_names() {
        let config = Config {
            log_level: "debug".into(),
            ..Config::default()
        };
        assert_eq!(config.log_level(), Level::DEBUG);

        let config = Config {
            log_level: "chatty".into(),
            ..Config::default()
        };
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn bad_public_url_is_an_error() {
        let config = Config {
            public_url: "not a url".into(),
            ..Config::default()
        };
        assert!(config.public_url().is_err());
    }
}
