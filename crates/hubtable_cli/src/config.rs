//! Configuration file support for hubtable.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `HUBTABLE_`, sections separated by
//!    a double underscore, e.g. `HUBTABLE_GITHUB__TOKEN`)
//! 3. Local config file (./hubtable.toml)
//! 4. XDG config file (~/.config/hubtable/config.toml)
//! 5. Built-in defaults
//!
//! `GITHUB_TOKEN` is used when no token is configured anywhere else.
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use HUBTABLE_GITHUB__TOKEN / GITHUB_TOKEN
//! base_url = "https://ghe.example.com/api/v3"  # GitHub Enterprise Server
//!
//! [client]
//! requests_per_second = 10
//! no_rate_limit = false
//! max_retries = 5
//! timeout_secs = 30
//!
//! [query]
//! default_limit = 500
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use hubtable::ClientOptions;
use hubtable::github::DEFAULT_API_URL;
use hubtable::rate_limit::GITHUB_DEFAULT_RPS;
use hubtable::retry::{MAX_RETRIES, RetryConfig};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub client: ClientConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. Falls back to the `GITHUB_TOKEN` environment variable.
    pub token: Option<String>,
    /// REST API root; the GraphQL endpoint is derived from it.
    pub base_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// HTTP client knobs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub requests_per_second: u32,
    /// Disable client-side pacing entirely.
    pub no_rate_limit: bool,
    /// Retries for rate-limited, 5xx and transport failures.
    pub max_retries: usize,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: GITHUB_DEFAULT_RPS,
            no_rate_limit: false,
            max_retries: MAX_RETRIES,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Row limit applied when `query` is run without `--limit`.
    pub default_limit: Option<u64>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/hubtable/config.toml)
    /// 3. Local config file (./hubtable.toml)
    /// 4. Environment variables with HUBTABLE_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                tracing::debug!("Loading config from {:?}", path);
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
            }
        }

        let local_config = PathBuf::from("hubtable.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./hubtable.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(Self::environment());

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        };

        if config.github.token.is_none() {
            config.github.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        }
        config
    }

    fn environment() -> Environment {
        // e.g. HUBTABLE_CLIENT__MAX_RETRIES -> client.max_retries
        Environment::with_prefix("HUBTABLE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone()
    }

    /// Client options for these settings. `no_rate_limit` from the command
    /// line wins over the file.
    pub fn client_options(&self, no_rate_limit: bool) -> ClientOptions {
        let requests_per_second = if no_rate_limit || self.client.no_rate_limit {
            None
        } else {
            Some(self.client.requests_per_second.max(1))
        };

        ClientOptions::default()
            .with_base_url(self.github.base_url.clone())
            .with_requests_per_second(requests_per_second)
            .with_retry(RetryConfig::default().with_max_retries(self.client.max_retries))
            .with_timeout(Duration::from_secs(self.client.timeout_secs))
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "hubtable").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.base_url, "https://api.github.com");
        assert_eq!(config.client.requests_per_second, 10);
        assert!(!config.client.no_rate_limit);
        assert_eq!(config.client.max_retries, 5);
        assert_eq!(config.client.timeout_secs, 30);
        assert!(config.query.default_limit.is_none());
    }

    #[test]
    fn test_config_builder_with_toml_string() {
        let config = from_toml(
            r#"
            [github]
            token = "ghp_test123"
            base_url = "https://ghe.example.com/api/v3"

            [client]
            requests_per_second = 2
            max_retries = 1

            [query]
            default_limit = 50
        "#,
        );

        assert_eq!(config.github_token(), Some("ghp_test123".to_string()));
        assert_eq!(config.github.base_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.client.requests_per_second, 2);
        assert_eq!(config.client.max_retries, 1);
        assert_eq!(config.client.timeout_secs, 30);
        assert_eq!(config.query.default_limit, Some(50));
    }

    #[test]
    fn test_config_builder_partial_override() {
        let config = from_toml(
            r#"
            [client]
            timeout_secs = 5
        "#,
        );

        assert_eq!(config.client.timeout_secs, 5);
        assert_eq!(config.client.requests_per_second, 10);
        assert_eq!(config.github.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_merging_order() {
        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(
                "[client]\nrequests_per_second = 20\nmax_retries = 3",
                FileFormat::Toml,
            ))
            .add_source(config::File::from_str(
                "[client]\nrequests_per_second = 4",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = settings.try_deserialize().unwrap();

        assert_eq!(config.client.requests_per_second, 4);
        assert_eq!(config.client.max_retries, 3);
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str("[client\nmax_retries = 1", FileFormat::Toml))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_unknown_fields_ignored() {
        let config = from_toml(
            r#"
            [client]
            max_retries = 2
            unknown_field = "should be ignored"
        "#,
        );
        assert_eq!(config.client.max_retries, 2);
    }

    #[test]
    fn test_client_options_follow_config() {
        let config = from_toml(
            r#"
            [github]
            base_url = "https://ghe.example.com/api/v3/"

            [client]
            requests_per_second = 3
            max_retries = 0
            timeout_secs = 9
        "#,
        );

        let options = config.client_options(false);
        assert_eq!(options.base_url, "https://ghe.example.com/api/v3/");
        assert_eq!(options.requests_per_second, Some(3));
        assert_eq!(options.retry.max_retries, 0);
        assert_eq!(options.timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_no_rate_limit_from_flag_or_file() {
        let config = Config::default();
        assert_eq!(config.client_options(true).requests_per_second, None);

        let config = from_toml("[client]\nno_rate_limit = true");
        assert_eq!(config.client_options(false).requests_per_second, None);
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = Config::default_config_path() {
            assert!(path.to_string_lossy().contains("hubtable"));
            assert!(path.ends_with("config.toml"));
        }
    }
}
