//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/crm-graph/config.toml` (XDG) or platform config dir
//! 2. Project config: `.crm-graph.toml`
//! 3. Environment variables: `CRM_GRAPH_*`, nested keys separated by `__`
//!    (e.g. `CRM_GRAPH_NEO4J__URI`)
//!
//! ```toml
//! [neo4j]
//! uri = "bolt://localhost:7687"
//! user = "neo4j"
//! password = "secret"
//! database = "neo4j"
//!
//! [consistency]
//! initial_interval_ms = 100
//! max_elapsed_ms = 5000
//! ```

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::consistency::BackoffPolicy;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub neo4j: Neo4jConfig,
    #[serde(default)]
    pub consistency: ConsistencyConfig,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    /// Bolt URI, e.g. `bolt://localhost:7687` or `neo4j+s://host:7687`.
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Database name used for every session.
    pub database: String,
    /// Size of the driver connection pool.
    pub max_connections: usize,
    /// Records fetched per PULL round trip.
    pub fetch_size: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            max_connections: 16,
            fetch_size: 200,
        }
    }
}

/// Backoff settings for the wait-for-node helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    pub max_elapsed_ms: u64,
    pub max_retries: u32,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        let standard = BackoffPolicy::standard();
        Self {
            initial_interval_ms: standard.initial_interval.as_millis() as u64,
            multiplier: standard.multiplier,
            max_interval_ms: standard.max_interval.as_millis() as u64,
            max_elapsed_ms: standard.max_elapsed.as_millis() as u64,
            max_retries: standard.max_retries,
        }
    }
}

impl ConsistencyConfig {
    /// Backoff policy described by this section.
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            multiplier: self.multiplier,
            max_interval: Duration::from_millis(self.max_interval_ms),
            max_elapsed: Duration::from_millis(self.max_elapsed_ms),
            max_retries: self.max_retries,
        }
    }
}

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = ".crm-graph.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CRM_GRAPH_";

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::user_config_path(), Path::new(PROJECT_CONFIG_FILE))
    }

    /// Load config from explicit file locations. Missing files are skipped.
    pub fn load_from(user_config: &Path, project_config: &Path) -> Result<Self, ConfigError> {
        Self::figment(user_config, project_config)
            .extract()
            .map_err(ConfigError::from)
    }

    fn figment(user_config: &Path, project_config: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(project_config))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// User config path: ~/.config/crm-graph/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("crm-graph").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("crm-graph").join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_when_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            Config::load_from(&dir.path().join("missing.toml"), &dir.path().join("nope.toml"))
                .unwrap();

        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.database, "neo4j");
        assert_eq!(config.consistency.max_retries, BackoffPolicy::standard().max_retries);
    }

    #[test]
    fn test_project_overrides_user() {
        let dir = tempfile::tempdir().unwrap();
        let user = write_file(
            dir.path(),
            "user.toml",
            "[neo4j]\nuri = \"bolt://user-host:7687\"\npassword = \"pw\"\n",
        );
        let project = write_file(
            dir.path(),
            "project.toml",
            "[neo4j]\nuri = \"bolt://project-host:7687\"\n\n[consistency]\nmax_retries = 3\n",
        );

        let config = Config::load_from(&user, &project).unwrap();
        assert_eq!(config.neo4j.uri, "bolt://project-host:7687");
        assert_eq!(config.neo4j.password, "pw");
        assert_eq!(config.consistency.max_retries, 3);
        assert_eq!(config.consistency.policy().max_retries, 3);
    }

    #[test]
    fn test_invalid_type_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_file(
            dir.path(),
            "project.toml",
            "[neo4j]\nmax_connections = \"many\"\n",
        );

        let result = Config::load_from(&dir.path().join("missing.toml"), &project);
        assert!(result.is_err());
    }
}
