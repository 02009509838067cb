use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Keys accepted by `lectern config get` and `lectern config set`.
pub const KEYS: &[&str] = &[
    "database_path",
    "docs_path",
    "embedding_model",
    "chunk_size",
    "chunk_overlap",
    "max_results",
];

/// Configuration for lectern.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (LECTERN_* prefix)
/// 3. Config file (~/.config/lectern/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database holding courses, chunks and embeddings.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: LECTERN_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/lectern/lectern.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Folder of course transcripts used when `ingest` is given no path.
    #[serde(default = "default_docs_path")]
    pub docs_path: PathBuf,

    /// Embedding model name, `hash-<dimensions>`.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Maximum chunk size, in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters of trailing context carried into the next chunk.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of search results returned when a query gives no limit.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default)]
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            docs_path: default_docs_path(),
            embedding_model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_results: default_max_results(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/lectern/config.toml
    /// Reads environment variables with LECTERN_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if the resulting values are inconsistent.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new()
            .context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path.to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder.add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("lectern");
        builder.add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build()
            .context("Failed to build configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// Check that chunking and search settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        if self.chunk_overlap >= self.chunk_size {
            anyhow::bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        if self.max_results == 0 {
            anyhow::bail!("max_results must be greater than zero");
        }
        Ok(())
    }

    /// Render a single setting, by key, for display.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "database_path" => self.database_path.display().to_string(),
            "docs_path" => self.docs_path.display().to_string(),
            "embedding_model" => self.embedding_model.clone(),
            "chunk_size" => self.chunk_size.to_string(),
            "chunk_overlap" => self.chunk_overlap.to_string(),
            "max_results" => self.max_results.to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {}\n\nValid keys: {}",
                key,
                KEYS.join(", ")
            ),
        };
        Ok(value)
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/lectern/lectern.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lectern")
        .join("lectern.db")
}

fn default_docs_path() -> PathBuf {
    PathBuf::from("docs")
}

fn default_embedding_model() -> String {
    lectern_search::DEFAULT_MODEL.to_string()
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

const fn default_max_results() -> usize {
    5
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/lectern/config.toml
/// - macOS: ~/Library/Application Support/lectern/config.toml
/// - Windows: %APPDATA%\lectern\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lectern")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Lectern Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (LECTERN_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite database
#
# Stores courses, lessons, chunks and their embeddings
#
# Can also be set via:
# - CLI: lectern --db /custom/path.db ingest docs/
# - Environment: LECTERN_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/lectern.db"

# Folder of course transcripts ingested when no path is given
docs_path = "docs"

# Embedding model, written as hash-<dimensions>
#
# Changing it marks stored embeddings stale; the next ingest re-embeds them.
embedding_model = "hash-384"

# Chunking, in characters
chunk_size = 800
chunk_overlap = 100

# Search results returned when no --limit is given
max_results = 5

# Logging
#[logging]
#level = "info"
#coloured = true
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config())
        .context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.database_path.as_os_str().is_empty());
        assert!(config.database_path.ends_with("lectern/lectern.db"));
        assert_eq!(config.docs_path, PathBuf::from("docs"));
        assert_eq!(config.embedding_model, "hash-384");
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.max_results, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_with_custom_db_path() {
        let custom_path = PathBuf::from("/tmp/test.db");
        let config = Config::load_with_db_path(custom_path.clone());
        assert!(config.is_ok());
        assert_eq!(config.unwrap().database_path, custom_path);
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let config = Config {
            chunk_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_results: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_get_known_and_unknown_keys() {
        let config = Config::default();
        assert_eq!(config.get("chunk_size").unwrap(), "800");
        assert_eq!(config.get("embedding_model").unwrap(), "hash-384");
        for key in KEYS {
            assert!(config.get(key).is_ok(), "{key} should be readable");
        }
        let err = config.get("acoustid_api_key").unwrap_err();
        assert!(err.to_string().contains("Valid keys"));
    }

    #[test]
    fn test_example_config_lists_defaults() {
        let example = example_config();
        assert!(example.contains("embedding_model = \"hash-384\""));
        assert!(example.contains("chunk_size = 800"));
    }
}
