//! Configuration management
//!
//! This module handles loading, validation, and management of the catalog configuration.
//! Configuration is stored in TOML format at ~/.catalog/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Chat completion settings, tool round limit, OpenAI endpoint
//! - **store**: Vector store endpoint, collection names, query and batch limits
//! - **filter**: Padding clause for single-clause filters
//! - **ingest**: Default schedule CSV path
//!
//! The OpenAI API key is never written to this file. See [`crate::secrets`].
//!
//! # Examples
//!
//! ```no_run
//! use catalog_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Store: {}", config.store.base_url);
//! println!("Model: {}", config.llm.openai.model);
//! # Ok(())
//! # }
//! ```

use regex::Regex;
use sdk::errors::EngineError;
use sdk::FieldKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Vector store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Filter construction settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// CSV ingestion settings
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Maximum number of tool-call rounds per user question
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Timeout for a single completion request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Chat model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Embedding model used for similarity search
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    // Note: API key read from OPENAI_API_KEY or the OS keychain, not from config
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the Chroma server
    #[serde(default = "default_store_base_url")]
    pub base_url: String,

    /// Collection holding one document per course section
    #[serde(default = "default_courses_collection")]
    pub courses_collection: String,

    /// Reference collection of canonical instructor names
    #[serde(default = "default_instructors_collection")]
    pub instructors_collection: String,

    /// Reference collection of canonical subject titles
    #[serde(default = "default_subjects_collection")]
    pub subjects_collection: String,

    /// Maximum number of courses returned per lookup
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,

    /// Number of records per upsert request during ingestion
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Filter construction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Append the padding clause to single-clause filters
    #[serde(default = "default_true")]
    pub pad_single_clause: bool,

    /// Clause appended when padding is enabled
    #[serde(default)]
    pub padding: PaddingConfig,
}

impl FilterConfig {
    /// The padding clause, if padding is enabled
    pub fn padding_clause(&self) -> Option<&PaddingConfig> {
        self.pad_single_clause.then_some(&self.padding)
    }
}

/// A field/value pair that matches no real course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingConfig {
    pub field: FieldKey,
    pub value: String,
}

/// CSV ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Schedule CSV loaded by `catalog ingest` when no path is given
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.catalog")
}

fn default_max_tool_rounds() -> usize {
    3
}

fn default_request_timeout() -> u64 {
    120
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_store_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_courses_collection() -> String {
    "usf-courses".to_string()
}

fn default_instructors_collection() -> String {
    "instructors".to_string()
}

fn default_subjects_collection() -> String {
    "subjects".to_string()
}

fn default_query_limit() -> usize {
    50
}

fn default_batch_size() -> usize {
    500
}

fn default_true() -> bool {
    true
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("Fall 2024 Class Schedule 08082024.csv")
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            request_timeout_secs: default_request_timeout(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_base_url(),
            courses_collection: default_courses_collection(),
            instructors_collection: default_instructors_collection(),
            subjects_collection: default_subjects_collection(),
            query_limit: default_query_limit(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pad_single_clause: true,
            padding: PaddingConfig::default(),
        }
    }
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            field: FieldKey::Section,
            value: "999".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.catalog/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();

        // Serialize before path expansion so the file keeps the portable ~ form
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.catalog/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".catalog").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            store: StoreConfig::default(),
            filter: FilterConfig::default(),
            ingest: IngestConfig::default(),
        }
    }

    /// Path of the transcript database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join("catalog.db")
    }

    /// Validate and process configuration
    ///
    /// - Validates log level and numeric limits
    /// - Expands ~ in the data directory and creates it
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.max_tool_rounds == 0 {
            return Err(EngineError::Config(
                "max_tool_rounds must be at least 1".to_string(),
            ));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.store.query_limit == 0 {
            return Err(EngineError::Config(
                "query_limit must be at least 1".to_string(),
            ));
        }

        if self.store.batch_size == 0 {
            return Err(EngineError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let collections = [
            &self.store.courses_collection,
            &self.store.instructors_collection,
            &self.store.subjects_collection,
        ];
        if collections.iter().any(|name| name.trim().is_empty()) {
            return Err(EngineError::Config(
                "collection names must not be empty".to_string(),
            ));
        }
        if let Some(name) = collections.iter().find(|name| !is_valid_collection_name(name)) {
            return Err(EngineError::Config(format!(
                "Invalid collection name '{}'. Use 3-63 letters, digits, '.', '_' or '-', starting and ending with a letter or digit",
                name
            )));
        }

        if let Some(padding) = self.filter.padding_clause() {
            if padding.field.is_synthetic() {
                return Err(EngineError::Config(format!(
                    "padding field '{}' is resolved through a reference collection and cannot be used as a sentinel",
                    padding.field
                )));
            }
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

static COLLECTION_NAME: OnceLock<Option<Regex>> = OnceLock::new();

/// Collection names go into store URL paths as-is
fn is_valid_collection_name(name: &str) -> bool {
    COLLECTION_NAME
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{1,61}[A-Za-z0-9]$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
