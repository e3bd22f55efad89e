use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compose::ContextFormat;

/// Location consulted when no `--config` flag is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/chx.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_max_files")]
    pub max_files_per_batch: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_max_file_size() -> u64 {
    50_000_000
}
fn default_max_files() -> usize {
    10
}
fn default_concurrency() -> usize {
    4
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size_bytes: default_max_file_size(),
            max_files_per_batch: default_max_files(),
            concurrency: default_concurrency(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_enable_memory")]
    pub enable_memory: bool,
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
    #[serde(default)]
    pub context_format: ContextFormat,
}

fn default_enable_memory() -> bool {
    true
}
fn default_max_context_messages() -> usize {
    10
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            enable_memory: default_enable_memory(),
            max_context_messages: default_max_context_messages(),
            context_format: ContextFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    256
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load `path` when given, else `config/chx.toml` when it exists, else defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return load_config(path);
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
    if fallback.is_file() {
        return load_config(&fallback);
    }
    Ok(Config::default())
}

fn validate_config(config: &Config) -> Result<()> {
    // Validate ingest
    if config.ingest.chunk_size == 0 {
        anyhow::bail!("ingest.chunk_size must be > 0");
    }
    if config.ingest.max_file_size_bytes == 0 {
        anyhow::bail!("ingest.max_file_size_bytes must be > 0");
    }
    if config.ingest.max_files_per_batch < 1 {
        anyhow::bail!("ingest.max_files_per_batch must be >= 1");
    }
    if config.ingest.concurrency < 1 {
        anyhow::bail!("ingest.concurrency must be >= 1");
    }

    // Validate render
    if config.render.cache_capacity < 1 {
        anyhow::bail!("render.cache_capacity must be >= 1");
    }

    Ok(())
}
