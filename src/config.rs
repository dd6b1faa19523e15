//! Application configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by an optional user file, which is in turn overridden by the
//! environment.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compression]
//! max_input_bytes = 10485760  # Reject inputs larger than this (10 MiB)
//! timeout_secs = 30           # Upper bound for one decode or encode
//! quality = 0.8               # Initial quality slider (0.0-1.0)
//! format = "jpeg"             # Initial output format: jpeg, png, webp
//!
//! [proxy]
//! port = 10000                # Listen port (env PORT wins)
//! upstream_url = "https://api.naxordeve.qzz.io/ai/chatgpt_3.5_scr1"
//! max_body_bytes = 65536      # Largest accepted request body
//! ```
//!
//! ## Environment
//!
//! - `PORT` replaces `proxy.port`.
//! - `NAXOR_API_KEY`, when set, is forwarded upstream as `x-api-key`.
//!
//! A `.env` file in the working directory is loaded first, so both can live
//! there.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DEFAULT_MAX_INPUT_BYTES, OutputFormat};
use crate::session::{CompressionSettings, DEFAULT_QUALITY, SessionOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const PORT_ENV: &str = "PORT";
pub const API_KEY_ENV: &str = "NAXOR_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Image pipeline limits and initial settings.
    pub compression: CompressionConfig,
    /// README generation proxy.
    pub proxy: ProxyConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.compression.quality) {
            return Err(ConfigError::Validation(
                "compression.quality must be 0.0-1.0".into(),
            ));
        }
        if self.compression.max_input_bytes == 0 {
            return Err(ConfigError::Validation(
                "compression.max_input_bytes must be non-zero".into(),
            ));
        }
        if self.compression.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "compression.timeout_secs must be non-zero".into(),
            ));
        }
        if !self.proxy.upstream_url.starts_with("http://")
            && !self.proxy.upstream_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "proxy.upstream_url must be an http(s) URL".into(),
            ));
        }
        if self.proxy.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "proxy.max_body_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Image pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Inputs above this many bytes are rejected before decoding.
    pub max_input_bytes: u64,
    /// Upper bound in seconds for a single decode or compression run.
    pub timeout_secs: u64,
    /// Initial quality slider value.
    pub quality: f32,
    /// Initial output format.
    pub format: OutputFormat,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            timeout_secs: 30,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::default(),
        }
    }
}

impl CompressionConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            max_input_bytes: self.max_input_bytes,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn initial_settings(&self) -> CompressionSettings {
        CompressionSettings {
            format: self.format,
            quality: self.quality,
            ..CompressionSettings::default()
        }
    }
}

/// README generation proxy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub port: u16,
    /// Completion endpoint the prompt is forwarded to.
    pub upstream_url: String,
    pub max_body_bytes: u64,
    /// Never read from TOML; filled from `NAXOR_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 10000,
            upstream_url: "https://api.naxordeve.qzz.io/ai/chatgpt_3.5_scr1".to_string(),
            max_body_bytes: 64 * 1024,
            api_key: None,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Apply environment overrides through a lookup function.
///
/// Takes the lookup as a parameter so tests never touch the process
/// environment.
pub fn apply_env(
    mut config: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    if let Some(port) = lookup(PORT_ENV) {
        config.proxy.port = port.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("{PORT_ENV} must be a port number, got '{port}'"))
        })?;
    }
    config.proxy.api_key = lookup(API_KEY_ENV).filter(|k| !k.is_empty());
    Ok(config)
}

/// Load config from an optional TOML file plus the process environment.
///
/// A missing file is an error only when a path was given explicitly.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    let config = resolve_config(overlay)?;
    let config = apply_env(config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Shrinkray Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Image compression
# ---------------------------------------------------------------------------
[compression]
# Inputs larger than this many bytes are rejected before decoding.
max_input_bytes = 10485760

# Upper bound, in seconds, for decoding a source or running one compression.
timeout_secs = 30

# Initial quality slider, 0.0 (smallest) to 1.0 (best).
# JPEG and WebP use it directly. PNG is lossless: the value is scaled by 0.9
# and used as a compression-effort hint.
quality = 0.8

# Initial output format: "jpeg", "png" or "webp".
format = "jpeg"

# ---------------------------------------------------------------------------
# README generation proxy (`shrinkray serve`)
# ---------------------------------------------------------------------------
[proxy]
# Listen port. The PORT environment variable takes precedence.
port = 10000

# Completion endpoint that receives the generated prompt.
# Set NAXOR_API_KEY in the environment (or .env) to send an x-api-key header.
upstream_url = "https://api.naxordeve.qzz.io/ai/chatgpt_3.5_scr1"

# Largest accepted request body, in bytes.
max_body_bytes = 65536
"##
}
