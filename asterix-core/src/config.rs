//! Configuration file management for asterix-codec.
//!
//! Reads/writes `~/.asterix-codec/config.yaml` with the encoder range policy,
//! raw-bytes replay and the record length check.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::numeric::RangePolicy;
use crate::types::{AsterixError, Result};

/// Full configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub codec: CodecConfig,
    pub decode: DecodeConfig,
}

/// Settings baked into the codecs of a UAP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Out-of-range handling for saturating fields (ages, accuracies).
    pub range_policy: RangePolicy,
    /// Keep the bytes of every decoded item and re-emit them on encode.
    pub raw_replay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Treat bytes left after the last announced item as an error.
    pub strict_length: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        DecodeConfig {
            strict_length: true,
        }
    }
}

/// Get the config directory path (`~/.asterix-codec/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".asterix-codec")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.asterix-codec/config.yaml`.
///
/// Returns default config if the file doesn't exist or can't be parsed.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }
    load_config_from(&path).unwrap_or_default()
}

/// Load config from an explicit path. Unlike [`load_config`], a missing file
/// or a bad value is an error.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Save config to `~/.asterix-codec/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save config to an explicit path, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| AsterixError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config))
        .map_err(|e| AsterixError::Config(e.to_string()))
}

/// Parse simple YAML-like config text.
pub fn parse_config(text: &str) -> Result<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for (lineno, line) in text.lines().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            return Err(AsterixError::Config(format!(
                "line {}: expected `key: value`",
                lineno + 1
            )));
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        match (current_section.as_deref(), key) {
            (Some("codec"), "range_policy") => {
                config.codec.range_policy = parse_string_value(val).parse()?;
            }
            (Some("codec"), "raw_replay") => config.codec.raw_replay = parse_bool_value(key, val)?,
            (Some("decode"), "strict_length") => {
                config.decode.strict_length = parse_bool_value(key, val)?;
            }
            _ => {}
        }
    }

    Ok(config)
}

fn parse_string_value(val: &str) -> &str {
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn parse_bool_value(key: &str, val: &str) -> Result<bool> {
    match parse_string_value(val) {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        other => Err(AsterixError::Config(format!(
            "{key}: expected true or false, got {other:?}"
        ))),
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# asterix-codec configuration".to_string(), String::new()];

    lines.push("codec:".into());
    lines.push(format!("  range_policy: {}", config.codec.range_policy));
    lines.push(format!("  raw_replay: {}", config.codec.raw_replay));
    lines.push(String::new());

    lines.push("decode:".into());
    lines.push(format!("  strict_length: {}", config.decode.strict_length));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
