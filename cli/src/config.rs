//! CLI profile configuration
//!
//! Profiles live in `~/.threatstream/config.toml` (or `config.<profile>.toml`)
//! and hold the per-user connection and filter options the integration
//! expects from its host.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Keys accepted by `tsctl config set/get`
pub const KEYS: [&str; 10] = [
    "api_url",
    "ui_url",
    "username",
    "api_key",
    "default_format",
    "minimum_severity",
    "minimum_confidence",
    "active_only",
    "ignore_private_ips",
    "search_my_org",
];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api_url: Option<String>,
    pub ui_url: Option<String>,
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub default_format: Option<String>,
    pub minimum_severity: Option<String>,
    pub minimum_confidence: Option<u8>,
    pub active_only: Option<bool>,
    pub ignore_private_ips: Option<bool>,
    pub search_my_org: Option<bool>,
}

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::config_path(profile)?)
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".threatstream").join(filename))
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_url" => self.api_url = Some(value.trim_end_matches('/').to_string()),
            "ui_url" => self.ui_url = Some(value.to_string()),
            "username" => self.username = Some(value.to_string()),
            "api_key" => self.api_key = Some(value.to_string()),
            "default_format" => match value {
                "table" | "json" | "yaml" => self.default_format = Some(value.to_string()),
                _ => bail!("default_format must be table, json or yaml"),
            },
            "minimum_severity" => {
                let severity: threatstream_intel::Severity = value.parse()?;
                self.minimum_severity = Some(severity.as_str().to_string());
            }
            "minimum_confidence" => {
                let confidence: u8 = value
                    .parse()
                    .ok()
                    .filter(|c| *c <= 100)
                    .ok_or_else(|| anyhow!("minimum_confidence must be an integer between 0 and 100"))?;
                self.minimum_confidence = Some(confidence);
            }
            "active_only" => self.active_only = Some(parse_bool(key, value)?),
            "ignore_private_ips" => self.ignore_private_ips = Some(parse_bool(key, value)?),
            "search_my_org" => self.search_my_org = Some(parse_bool(key, value)?),
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Display value of `key`, API keys masked
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "api_url" => self.api_url.clone(),
            "ui_url" => self.ui_url.clone(),
            "username" => self.username.clone(),
            "api_key" => self.api_key.as_deref().map(mask),
            "default_format" => self.default_format.clone(),
            "minimum_severity" => self.minimum_severity.clone(),
            "minimum_confidence" => self.minimum_confidence.map(|c| c.to_string()),
            "active_only" => self.active_only.map(|b| b.to_string()),
            "ignore_private_ips" => self.ignore_private_ips.map(|b| b.to_string()),
            "search_my_org" => self.search_my_org.map(|b| b.to_string()),
            _ => bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => bail!("{} must be true or false", key),
    }
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{}****", visible)
}
