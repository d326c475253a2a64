//! Per-call user options
//!
//! The host hands options over on every call, usually wrapped as
//! `{"key": {"value": ...}}`. Select-style options nest one level deeper.
//! [`Options::from_host_json`] unwraps both shapes before deserializing.

use crate::error::{IntegrationError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Indicator severity tier, ordered from least to most severe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::VeryHigh];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        }
    }

    /// This tier and every tier above it, ascending
    pub fn at_or_above(self) -> impl Iterator<Item = Severity> {
        Self::ALL.into_iter().filter(move |tier| *tier >= self)
    }
}

impl FromStr for Severity {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "very-high" | "very_high" | "veryhigh" => Ok(Self::VeryHigh),
            other => Err(IntegrationError::InvalidInput(format!(
                "unknown severity level `{}` (expected low, medium, high or very-high)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection and filter options for a single call
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// ThreatStream API server, scheme included, no trailing slash
    #[serde(alias = "url")]
    pub api_url: String,
    /// ThreatStream UI server, carried through for the host UI
    #[serde(default)]
    pub ui_url: Option<String>,
    pub username: String,
    #[serde(rename = "apikey", alias = "apiKey")]
    pub api_key: String,
    #[serde(default, deserialize_with = "deserialize_severity")]
    pub minimum_severity: Severity,
    #[serde(default, deserialize_with = "deserialize_confidence")]
    pub minimum_confidence: u8,
    #[serde(default = "default_true")]
    pub active_only: bool,
    #[serde(default = "default_true")]
    pub ignore_private_ips: bool,
    /// Restrict lookups to my organization's (non-public) intelligence
    #[serde(default)]
    pub search_my_org: bool,
}

fn default_true() -> bool {
    true
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("api_url", &self.api_url)
            .field("ui_url", &self.ui_url)
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .field("minimum_severity", &self.minimum_severity)
            .field("minimum_confidence", &self.minimum_confidence)
            .field("active_only", &self.active_only)
            .field("ignore_private_ips", &self.ignore_private_ips)
            .field("search_my_org", &self.search_my_org)
            .finish()
    }
}

impl Options {
    pub fn new(api_url: impl Into<String>, username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ui_url: None,
            username: username.into(),
            api_key: api_key.into(),
            minimum_severity: Severity::Low,
            minimum_confidence: 0,
            active_only: true,
            ignore_private_ips: true,
            search_my_org: false,
        }
    }

    /// Parse host-shaped options, unwrapping `{"value": ...}` envelopes
    pub fn from_host_json(raw: &Value) -> Result<Self> {
        let map = raw
            .as_object()
            .ok_or_else(|| IntegrationError::InvalidInput("options must be a JSON object".into()))?;

        let flattened: Map<String, Value> = map
            .iter()
            .map(|(key, value)| (key.clone(), unwrap_option_value(value).clone()))
            .collect();

        serde_json::from_value(Value::Object(flattened))
            .map_err(|e| IntegrationError::InvalidInput(format!("invalid options: {}", e)))
    }

    /// API base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Strip nested `{"value": ...}` envelopes
fn unwrap_option_value(mut value: &Value) -> &Value {
    while let Some(inner) = value.as_object().and_then(|obj| obj.get("value")) {
        value = inner;
    }
    value
}

fn deserialize_severity<'de, D>(deserializer: D) -> std::result::Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn deserialize_confidence<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    parse_confidence(&raw).map_err(serde::de::Error::custom)
}

/// Why a confidence value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceError {
    NotInteger,
    OutOfRange,
}

impl std::fmt::Display for ConfidenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInteger => write!(f, "confidence must be an integer"),
            Self::OutOfRange => write!(f, "confidence must be between 0 and 100"),
        }
    }
}

/// Integer confidence in `0..=100`, given as a JSON number or numeric string
pub fn parse_confidence(raw: &Value) -> std::result::Result<u8, ConfidenceError> {
    let number = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or(ConfidenceError::NotInteger)?;

    u8::try_from(number)
        .ok()
        .filter(|n| *n <= 100)
        .ok_or(ConfidenceError::OutOfRange)
}

/// A single option validation failure, keyed by option name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionError {
    pub key: String,
    pub message: String,
}

impl OptionError {
    fn new(key: &str, message: &str) -> Self {
        Self {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

/// Validate host-shaped user options, returning every problem found
pub fn validate_options(raw: &Value) -> Vec<OptionError> {
    let mut errors = Vec::new();

    let get = |key: &str| raw.get(key).map(unwrap_option_value);
    let non_empty_str = |key: &str| get(key).and_then(Value::as_str).filter(|s| !s.is_empty());

    match non_empty_str("apiUrl").or_else(|| non_empty_str("url")) {
        None => errors.push(OptionError::new(
            "apiUrl",
            "You must provide your ThreatStream server URL",
        )),
        Some(url) if url.ends_with('/') => errors.push(OptionError::new(
            "apiUrl",
            "The API URL cannot end with a trailing `/`",
        )),
        Some(_) => {}
    }

    if non_empty_str("username").is_none() {
        errors.push(OptionError::new(
            "username",
            "You must provide your ThreatStream username",
        ));
    }

    if non_empty_str("apikey").is_none() {
        errors.push(OptionError::new(
            "apikey",
            "You must provide your ThreatStream user's API Key",
        ));
    }

    match non_empty_str("minimumSeverity") {
        None => errors.push(OptionError::new(
            "minimumSeverity",
            "You must provide a minimum severity level",
        )),
        Some(severity) if severity.parse::<Severity>().is_err() => errors.push(OptionError::new(
            "minimumSeverity",
            "The minimum severity must be one of low, medium, high or very-high",
        )),
        Some(_) => {}
    }

    let confidence_message = match get("minimumConfidence").map(parse_confidence) {
        Some(Ok(_)) => None,
        Some(Err(ConfidenceError::OutOfRange)) => {
            Some("The Minimum Confidence value must be between 0 and 100")
        }
        Some(Err(ConfidenceError::NotInteger)) | None => {
            Some("The Minimum Confidence value must be an integer")
        }
    };
    if let Some(message) = confidence_message {
        errors.push(OptionError::new("minimumConfidence", message));
    }

    errors
}
