//! Observable mutation types

use crate::error::{IntegrationError, Result};
use crate::options::{parse_confidence, ConfidenceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Traffic Light Protocol marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tlp {
    White,
    Green,
    Amber,
    Red,
}

impl Tlp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Green => "green",
            Self::Amber => "amber",
            Self::Red => "red",
        }
    }

    /// Tags only carry public (white) or private (red) visibility
    pub fn is_tag_visibility(&self) -> bool {
        matches!(self, Self::White | Self::Red)
    }

    /// Parse a TLP allowed on tags
    pub fn parse_tag_visibility(raw: &str) -> Result<Self> {
        match raw.parse::<Self>() {
            Ok(tlp) if tlp.is_tag_visibility() => Ok(tlp),
            _ => Err(IntegrationError::InvalidInput(
                "Invalid TLP specified.  TLP must be `white` or `red`".into(),
            )),
        }
    }
}

impl FromStr for Tlp {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Self::White),
            "green" => Ok(Self::Green),
            "amber" => Ok(Self::Amber),
            "red" => Ok(Self::Red),
            other => Err(IntegrationError::InvalidInput(format!(
                "Invalid TLP `{}`.  TLP must be one of white, green, amber or red",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Tlp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator status values ThreatStream accepts on update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    Active,
    Inactive,
    Falsepos,
}

impl FromStr for IndicatorStatus {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "falsepos" | "false-positive" => Ok(Self::Falsepos),
            other => Err(IntegrationError::InvalidInput(format!(
                "Invalid status `{}`.  Status must be active, inactive or falsepos",
                other
            ))),
        }
    }
}

/// Validated observable update, serialized as the PATCH body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObservableUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IndicatorStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlp: Option<Tlp>,
}

impl ObservableUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.confidence.is_none() && self.tlp.is_none()
    }

    /// Validate free-form update fields from the host
    pub fn from_fields(fields: &Value) -> Result<Self> {
        let map = fields.as_object().ok_or_else(|| {
            IntegrationError::InvalidInput("updateFields must be a JSON object".into())
        })?;

        let mut update = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "status" => update.status = Some(as_str(key, value)?.parse()?),
                "tlp" => update.tlp = Some(as_str(key, value)?.parse()?),
                "confidence" => {
                    let confidence = parse_confidence(value).map_err(|e| match e {
                        ConfidenceError::NotInteger => IntegrationError::InvalidInput(
                            "Confidence must be an integer".into(),
                        ),
                        ConfidenceError::OutOfRange => IntegrationError::InvalidInput(
                            "Confidence must be between 0 and 100".into(),
                        ),
                    })?;
                    update.confidence = Some(confidence);
                }
                other => {
                    return Err(IntegrationError::InvalidInput(format!(
                        "Unsupported observable field `{}`",
                        other
                    )))
                }
            }
        }

        if update.is_empty() {
            return Err(IntegrationError::InvalidInput(
                "No observable fields to update".into(),
            ));
        }

        Ok(update)
    }
}

fn as_str<'v>(key: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| IntegrationError::InvalidInput(format!("`{}` must be a string", key)))
}
