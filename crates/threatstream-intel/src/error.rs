//! Error types for the ThreatStream integration
//!
//! Every failure is surfaced to the immediate caller. Nothing is retried.
//! [`IntegrationError::to_payload`] renders an error into the JSON error
//! document the host dashboard expects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Prefix for every error code handed to the host
const ERROR_CODE_PREFIX: &str = "ThreatStream_";

/// ThreatStream integration error type
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// Connection or transport failure
    #[error("unable to connect to ThreatStream server: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP status other than the one the endpoint promises
    #[error("unexpected HTTP status {status} (expected {expected})")]
    UnexpectedStatus {
        status: u16,
        expected: u16,
        reason: Option<String>,
        body: Option<Value>,
    },

    /// Response body missing the fields we rely on
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Bad caller input (TLP, confidence, status, message payload)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Static configuration problem
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the ThreatStream integration
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// JSON error document returned to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub errors: Vec<ErrorObject>,
}

/// A single error entry of an [`ErrorPayload`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub detail: String,
    pub status: String,
    pub title: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ErrorObject {
    fn new(detail: impl Into<String>, status: impl ToString, title: &str, code: &str) -> Self {
        Self {
            detail: detail.into(),
            status: status.to_string(),
            title: title.to_string(),
            code: format!("{}{}", ERROR_CODE_PREFIX, code),
            meta: None,
        }
    }

    fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl IntegrationError {
    /// Short machine code, without the `ThreatStream_` prefix
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::UnexpectedStatus { .. } => "2A",
            Self::MalformedResponse(_) => "2B",
            Self::InvalidInput(_) => "2C",
            Self::Config(_) | Self::Io(_) => "2D",
        }
    }

    /// HTTP-ish status reported to the host
    pub fn status(&self) -> u16 {
        match self {
            Self::UnexpectedStatus { status, .. } => *status,
            Self::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    /// Render into the host's JSON error document
    pub fn to_payload(&self) -> ErrorPayload {
        let code = self.code();
        let status = self.status();

        let error = match self {
            Self::Network(err) => ErrorObject::new(
                "Unable to connect to ThreatStream server",
                status,
                "ThreatStream HTTP Request Failed",
                code,
            )
            .with_meta(json!({ "err": err.to_string() })),
            Self::UnexpectedStatus { expected, reason, body: Some(body), .. } => ErrorObject::new(
                "Unexpected HTTP response body",
                status,
                "ThreatStream HTTP Request Failed",
                code,
            )
            .with_meta(json!({ "expected": expected, "reason": reason, "body": body })),
            Self::UnexpectedStatus { expected, reason, body: None, .. } => ErrorObject::new(
                reason.clone().unwrap_or_else(|| format!("HTTP {}", status)),
                status,
                "ThreatStream HTTP Request Failed",
                code,
            )
            .with_meta(json!({ "expected": expected })),
            Self::MalformedResponse(msg) => {
                ErrorObject::new(msg.clone(), status, "ThreatStream Response Invalid", code)
            }
            Self::InvalidInput(msg) => ErrorObject::new(msg.clone(), status, "Invalid Input", code),
            Self::Config(msg) => {
                ErrorObject::new(msg.clone(), status, "Integration Configuration Error", code)
            }
            Self::Io(err) => {
                ErrorObject::new(err.to_string(), status, "Integration Configuration Error", code)
            }
        };

        ErrorPayload { errors: vec![error] }
    }
}

impl From<IntegrationError> for ErrorPayload {
    fn from(err: IntegrationError) -> Self {
        err.to_payload()
    }
}
