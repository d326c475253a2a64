//! Static integration configuration
//!
//! Loaded once at startup from TOML. Relative certificate and key paths are
//! resolved against the directory holding the configuration file.

use crate::entity::EntityType;
use crate::error::{IntegrationError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Integration-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Display name in the host
    pub name: String,
    /// Short label shown next to each result
    pub acronym: String,
    pub description: String,
    /// Entity types the host should deliver
    pub entity_types: Vec<EntityType>,
    pub request: RequestConfig,
    pub logging: LoggingConfig,
    /// Directory relative paths resolve against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            name: "Anomali ThreatStream".to_string(),
            acronym: "TS".to_string(),
            description: "Anomali ThreatStream threat intelligence lookups".to_string(),
            entity_types: vec![
                EntityType::IPv4,
                EntityType::IPv6,
                EntityType::Email,
                EntityType::Md5,
                EntityType::Sha1,
                EntityType::Sha256,
                EntityType::Domain,
                EntityType::Url,
            ],
            request: RequestConfig::default(),
            logging: LoggingConfig::default(),
            base_dir: None,
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// PEM client certificate path, empty to disable
    pub cert: String,
    /// PEM private key path, empty to disable
    pub key: String,
    /// Private key passphrase
    pub passphrase: String,
    /// Extra PEM root certificate path
    pub ca: String,
    /// HTTP(S) proxy URL, credentials may be embedded
    pub proxy: String,
    /// Reject servers with invalid certificates
    pub reject_unauthorized: bool,
    pub timeout_secs: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            cert: String::new(),
            key: String::new(),
            passphrase: String::new(),
            ca: String::new(),
            proxy: String::new(),
            reject_unauthorized: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    #[serde(alias = "fatal")]
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl IntegrationConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "Integration config not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        info!(path = %path.display(), "Loaded integration config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| IntegrationError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| IntegrationError::Config(e.to_string()))
    }

    /// Whether the host is configured to deliver `entity_type`
    pub fn supports(&self, entity_type: &EntityType) -> bool {
        self.entity_types.contains(entity_type)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn read_file(&self, path: &str, what: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path);
        std::fs::read(&resolved).map_err(|e| {
            IntegrationError::Config(format!("unable to read {} `{}`: {}", what, resolved.display(), e))
        })
    }

    /// Build the shared HTTP transport from `[request]`
    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        let request = &self.request;
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(request.timeout_secs.max(1)));

        if !request.passphrase.is_empty() {
            return Err(IntegrationError::Config(
                "encrypted private keys are not supported, provide an unencrypted PEM key".into(),
            ));
        }

        if !request.cert.is_empty() || !request.key.is_empty() {
            let mut pem = Vec::new();
            if !request.cert.is_empty() {
                pem.extend(self.read_file(&request.cert, "certificate")?);
                pem.push(b'\n');
            }
            if !request.key.is_empty() {
                pem.extend(self.read_file(&request.key, "private key")?);
            }
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| IntegrationError::Config(format!("invalid client identity: {}", e)))?;
            builder = builder.identity(identity);
        }

        if !request.ca.is_empty() {
            let ca = self.read_file(&request.ca, "certificate authority")?;
            let certificate = reqwest::Certificate::from_pem(&ca)
                .map_err(|e| IntegrationError::Config(format!("invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        if !request.proxy.is_empty() {
            let proxy = reqwest::Proxy::all(&request.proxy)
                .map_err(|e| IntegrationError::Config(format!("invalid proxy `{}`: {}", request.proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        if !request.reject_unauthorized {
            warn!("TLS certificate validation disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| IntegrationError::Config(format!("unable to build HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IntegrationConfig::default();
        assert_eq!(config.acronym, "TS");
        assert!(config.request.reject_unauthorized);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.supports(&EntityType::Sha256));
        assert!(!config.supports(&EntityType::Hash));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = IntegrationConfig::from_toml_str(
            r#"
            entity_types = ["IPv4", "domain"]

            [request]
            proxy = "http://proxy.internal:3128"
            reject_unauthorized = false

            [logging]
            level = "fatal"
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "Anomali ThreatStream");
        assert_eq!(config.entity_types, vec![EntityType::IPv4, EntityType::Domain]);
        assert_eq!(config.request.proxy, "http://proxy.internal:3128");
        assert!(!config.request.reject_unauthorized);
        assert_eq!(config.request.timeout_secs, 30);
        assert_eq!(config.logging.level, LogLevel::Error);
    }

    #[test]
    fn test_sample_config_parses() {
        let config =
            IntegrationConfig::from_toml_str(include_str!("../../../config/integration.toml")).unwrap();
        assert_eq!(config.entity_types, IntegrationConfig::default().entity_types);
        assert!(config.request.reject_unauthorized);
        assert!(config.build_http_client().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntegrationConfig::load(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.acronym, "TS");
        assert!(config.base_dir.is_none());
    }

    #[test]
    fn test_load_sets_base_dir_and_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("integration.toml");
        std::fs::write(&path, "[request]\nca = \"certs/ca.pem\"\n").unwrap();

        let config = IntegrationConfig::load(&path).unwrap();
        assert_eq!(config.resolve("certs/ca.pem"), dir.path().join("certs/ca.pem"));
        assert_eq!(config.resolve("/etc/ca.pem"), PathBuf::from("/etc/ca.pem"));

        // the CA file does not exist
        let err = config.build_http_client().unwrap_err();
        assert!(matches!(err, IntegrationError::Config(_)));
    }

    #[test]
    fn test_build_http_client() {
        let mut config = IntegrationConfig::default();
        assert!(config.build_http_client().is_ok());

        config.request.proxy = "http://proxy.internal:3128".into();
        assert!(config.build_http_client().is_ok());

        config.request.passphrase = "hunter2".into();
        assert!(matches!(
            config.build_http_client().unwrap_err(),
            IntegrationError::Config(_)
        ));
    }
}
