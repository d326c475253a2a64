//! CLI Commands

pub mod comments;
pub mod config;
pub mod lookup;
pub mod message;
pub mod observable;
pub mod tags;
pub mod validate;

use crate::config::Config;
use crate::output::OutputFormat;
use crate::{ConnectionArgs, FilterArgs};
use anyhow::{bail, Result};
use serde_json::{json, Value};
use threatstream_intel::{validate_options, Integration, Options};

/// Everything a command needs to talk to ThreatStream
pub struct Context {
    pub integration: Integration,
    pub options: Options,
    pub format: OutputFormat,
}

/// Host-shaped options: command line flags over the profile over defaults
pub fn raw_options(connection: &ConnectionArgs, filters: &FilterArgs, profile: &Config) -> Value {
    let severity = filters
        .min_severity
        .map(|s| s.as_str().to_string())
        .or_else(|| profile.minimum_severity.clone())
        .unwrap_or_else(|| "low".to_string());

    json!({
        "apiUrl": connection.api_url.as_ref().or(profile.api_url.as_ref()),
        "uiUrl": profile.ui_url,
        "username": connection.username.as_ref().or(profile.username.as_ref()),
        "apikey": connection.api_key.as_ref().or(profile.api_key.as_ref()),
        "minimumSeverity": severity,
        "minimumConfidence": filters.min_confidence.or(profile.minimum_confidence).unwrap_or(0),
        "activeOnly": !filters.include_inactive && profile.active_only.unwrap_or(true),
        "ignorePrivateIps": !filters.include_private && profile.ignore_private_ips.unwrap_or(true),
        "searchMyOrg": filters.my_org || profile.search_my_org.unwrap_or(false),
    })
}

/// Validated options for one invocation
pub fn build_options(connection: &ConnectionArgs, filters: &FilterArgs, profile: &Config) -> Result<Options> {
    let raw = raw_options(connection, filters, profile);

    let errors = validate_options(&raw);
    if !errors.is_empty() {
        let lines: Vec<String> = errors
            .iter()
            .map(|e| format!("  {}: {}", e.key, e.message))
            .collect();
        bail!(
            "invalid options (see `tsctl config` or pass them as flags):\n{}",
            lines.join("\n")
        );
    }

    Ok(Options::from_host_json(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use threatstream_intel::Severity;

    fn connection() -> ConnectionArgs {
        ConnectionArgs {
            api_url: Some("https://api.threatstream.com".into()),
            username: Some("analyst".into()),
            api_key: Some("secret".into()),
        }
    }

    #[test]
    fn test_flags_override_profile() {
        let profile = Config {
            api_url: Some("https://profile.example".into()),
            minimum_severity: Some("high".into()),
            minimum_confidence: Some(60),
            active_only: Some(true),
            ..Default::default()
        };
        let filters = FilterArgs {
            min_confidence: Some(10),
            include_inactive: true,
            ..Default::default()
        };

        let options = build_options(&connection(), &filters, &profile).unwrap();
        assert_eq!(options.api_url, "https://api.threatstream.com");
        assert_eq!(options.minimum_severity, Severity::High);
        assert_eq!(options.minimum_confidence, 10);
        assert!(!options.active_only);
        assert!(options.ignore_private_ips);
        assert!(!options.search_my_org);
    }

    #[test]
    fn test_missing_credentials_fail_validation() {
        let err = build_options(&ConnectionArgs::default(), &FilterArgs::default(), &Config::default())
            .unwrap_err()
            .to_string();
        assert!(err.contains("apiUrl"));
        assert!(err.contains("username"));
        assert!(err.contains("apikey"));
    }

    #[test]
    fn test_trailing_slash_rejected() {
        let mut connection = connection();
        connection.api_url = Some("https://api.threatstream.com/".into());

        let err = build_options(&connection, &FilterArgs::default(), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }
}
