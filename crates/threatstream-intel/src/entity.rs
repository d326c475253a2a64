//! Observed entities
//!
//! Entities are delivered by the host already classified. [`Entity::from_value`]
//! classifies a raw string for callers that have no recognition pipeline.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Entity type as named by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    IPv4,
    IPv6,
    Domain,
    Url,
    Hash,
    Md5,
    Sha1,
    Sha256,
    Email,
    Other(String),
}

impl EntityType {
    /// Host-facing name
    pub fn as_str(&self) -> &str {
        match self {
            Self::IPv4 => "IPv4",
            Self::IPv6 => "IPv6",
            Self::Domain => "domain",
            Self::Url => "url",
            Self::Hash => "hash",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Email => "email",
            Self::Other(name) => name,
        }
    }

    /// ThreatStream search type, `None` when the type cannot be searched
    pub fn search_type(&self) -> Option<SearchType> {
        match self {
            Self::IPv4 | Self::IPv6 => Some(SearchType::Ip),
            Self::Domain => Some(SearchType::Domain),
            Self::Url => Some(SearchType::Url),
            Self::Hash | Self::Md5 | Self::Sha1 | Self::Sha256 => Some(SearchType::Hash),
            Self::Email => Some(SearchType::Email),
            Self::Other(_) => None,
        }
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "ipv4" => Self::IPv4,
            "ipv6" => Self::IPv6,
            "domain" => Self::Domain,
            "url" => Self::Url,
            "hash" => Self::Hash,
            "md5" => Self::Md5,
            "sha1" => Self::Sha1,
            "sha256" => Self::Sha256,
            "email" => Self::Email,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<EntityType> for String {
    fn from(entity_type: EntityType) -> Self {
        entity_type.as_str().to_string()
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator type understood by the ThreatStream query language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Ip,
    Domain,
    Url,
    Hash,
    Email,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::Url => "url",
            Self::Hash => "hash",
            Self::Email => "email",
        }
    }

    /// Query clause, e.g. `type=ip`
    pub fn clause(&self) -> String {
        format!("type={}", self.as_str())
    }
}

/// An observed value delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub value: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default, rename = "isPrivateIP", alias = "isPrivateIp")]
    pub is_private_ip: bool,
}

impl Entity {
    pub fn new(value: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            value: value.into(),
            entity_type,
            is_private_ip: false,
        }
    }

    pub fn with_private_ip(mut self, is_private_ip: bool) -> Self {
        self.is_private_ip = is_private_ip;
        self
    }

    /// Classify a raw value, `None` if it looks like nothing we can search
    pub fn from_value(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(ip) = value.parse::<IpAddr>() {
            let entity_type = match ip {
                IpAddr::V4(_) => EntityType::IPv4,
                IpAddr::V6(_) => EntityType::IPv6,
            };
            return Some(Self::new(value, entity_type).with_private_ip(is_private_ip(&ip)));
        }

        if value.starts_with("http://") || value.starts_with("https://") {
            return Some(Self::new(value, EntityType::Url));
        }

        if value.contains('@') && value.contains('.') && !value.contains(' ') {
            return Some(Self::new(value, EntityType::Email));
        }

        if value.chars().all(|c| c.is_ascii_hexdigit()) {
            let entity_type = match value.len() {
                32 => Some(EntityType::Md5),
                40 => Some(EntityType::Sha1),
                64 => Some(EntityType::Sha256),
                _ => None,
            };
            if let Some(entity_type) = entity_type {
                return Some(Self::new(value, entity_type));
            }
        }

        if value.contains('.') && !value.contains('/') && !value.contains(' ') {
            return Some(Self::new(value, EntityType::Domain));
        }

        None
    }
}

/// Non-routable or reserved address check
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

fn is_private_v4(ip: &Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
