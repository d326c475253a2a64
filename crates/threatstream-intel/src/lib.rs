//! Anomali ThreatStream Integration
//!
//! Looks up observed entities (IPs, domains, hashes, URLs, emails) against the
//! ThreatStream intelligence API and backs the analyst actions of the details
//! view: tag search, tagging, commenting and observable updates.
//!
//! # Features
//! - Bounded query batching with private/reserved address filtering
//! - Severity, confidence, status and visibility filtered search queries
//! - Preferred tag cache (organization tags + kill-chain phases)
//! - Structured error documents for every failure
//!
//! # Architecture
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       HOST DASHBOARD                           │
//! │     do_lookup        on_details        on_message (actions)    │
//! └────────┬────────────────┬──────────────────┬───────────────────┘
//!          ▼                │                  ▼
//! ┌─────────────────┐       │        ┌───────────────────┐
//! │  Entity Batcher │       │        │     Tag Cache     │
//! └────────┬────────┘       │        │ preferred + merge │
//!          ▼                │        └─────────┬─────────┘
//! ┌─────────────────┐       │                  │
//! │  Query Builder  │       │                  │
//! └────────┬────────┘       │                  │
//!          ▼                ▼                  ▼
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     ThreatStream Client                        │
//! │  intelligence | user | tag | orgtag | comments | observable    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod batcher;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod integration;
pub mod lookup;
pub mod message;
pub mod observable;
pub mod options;
pub mod query;
pub mod tags;

pub use batcher::{EntityBatcher, EntityBatches, MAX_ENTITIES_PER_LOOKUP};
pub use client::{ThreatStreamClient, UserInfo};
pub use config::{IntegrationConfig, LogLevel, RequestConfig};
pub use entity::{Entity, EntityType, SearchType};
pub use error::{ErrorObject, ErrorPayload, IntegrationError, Result};
pub use integration::Integration;
pub use lookup::{LookupData, LookupDetails, LookupResult};
pub use message::Message;
pub use observable::{IndicatorStatus, ObservableUpdate, Tlp};
pub use options::{validate_options, OptionError, Options, Severity};
pub use query::QueryBuilder;
pub use tags::{Tag, TagCache, TagDirectory};
