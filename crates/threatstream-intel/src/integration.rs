//! Integration context
//!
//! [`Integration`] is what the host starts once and calls for every lookup,
//! details expansion and analyst action. It owns the static configuration,
//! the shared HTTP transport and the preferred tag cache.

use crate::batcher::EntityBatcher;
use crate::client::ThreatStreamClient;
use crate::config::IntegrationConfig;
use crate::entity::Entity;
use crate::error::{ErrorPayload, Result};
use crate::lookup::{build_results, group_indicators, LookupData, LookupResult};
use crate::message::Message;
use crate::observable::{ObservableUpdate, Tlp};
use crate::options::{validate_options, OptionError, Options};
use crate::query::QueryBuilder;
use crate::tags::TagCache;
use futures_util::future::try_join_all;
use serde_json::{json, Value};
use tracing::{debug, error, info};

pub struct Integration {
    config: IntegrationConfig,
    http: reqwest::Client,
    tags: TagCache,
    batcher: EntityBatcher,
}

impl Integration {
    /// Start the integration, building the HTTP transport from `config`
    pub fn new(config: IntegrationConfig) -> Result<Self> {
        let http = config.build_http_client()?;
        info!(name = %config.name, "Integration started");
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: IntegrationConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            tags: TagCache::new(),
            batcher: EntityBatcher::default(),
        }
    }

    pub fn with_batcher(mut self, batcher: EntityBatcher) -> Self {
        self.batcher = batcher;
        self
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    pub fn tag_cache(&self) -> &TagCache {
        &self.tags
    }

    /// API client bound to one call's options
    pub fn client<'a>(&'a self, options: &'a Options) -> ThreatStreamClient<'a> {
        ThreatStreamClient::new(&self.http, options)
    }

    /// Look up a batch of entities
    ///
    /// Every query batch is sent at once; the first failing batch fails the
    /// whole lookup.
    pub async fn do_lookup(&self, entities: &[Entity], options: &Options) -> Result<Vec<LookupResult>> {
        let client = self.client(options);

        self.tags.ensure_initialized(&client).await.map_err(|e| {
            error!(error = %e, "Error fetching preferred tags");
            e
        })?;

        let Some(batches) = self.batcher.batch(entities, options) else {
            debug!(entities = entities.len(), "Nothing to look up");
            return Ok(Vec::new());
        };

        debug!(
            groups = batches.groups.len(),
            entities = batches.entity_count(),
            "Looking up entity groups"
        );

        let queries = QueryBuilder::new(options);
        let lookups = batches
            .groups
            .iter()
            .map(|group| {
                let query = queries.build(group, &batches.types);
                async move { client.lookup(&query).await }
            });

        let records: Vec<Value> = try_join_all(lookups)
            .await
            .map_err(|e| {
                error!(error = %e, "Error looking up entities");
                e
            })?
            .into_iter()
            .flatten()
            .collect();

        let results = build_results(group_indicators(records), &batches);
        debug!(results = results.len(), "Lookup results");
        Ok(results)
    }

    /// Fill in the comments of a result when the analyst opens its details
    pub async fn on_details(&self, mut result: LookupResult, options: &Options) -> Result<LookupData> {
        let value = result.entity.value.to_lowercase();
        result.data.details.comments = self.client(options).get_comments(&value).await?;
        Ok(result.data)
    }

    /// Dispatch an analyst action
    pub async fn on_message(&self, message: Message, options: &Options) -> Result<Value> {
        debug!(action = message.action(), "On message");
        let client = self.client(options);

        match message {
            Message::SearchTags { term, exclude } => {
                let tags = self.tags.search(&client, &term, &exclude).await?;
                debug!(count = tags.len(), "SEARCH_TAGS result");
                Ok(json!({ "tags": tags }))
            }
            Message::AddTag { tag, observable_id, tlp } => {
                let tlp = Tlp::parse_tag_visibility(&tlp)?;
                let user = client.get_user_info().await?;
                client.add_tag(&observable_id, &tag, user, tlp).await
            }
            Message::DeleteTag { observable_id, tag_id } => client.delete_tag(&observable_id, &tag_id).await,
            Message::GetObservable { observable_id } => client.get_observable(&observable_id).await,
            Message::UpdateObservable { observable_id, update_fields } => {
                let update = ObservableUpdate::from_fields(&update_fields)?;
                client.update_observable(&observable_id, &update).await
            }
            Message::CreateComment { value, comment, tlp } => {
                let tlp: Tlp = tlp.parse()?;
                client.create_comment(&value, &comment, tlp).await
            }
        }
    }

    /// Host boundary: raw JSON in, JSON result or error document out
    pub async fn handle_message(&self, payload: &Value, options: &Options) -> std::result::Result<Value, ErrorPayload> {
        let message = Message::from_json(payload)?;
        Ok(self.on_message(message, options).await?)
    }

    /// Validate host-shaped user options
    pub fn validate_options(&self, raw: &Value) -> Vec<OptionError> {
        validate_options(raw)
    }
}
