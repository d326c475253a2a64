//! Entity batcher
//!
//! Splits the entities of a lookup into bounded query batches. Each batch
//! becomes one ThreatStream search request.

use crate::entity::{Entity, EntityType, SearchType};
use crate::options::Options;
use std::collections::HashMap;
use tracing::trace;

/// Largest number of values OR-ed into one search query
pub const MAX_ENTITIES_PER_LOOKUP: usize = 10;

/// Addresses never worth a lookup when private IPs are ignored
pub const IGNORED_IPS: [&str; 3] = ["127.0.0.1", "255.255.255.255", "0.0.0.0"];

/// Batches of a single lookup
#[derive(Debug, Clone, Default)]
pub struct EntityBatches {
    /// Non-empty groups, none larger than the batcher's limit
    pub groups: Vec<Vec<Entity>>,
    /// Search types present across all groups, in first-seen order
    pub types: Vec<SearchType>,
    /// Submitted entities keyed by lowercased value
    pub lookup: HashMap<String, Entity>,
}

impl EntityBatches {
    pub fn entity_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Entity submitted for `value`, matched case-insensitively
    pub fn entity_for(&self, value: &str) -> Option<&Entity> {
        self.lookup.get(&value.to_lowercase())
    }
}

/// Partitions entities into query batches
#[derive(Debug, Clone)]
pub struct EntityBatcher {
    max_batch_size: usize,
}

impl Default for EntityBatcher {
    fn default() -> Self {
        Self::new(MAX_ENTITIES_PER_LOOKUP)
    }
}

impl EntityBatcher {
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Batch `entities`, `None` when every entity was filtered out
    pub fn batch(&self, entities: &[Entity], options: &Options) -> Option<EntityBatches> {
        let mut batches = EntityBatches::default();
        let mut group = Vec::with_capacity(self.max_batch_size);

        for entity in entities {
            if should_ignore(entity, options) {
                trace!(value = %entity.value, "Ignoring private or reserved address");
                continue;
            }

            let Some(search_type) = entity.entity_type.search_type() else {
                trace!(value = %entity.value, entity_type = %entity.entity_type, "Unsupported entity type");
                continue;
            };

            if !batches.types.contains(&search_type) {
                batches.types.push(search_type);
            }

            batches
                .lookup
                .insert(entity.value.to_lowercase(), entity.clone());
            group.push(entity.clone());

            if group.len() >= self.max_batch_size {
                batches.groups.push(std::mem::take(&mut group));
            }
        }

        // trailing partial group
        if !group.is_empty() {
            batches.groups.push(group);
        }

        trace!(groups = batches.groups.len(), "Entity groups");

        if batches.groups.is_empty() {
            None
        } else {
            Some(batches)
        }
    }
}

fn should_ignore(entity: &Entity, options: &Options) -> bool {
    options.ignore_private_ips
        && ((entity.entity_type == EntityType::IPv4 && entity.is_private_ip)
            || IGNORED_IPS.contains(&entity.value.as_str()))
}
