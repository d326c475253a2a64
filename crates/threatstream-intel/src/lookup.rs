//! Lookup results
//!
//! ThreatStream can return several records for one observed value (one per
//! source feed). Records are grouped by value and paired with the entity the
//! host submitted.

use crate::batcher::EntityBatches;
use crate::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// One result per observed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub entity: Entity,
    pub data: LookupData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupData {
    pub summary: Vec<String>,
    pub details: LookupDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupDetails {
    /// Raw ThreatStream records for this value
    pub intelligence: Vec<Value>,
    /// Filled in on demand by `on_details`
    pub comments: Value,
}

/// Records sharing one observed value
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorGroup {
    pub value: String,
    pub records: Vec<Value>,
}

/// Group records by their `value`, keeping first-seen order
pub fn group_indicators(records: Vec<Value>) -> Vec<IndicatorGroup> {
    let mut groups: Vec<IndicatorGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(value) = record.get("value").and_then(Value::as_str).map(String::from) else {
            warn!(?record, "Indicator record without a value");
            continue;
        };

        match index.get(&value) {
            Some(&i) => groups[i].records.push(record),
            None => {
                index.insert(value.clone(), groups.len());
                groups.push(IndicatorGroup {
                    value,
                    records: vec![record],
                });
            }
        }
    }

    groups
}

/// Pair indicator groups with the submitted entities
pub fn build_results(groups: Vec<IndicatorGroup>, batches: &EntityBatches) -> Vec<LookupResult> {
    groups
        .into_iter()
        .filter_map(|group| {
            let Some(entity) = batches.entity_for(&group.value) else {
                warn!(value = %group.value, "Indicator group matches no submitted entity");
                return None;
            };

            Some(LookupResult {
                entity: entity.clone(),
                data: LookupData {
                    summary: Vec::new(),
                    details: LookupDetails {
                        intelligence: group.records,
                        comments: Value::Array(Vec::new()),
                    },
                },
            })
        })
        .collect()
}
