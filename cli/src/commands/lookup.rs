//! Lookup command

use super::Context;
use crate::output::{LookupRow, OutputFormat};
use anyhow::{bail, Result};
use threatstream_intel::Entity;
use tracing::warn;

pub async fn handle(values: Vec<String>, details: bool, ctx: &Context) -> Result<()> {
    let config = ctx.integration.config();
    let mut entities = Vec::with_capacity(values.len());

    for value in &values {
        match Entity::from_value(value) {
            Some(entity) if config.supports(&entity.entity_type) => entities.push(entity),
            Some(entity) => warn!(value = %value, entity_type = %entity.entity_type, "Entity type not enabled, skipping"),
            None => warn!(value = %value, "Unrecognized entity, skipping"),
        }
    }

    if entities.is_empty() {
        bail!("nothing to look up");
    }

    let mut results = ctx.integration.do_lookup(&entities, &ctx.options).await?;

    if details {
        for result in results.iter_mut() {
            result.data = ctx.integration.on_details(result.clone(), &ctx.options).await?;
        }
    }

    if results.is_empty() && ctx.format == OutputFormat::Table {
        println!("No indicators found");
        return Ok(());
    }

    let rows: Vec<LookupRow> = results.iter().map(LookupRow::from).collect();
    ctx.format.print_rows(&results, rows)
}
