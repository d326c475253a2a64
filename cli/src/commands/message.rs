//! Raw host messages

use super::Context;
use anyhow::{bail, Context as _, Result};
use serde_json::Value;

pub async fn handle(payload: &str, ctx: &Context) -> Result<()> {
    let payload: Value = serde_json::from_str(payload).context("message is not valid JSON")?;

    match ctx.integration.handle_message(&payload, &ctx.options).await {
        Ok(result) => ctx.format.print(&result),
        Err(errors) => {
            ctx.format.print(&errors)?;
            bail!("{} failed", payload["action"].as_str().unwrap_or("message"));
        }
    }
}
