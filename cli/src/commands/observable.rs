//! Observable commands

use super::Context;
use crate::ObservableCommands;
use anyhow::{bail, Result};
use serde_json::{Map, Value};
use threatstream_intel::Message;

pub async fn handle(action: ObservableCommands, ctx: &Context) -> Result<()> {
    let message = match action {
        ObservableCommands::Get { observable_id } => Message::GetObservable { observable_id },
        ObservableCommands::Update {
            observable_id,
            status,
            confidence,
            tlp,
        } => {
            let mut fields = Map::new();
            for (key, value) in [("status", status), ("confidence", confidence), ("tlp", tlp)] {
                if let Some(value) = value {
                    fields.insert(key.to_string(), Value::String(value));
                }
            }
            if fields.is_empty() {
                bail!("nothing to update, pass --status, --confidence or --tlp");
            }
            Message::UpdateObservable {
                observable_id,
                update_fields: Value::Object(fields),
            }
        }
    };

    let result = ctx.integration.on_message(message, &ctx.options).await?;
    ctx.format.print(&result)
}
