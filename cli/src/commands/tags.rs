//! Tag commands

use super::Context;
use crate::output::TagRow;
use crate::TagCommands;
use anyhow::Result;
use threatstream_intel::{Message, Tag};

pub async fn handle(action: TagCommands, ctx: &Context) -> Result<()> {
    match action {
        TagCommands::Search { term, exclude } => {
            let result = ctx
                .integration
                .on_message(Message::SearchTags { term, exclude }, &ctx.options)
                .await?;
            let tags: Vec<Tag> = serde_json::from_value(result["tags"].clone())?;
            print_tags(&tags, ctx)?;
        }
        TagCommands::Add { observable_id, tag, tlp } => {
            let message = Message::AddTag {
                tag: tag.clone(),
                observable_id: observable_id.clone(),
                tlp,
            };
            let result = ctx.integration.on_message(message, &ctx.options).await?;
            println!("Tagged observable {} with `{}`", observable_id, tag);
            ctx.format.print(&result)?;
        }
        TagCommands::Delete { observable_id, tag_id } => {
            let message = Message::DeleteTag {
                observable_id: observable_id.clone(),
                tag_id: tag_id.clone(),
            };
            ctx.integration.on_message(message, &ctx.options).await?;
            println!("Tag {} removed from observable {}", tag_id, observable_id);
        }
        TagCommands::Preferred => {
            let cache = ctx.integration.tag_cache();
            cache.refresh(&ctx.integration.client(&ctx.options)).await?;
            print_tags(&cache.preferred().await, ctx)?;
        }
    }
    Ok(())
}

fn print_tags(tags: &[Tag], ctx: &Context) -> Result<()> {
    let rows: Vec<TagRow> = tags.iter().map(TagRow::from).collect();
    ctx.format.print_rows(&tags, rows)
}
