//! Comment commands

use super::Context;
use crate::CommentCommands;
use anyhow::Result;
use threatstream_intel::Message;

pub async fn handle(action: CommentCommands, ctx: &Context) -> Result<()> {
    match action {
        CommentCommands::List { value } => {
            let comments = ctx
                .integration
                .client(&ctx.options)
                .get_comments(&value.to_lowercase())
                .await?;
            ctx.format.print(&comments)?;
        }
        CommentCommands::Add { value, comment, tlp } => {
            let message = Message::CreateComment {
                value: value.clone(),
                comment,
                tlp,
            };
            let result = ctx.integration.on_message(message, &ctx.options).await?;
            println!("Comment added to {}", value);
            ctx.format.print(&result)?;
        }
    }
    Ok(())
}
