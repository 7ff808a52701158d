//! `propdash groups list|save`.

use anyhow::bail;
use propdash_core::GroupSelection;

use crate::cli::GroupsCommand;
use crate::context::AppContext;
use crate::render;

pub async fn cmd_groups(ctx: &AppContext, command: &GroupsCommand) -> anyhow::Result<()> {
    match command {
        GroupsCommand::List => {
            let groups = ctx.client.list_groups().await?;
            println!("{}", render::format_groups(&groups));
        }
        GroupsCommand::Save { enable } => {
            let mut selection = GroupSelection::new(ctx.client.list_groups().await?);
            let ids: Vec<&str> = enable.iter().map(String::as_str).collect();
            let unknown = selection.enable_only(&ids);
            if !unknown.is_empty() {
                bail!("unknown group id(s): {}", unknown.join(", "));
            }

            let ack = ctx
                .client
                .update_group_preferences(&selection.preferences())
                .await?;
            if !ack.success {
                bail!("saving preferences failed: {}", ack.message);
            }
            println!("monitoring {} group(s)", selection.enabled_count());
        }
    }
    Ok(())
}
