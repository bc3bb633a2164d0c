//! Recognition commands: raw dump, batch keyword update, manual re-run.

use tokio::runtime::Runtime;

use super::{AppContext, Cli};

/// Print the raw per-category results for one attachment. Nothing is stored.
pub fn cmd_list_data(rt: &Runtime, cli: &Cli, id: i64) -> anyhow::Result<()> {
    rt.block_on(async {
        let ctx = AppContext::open(cli).await?;
        let pipeline = ctx.pipeline()?;

        let outcome = pipeline.fetch_data(id).await?;
        println!("{}", serde_json::to_string_pretty(&outcome.to_json()?)?);
        Ok::<_, anyhow::Error>(())
    })
}

/// Re-analyze the given attachments, or every image attachment.
pub fn cmd_update_keywords(rt: &Runtime, cli: &Cli, ids: Option<Vec<i64>>) -> anyhow::Result<()> {
    rt.block_on(async {
        let ctx = AppContext::open(cli).await?;
        let pipeline = ctx.pipeline()?;

        match &ids {
            Some(ids) => println!("Updating {} attachments...", ids.len()),
            None => println!("Updating all image attachments..."),
        }

        let report = pipeline.update_keywords(ids).await?;

        for id in &report.updated {
            println!("✓ Updated attachment {}", id);
        }
        for (id, error) in &report.failed {
            eprintln!("✗ Attachment {}: {}", id, error);
        }
        println!(
            "\nCompleted: {} updated, {} failed",
            report.updated.len(),
            report.failed.len()
        );
        Ok::<_, anyhow::Error>(())
    })
}

/// Re-analyze one attachment and print the refreshed labels response.
pub fn cmd_reprocess(rt: &Runtime, cli: &Cli, id: i64) -> anyhow::Result<()> {
    rt.block_on(async {
        let ctx = AppContext::open(cli).await?;
        let pipeline = ctx.pipeline()?;

        let response = pipeline.reprocess(id).await;
        println!("{}", serde_json::to_string_pretty(&response)?);

        if !response.success {
            return Err(anyhow::anyhow!("Reprocessing attachment {} failed", id));
        }
        Ok::<_, anyhow::Error>(())
    })
}
