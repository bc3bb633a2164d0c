//! Attachment commands: register, show stored data, search.

use std::path::Path;

use tokio::runtime::Runtime;

use crate::analysis::{attachment_recognition, stored_errors, stored_summary};
use crate::db::{self, NewAttachment};
use crate::jobs::JobQueue;
use crate::trigger;

use super::{AppContext, Cli};

/// Register a file as an attachment and fire the upload trigger.
pub fn cmd_add(
    rt: &Runtime,
    cli: &Cli,
    file: &str,
    title: Option<&str>,
    mime_type: Option<&str>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let ctx = AppContext::open(cli).await?;

        // Record the detected type when the file is readable here
        let detected = match tokio::fs::read(file).await {
            Ok(bytes) => infer::get(&bytes).map(|kind| kind.mime_type().to_string()),
            Err(_) => None,
        };

        let title = title.map(str::to_string).unwrap_or_else(|| {
            Path::new(file)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        let id = db::insert_attachment(
            &ctx.pool,
            &NewAttachment {
                file: file.to_string(),
                mime_type: mime_type.map(str::to_string).or(detected),
                title,
                ..Default::default()
            },
        )
        .await?;
        println!("Added attachment {}", id);

        let queue = JobQueue::new(ctx.pool.clone());
        if trigger::on_attachment_updated(ctx.store.as_ref(), &queue, id).await? {
            println!("Analysis queued. Run `image-tagger worker` to process it.");
        } else {
            println!("Not a supported image, no analysis queued.");
        }
        Ok::<_, anyhow::Error>(())
    })
}

/// Show stored recognition data for one attachment.
pub fn cmd_show(rt: &Runtime, cli: &Cli, id: i64, json: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let ctx = AppContext::open(cli).await?;
        let store = ctx.store.as_ref();

        let Some(recognition) = attachment_recognition(store, id).await? else {
            println!("Attachment {} is not an image.", id);
            return Ok(());
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&recognition)?);
            return Ok(());
        }

        let errors = stored_errors(store, id).await?;

        if recognition.is_empty() {
            let queue = JobQueue::new(ctx.pool.clone());
            if queue.is_pending(id).await? {
                println!("Recognition data: processing");
            } else {
                println!("Recognition data: unavailable");
            }
        } else {
            let (keywords, alt_text) = stored_summary(store, id).await?;

            let labels: Vec<String> = recognition
                .labels
                .iter()
                .map(|l| format!("{} ({:.1}%)", l.name, l.confidence))
                .collect();
            println!("Labels:      {}", labels.join(", "));
            if !recognition.celebrities.is_empty() {
                let names: Vec<&str> = recognition.celebrities.iter().map(|c| c.name.as_str()).collect();
                println!("Celebrities: {}", names.join(", "));
            }
            if !recognition.moderation.is_empty() {
                let names: Vec<&str> = recognition.moderation.iter().map(|m| m.name.as_str()).collect();
                println!("Moderation:  {}", names.join(", "));
            }
            if !recognition.faces.is_empty() {
                println!("Faces:       {}", recognition.faces.len());
            }
            if !recognition.text.is_empty() {
                let lines: Vec<&str> = recognition
                    .text
                    .iter()
                    .filter(|t| t.kind == "LINE")
                    .map(|t| t.detected_text.as_str())
                    .collect();
                println!("Text:        {}", lines.join(" / "));
            }
            println!("Alt text:    {}", alt_text.unwrap_or_default());
            println!("Keywords:    {}", keywords.join(", "));
        }

        for (category, error) in errors {
            println!("✗ {}: {} ({})", category, error.message, error.code);
        }
        Ok::<_, anyhow::Error>(())
    })
}

/// Search attachments, including recognition keywords.
pub fn cmd_search(rt: &Runtime, cli: &Cli, query: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let ctx = AppContext::open(cli).await?;

        let results = db::search_attachments(&ctx.pool, query).await?;
        if results.is_empty() {
            println!("No attachments found.");
            return Ok(());
        }

        for attachment in &results {
            println!("{:>6}  {}  {}", attachment.id, attachment.title, attachment.file);
        }
        println!("\n{} attachments found.", results.len());
        Ok::<_, anyhow::Error>(())
    })
}
