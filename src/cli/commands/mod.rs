//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `analyze`: running recognition (raw dump, batch update, manual re-run)
//! - `attachments`: registering, inspecting and searching attachments
//! - `worker`: draining the deferred job queue

mod analyze;
mod attachments;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tokio::runtime::Runtime;

use crate::analysis::{Analyzer, Pipeline};
use crate::config::{self, Config};
use crate::db;
use crate::recognition::{ClientSettings, RekognitionClient};
use crate::store::SqliteStore;

pub use analyze::{cmd_list_data, cmd_reprocess, cmd_update_keywords};
pub use attachments::{cmd_add, cmd_search, cmd_show};
pub use worker::cmd_worker;

/// Image Tagger CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database path (default: from config, else image_tagger.db)
    #[arg(long, global = true, env = "IMAGE_TAGGER_DB")]
    pub db: Option<PathBuf>,

    /// Config file (default: OS config dir)
    #[arg(long, global = true, env = "IMAGE_TAGGER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the raw recognition results for an attachment without storing them
    ListDataForAttachment {
        /// Attachment ID
        id: i64,
    },
    /// Re-analyze attachments and refresh their stored keywords
    UpdateKeywords {
        /// Comma-separated attachment IDs (default: every image attachment)
        #[arg(long, value_delimiter = ',')]
        attachments: Option<Vec<i64>>,
    },
    /// Register a file as an attachment and queue its analysis
    Add {
        /// Local path or s3://bucket/key location
        file: String,
        /// Attachment title (default: file name)
        #[arg(long)]
        title: Option<String>,
        /// MIME type, for files that cannot be read locally
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Run queued analysis jobs
    Worker {
        /// Exit once the queue is empty
        #[arg(long)]
        once: bool,
        /// Seconds between polls of an empty queue
        #[arg(long, default_value = "3")]
        poll_secs: u64,
    },
    /// Re-analyze one attachment now and print the refreshed labels as JSON
    Reprocess {
        /// Attachment ID
        id: i64,
    },
    /// Show stored recognition data for an attachment
    Show {
        /// Attachment ID
        id: i64,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search attachments by title, caption, description and keywords
    Search {
        /// Search terms; prefix a term with - to exclude it
        #[arg(required = true, num_args = 1..)]
        terms: Vec<String>,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::ListDataForAttachment { id } => cmd_list_data(&rt, cli, *id),
        Commands::UpdateKeywords { attachments } => cmd_update_keywords(&rt, cli, attachments.clone()),
        Commands::Add { file, title, mime_type } => {
            cmd_add(&rt, cli, file, title.as_deref(), mime_type.as_deref())
        }
        Commands::Worker { once, poll_secs } => cmd_worker(&rt, cli, *once, *poll_secs),
        Commands::Reprocess { id } => cmd_reprocess(&rt, cli, *id),
        Commands::Show { id, json } => cmd_show(&rt, cli, *id, *json),
        Commands::Search { terms } => cmd_search(&rt, cli, &terms.join(" ")),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Loaded configuration plus an open database.
pub(crate) struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub store: Arc<SqliteStore>,
}

impl AppContext {
    /// Load config and open the database. CLI flags override the config file.
    pub async fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => config::load_from(path),
            None => config::load(),
        };

        let db_path = cli.db.clone().or_else(|| config.database.path.clone());
        let db_url = db::db_url(db_path.as_deref());
        let pool = db::init_db(&db_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", db_url, e))?;

        Ok(Self {
            config,
            store: Arc::new(SqliteStore::new(pool.clone())),
            pool,
        })
    }

    /// Build the recognition client and the pipeline around it.
    pub fn pipeline(&self) -> anyhow::Result<Pipeline> {
        let settings = ClientSettings::resolve(&self.config.aws);
        tracing::debug!("Using recognition region {}", settings.region);

        let client = RekognitionClient::new(settings)?;
        let analyzer = Analyzer::new(Arc::new(client), self.config.analysis.clone());
        Ok(Pipeline::new(analyzer, self.store.clone()))
    }
}
