//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while the CLI
//! uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: errors that stop a whole pipeline run (database, file I/O,
//!   unknown attachment). These are infrastructure failures.
//! - [`RecognitionError`]: per-category API failures. These never become an
//!   [`Error`] during analysis; they are recorded per category instead.
//!
//! # Example
//!
//! ```ignore
//! use image_tagger::error::{Error, Result, ResultExt};
//!
//! async fn run(pool: &SqlitePool, id: i64) -> Result<()> {
//!     let attachment = db::get_attachment(pool, id)
//!         .await
//!         .with_context("loading attachment")?;
//!     Ok(())
//! }
//! ```

use crate::recognition::RecognitionError;
use crate::store::AttachmentId;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored or outgoing JSON could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Recognition client could not be set up
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// No attachment with this id
    #[error("Attachment {0} not found")]
    AttachmentNotFound(AttachmentId),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Short machine-readable code, used in JSON error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "io-error",
            Error::Database(_) | Error::Migration(_) => "database-error",
            Error::Serialization(_) => "serialization-error",
            Error::Recognition(_) => "recognition-error",
            Error::AttachmentNotFound(_) => "not-found",
            Error::Config(_) => "config-error",
            Error::WithContext { source, .. } => source.code(),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}
