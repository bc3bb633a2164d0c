//! Persistence gateway for attachment metadata and taxonomy terms.
//!
//! The analysis pipeline never talks to the database directly; it only
//! calls [`MetadataStore`]. [`SqliteStore`] is the bundled implementation.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::{self, Attachment};
use crate::error::Result;
use crate::recognition::Category;

/// Database ID of an attachment.
pub type AttachmentId = i64;

/// Prefix shared by every metadata key this crate writes.
const KEY_PREFIX: &str = "recognition";

/// Combined tab-separated keyword string.
pub const KEYWORDS_KEY: &str = "recognition_keywords";

/// Alt text of an image attachment.
pub const ALT_TEXT_KEY: &str = "image_alt";

/// Taxonomy holding label and celebrity terms.
pub const LABELS_TAXONOMY: &str = "recognition_labels";

/// Key of the stored detections for `category`.
pub fn result_key(category: Category) -> String {
    format!("{}_{}", KEY_PREFIX, category.as_str())
}

/// Key of the stored failure for `category`.
pub fn error_key(category: Category) -> String {
    format!("{}_error_{}", KEY_PREFIX, category.as_str())
}

/// Read/write operations the pipeline needs from the host.
///
/// Writes are per-key last-writer-wins. Implementations must make
/// `add_object_terms` append-only: existing terms stay assigned.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn attachment(&self, id: AttachmentId) -> Result<Option<Attachment>>;

    async fn image_attachment_ids(&self) -> Result<Vec<AttachmentId>>;

    async fn get_meta(&self, id: AttachmentId, key: &str) -> Result<Option<String>>;

    async fn set_meta(&self, id: AttachmentId, key: &str, value: &str) -> Result<()>;

    async fn delete_meta(&self, id: AttachmentId, key: &str) -> Result<()>;

    async fn add_object_terms(&self, id: AttachmentId, taxonomy: &str, terms: &[String]) -> Result<()>;

    async fn object_terms(&self, id: AttachmentId, taxonomy: &str) -> Result<Vec<String>>;

    /// Set the caption.
    async fn set_excerpt(&self, id: AttachmentId, excerpt: &str) -> Result<()>;
}

/// [`MetadataStore`] backed by the SQLite schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn attachment(&self, id: AttachmentId) -> Result<Option<Attachment>> {
        Ok(db::get_attachment(&self.pool, id).await?)
    }

    async fn image_attachment_ids(&self) -> Result<Vec<AttachmentId>> {
        Ok(db::image_attachment_ids(&self.pool).await?)
    }

    async fn get_meta(&self, id: AttachmentId, key: &str) -> Result<Option<String>> {
        Ok(db::get_meta(&self.pool, id, key).await?)
    }

    async fn set_meta(&self, id: AttachmentId, key: &str, value: &str) -> Result<()> {
        Ok(db::set_meta(&self.pool, id, key, value).await?)
    }

    async fn delete_meta(&self, id: AttachmentId, key: &str) -> Result<()> {
        Ok(db::delete_meta(&self.pool, id, key).await?)
    }

    async fn add_object_terms(&self, id: AttachmentId, taxonomy: &str, terms: &[String]) -> Result<()> {
        Ok(db::add_object_terms(&self.pool, id, taxonomy, terms).await?)
    }

    async fn object_terms(&self, id: AttachmentId, taxonomy: &str) -> Result<Vec<String>> {
        Ok(db::get_object_terms(&self.pool, id, taxonomy).await?)
    }

    async fn set_excerpt(&self, id: AttachmentId, excerpt: &str) -> Result<()> {
        Ok(db::set_excerpt(&self.pool, id, excerpt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{insert_image, temp_db};

    #[test]
    fn test_keys() {
        assert_eq!(result_key(Category::Labels), "recognition_labels");
        assert_eq!(error_key(Category::Celebrities), "recognition_error_celebrities");
        assert_ne!(result_key(Category::Text), error_key(Category::Text));
    }

    #[tokio::test]
    async fn test_sqlite_store_meta_and_terms() {
        let (pool, _dir) = temp_db().await;
        let id = insert_image(&pool, "/uploads/a.jpg").await;
        let store = SqliteStore::new(pool);

        store.set_meta(id, KEYWORDS_KEY, "cat\tdog").await.unwrap();
        assert_eq!(
            store.get_meta(id, KEYWORDS_KEY).await.unwrap().as_deref(),
            Some("cat\tdog")
        );

        store
            .add_object_terms(id, LABELS_TAXONOMY, &["Cat".to_string()])
            .await
            .unwrap();
        assert_eq!(store.object_terms(id, LABELS_TAXONOMY).await.unwrap(), vec!["Cat"]);

        assert_eq!(store.image_attachment_ids().await.unwrap(), vec![id]);
        assert!(store.attachment(id + 1).await.unwrap().is_none());
    }
}
