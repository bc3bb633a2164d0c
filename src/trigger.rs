//! Upload and metadata-update trigger.
//!
//! Decides whether an attachment is an image worth analyzing and, if so,
//! schedules exactly one deferred analysis job for it.

use crate::error::{Error, Result};
use crate::jobs::JobQueue;
use crate::recognition::parse_object_location;
use crate::store::{AttachmentId, MetadataStore};

/// Image formats the recognition service accepts.
const SUPPORTED_MIME_TYPES: [&str; 4] = ["image/gif", "image/jpeg", "image/png", "image/bmp"];

/// Check an image by its content signature.
pub fn is_supported_image(bytes: &[u8]) -> bool {
    infer::get(bytes).is_some_and(|kind| SUPPORTED_MIME_TYPES.contains(&kind.mime_type()))
}

fn is_supported_mime_type(mime_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime_type)
}

/// Handle an attachment being uploaded or its metadata updated.
///
/// Local files are sniffed by content. S3-hosted files cannot be read
/// here, so their recorded MIME type is used instead. Returns whether a
/// new job was queued; unsupported or unreadable files are ignored.
pub async fn on_attachment_updated(
    store: &dyn MetadataStore,
    queue: &JobQueue,
    id: AttachmentId,
) -> Result<bool> {
    let attachment = store
        .attachment(id)
        .await?
        .ok_or(Error::AttachmentNotFound(id))?;

    let supported = if parse_object_location(&attachment.file).is_some() {
        attachment.mime_type.as_deref().is_some_and(is_supported_mime_type)
    } else {
        match tokio::fs::read(&attachment.file).await {
            Ok(bytes) => is_supported_image(&bytes),
            Err(e) => {
                tracing::debug!("Attachment {}: cannot read {}: {}", id, attachment.file, e);
                false
            }
        }
    };

    if !supported {
        tracing::debug!("Attachment {}: not a supported image, skipping", id);
        return Ok(false);
    }

    queue.schedule(id).await
}
