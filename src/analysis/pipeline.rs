//! Analyze-and-persist pipeline, plus readers for stored results.
//!
//! This is the high-level API used by the job worker and the CLI:
//! 1. Analyze the attachment's image ([`Analyzer`])
//! 2. Load the values the projection depends on ([`ExistingState`])
//! 3. Project the outcome ([`Projector`])
//! 4. Apply the writes to the store

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::keywords;
use super::orchestrator::{AnalysisOutcome, Analyzer};
use super::projector::{ExistingState, Projection, Projector};
use crate::error::{Error, Result};
use crate::recognition::{
    Category, Celebrity, Detections, FaceDetail, Label, ModerationLabel, StoredError, TextDetection,
};
use crate::store::{self, AttachmentId, MetadataStore, ALT_TEXT_KEY, KEYWORDS_KEY};

/// Analyzer bound to a store.
pub struct Pipeline {
    analyzer: Analyzer,
    store: Arc<dyn MetadataStore>,
}

impl Pipeline {
    pub fn new(analyzer: Analyzer, store: Arc<dyn MetadataStore>) -> Self {
        Self { analyzer, store }
    }

    pub fn store(&self) -> &dyn MetadataStore {
        self.store.as_ref()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Run the analysis without persisting anything.
    pub async fn fetch_data(&self, id: AttachmentId) -> Result<AnalysisOutcome> {
        self.analyzer.analyze(self.store.as_ref(), id).await
    }

    /// Analyze an attachment and persist the derived metadata.
    ///
    /// Succeeds when every enabled category was attempted, whatever the
    /// individual outcomes.
    pub async fn update_attachment_data(&self, id: AttachmentId) -> Result<Projection> {
        let outcome = self.fetch_data(id).await?;
        let existing = ExistingState::load(self.store.as_ref(), id).await?;

        let projection = Projector::new(self.analyzer.hooks()).project(id, &outcome, &existing)?;
        projection.apply(self.store.as_ref(), id).await?;

        tracing::info!(
            "Attachment {}: stored {} keywords, {} terms",
            id,
            projection.derived.keywords.len(),
            projection.derived.terms.len()
        );
        Ok(projection)
    }

    /// Re-run the pipeline for `ids`, or for every image attachment.
    ///
    /// A failing attachment is logged and counted; the batch continues.
    pub async fn update_keywords(&self, ids: Option<Vec<AttachmentId>>) -> Result<BatchReport> {
        let ids = match ids {
            Some(ids) => ids,
            None => self.store.image_attachment_ids().await?,
        };

        let mut report = BatchReport::default();
        for id in ids {
            match self.update_attachment_data(id).await {
                Ok(_) => report.updated.push(id),
                Err(e) => {
                    tracing::warn!("Attachment {}: update failed: {}", id, e);
                    report.failed.push((id, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Manual re-run: update synchronously and return the refreshed labels.
    ///
    /// The response is a failure when the run could not happen or the
    /// labels call itself failed.
    pub async fn reprocess(&self, id: AttachmentId) -> ReprocessResponse {
        let projection = match self.update_attachment_data(id).await {
            Ok(projection) => projection,
            Err(e) => return ReprocessResponse::failure(e.code(), e.to_string()),
        };

        if let Some(error) = stored_error(&projection, Category::Labels) {
            return ReprocessResponse {
                success: false,
                data: ReprocessData::Error(error),
            };
        }

        match stored_detections(self.store.as_ref(), id, Category::Labels).await {
            Ok(Some(Detections::Labels(labels))) => ReprocessResponse::labels(&labels),
            Ok(_) => ReprocessResponse::labels(&[]),
            Err(e) => ReprocessResponse::failure(e.code(), e.to_string()),
        }
    }
}

/// Result of [`Pipeline::update_keywords`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub updated: Vec<AttachmentId>,
    pub failed: Vec<(AttachmentId, String)>,
}

/// One label in a re-run response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub name: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReprocessData {
    Labels(Vec<LabelSummary>),
    Error(StoredError),
}

/// `{"success": true, "data": [{name, confidence}]}` or
/// `{"success": false, "data": {code, message}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprocessResponse {
    pub success: bool,
    pub data: ReprocessData,
}

impl ReprocessResponse {
    pub fn labels(labels: &[Label]) -> Self {
        Self {
            success: true,
            data: ReprocessData::Labels(
                labels
                    .iter()
                    .map(|l| LabelSummary {
                        name: l.name.clone(),
                        confidence: l.confidence,
                    })
                    .collect(),
            ),
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: ReprocessData::Error(StoredError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

fn stored_error(projection: &Projection, category: Category) -> Option<StoredError> {
    projection
        .meta(&store::error_key(category))
        .and_then(|value| serde_json::from_str(value).ok())
}

/// Stored detections of one category, if the category ever succeeded.
pub async fn stored_detections(
    store: &dyn MetadataStore,
    id: AttachmentId,
    category: Category,
) -> Result<Option<Detections>> {
    match store.get_meta(id, &store::result_key(category)).await? {
        Some(payload) => Ok(Some(Detections::from_payload(category, &payload)?)),
        None => Ok(None),
    }
}

/// Stored failures, in processing order.
pub async fn stored_errors(store: &dyn MetadataStore, id: AttachmentId) -> Result<Vec<(Category, StoredError)>> {
    let mut errors = Vec::new();
    for category in Category::ALL {
        if let Some(value) = store.get_meta(id, &store::error_key(category)).await? {
            errors.push((category, serde_json::from_str(&value)?));
        }
    }
    Ok(errors)
}

/// Every stored category payload of one image attachment.
///
/// Categories without stored results are empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecognition {
    pub labels: Vec<Label>,
    pub moderation: Vec<ModerationLabel>,
    pub faces: Vec<FaceDetail>,
    pub celebrities: Vec<Celebrity>,
    pub text: Vec<TextDetection>,
}

impl AttachmentRecognition {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
            && self.moderation.is_empty()
            && self.faces.is_empty()
            && self.celebrities.is_empty()
            && self.text.is_empty()
    }
}

/// Stored recognition data for an attachment; `None` when it is not an image.
pub async fn attachment_recognition(
    store: &dyn MetadataStore,
    id: AttachmentId,
) -> Result<Option<AttachmentRecognition>> {
    let attachment = store
        .attachment(id)
        .await?
        .ok_or(Error::AttachmentNotFound(id))?;

    let is_image = attachment
        .mime_type
        .as_deref()
        .is_some_and(|m| m.starts_with("image/"));
    if !is_image {
        return Ok(None);
    }

    let mut recognition = AttachmentRecognition::default();
    for category in Category::ALL {
        match stored_detections(store, id, category).await? {
            Some(Detections::Labels(v)) => recognition.labels = v,
            Some(Detections::Moderation(v)) => recognition.moderation = v,
            Some(Detections::Faces(v)) => recognition.faces = v,
            Some(Detections::Celebrities(v)) => recognition.celebrities = v,
            Some(Detections::Text(v)) => recognition.text = v,
            None => {}
        }
    }
    Ok(Some(recognition))
}

/// Stored keywords and alt text of an attachment.
pub async fn stored_summary(store: &dyn MetadataStore, id: AttachmentId) -> Result<(Vec<String>, Option<String>)> {
    let keywords = store
        .get_meta(id, KEYWORDS_KEY)
        .await?
        .map(|k| keywords::split(&k))
        .unwrap_or_default();
    let alt_text = store.get_meta(id, ALT_TEXT_KEY).await?;
    Ok((keywords, alt_text))
}
