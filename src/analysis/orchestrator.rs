//! Analysis orchestrator - issues every enabled recognition call for one image.
//!
//! A run never stops at a failed category: every enabled category is
//! attempted once and its success or typed error is recorded. The only
//! failures of a run itself happen before any call is made (unknown
//! attachment, unreadable file).

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value, json};

use super::hooks::Hooks;
use super::request::AnalysisRequest;
use crate::error::{Error, Result};
use crate::recognition::{Category, Detections, ImageSource, RecognitionApi, RecognitionError, image_source};
use crate::store::{AttachmentId, MetadataStore};

/// Result of one category call.
pub type CategoryResult = std::result::Result<Detections, RecognitionError>;

/// Per-category results of one run, iterated in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOutcome {
    results: BTreeMap<Category, CategoryResult>,
}

impl AnalysisOutcome {
    pub fn insert(&mut self, category: Category, result: CategoryResult) {
        self.results.insert(category, result);
    }

    pub fn get(&self, category: Category) -> Option<&CategoryResult> {
        self.results.get(&category)
    }

    /// Results in processing order (labels, moderation, faces, celebrities, text).
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryResult)> {
        self.results.iter().map(|(c, r)| (*c, r))
    }

    pub fn categories(&self) -> Vec<Category> {
        self.results.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.results.values().filter(|r| r.is_err()).count()
    }

    /// Raw outcome as JSON, keyed by category, errors as `{"error": {code, message}}`.
    pub fn to_json(&self) -> std::result::Result<Value, serde_json::Error> {
        let mut map = Map::new();
        for (category, result) in self.iter() {
            let value = match result {
                Ok(detections) => detections.to_value()?,
                Err(e) => json!({ "error": e.to_stored() }),
            };
            map.insert(category.to_string(), value);
        }
        Ok(Value::Object(map))
    }
}

impl FromIterator<(Category, CategoryResult)> for AnalysisOutcome {
    fn from_iter<I: IntoIterator<Item = (Category, CategoryResult)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Runs the enabled recognition calls for an attachment.
///
/// # Example
///
/// ```ignore
/// let analyzer = Analyzer::new(Arc::new(client), config.analysis.clone());
/// let outcome = analyzer.analyze(&store, 42).await?;
/// for (category, result) in outcome.iter() {
///     println!("{}: {:?}", category, result.as_ref().map(|d| d.len()));
/// }
/// ```
pub struct Analyzer {
    client: Arc<dyn RecognitionApi>,
    request: AnalysisRequest,
    hooks: Arc<Hooks>,
}

impl Analyzer {
    pub fn new(client: Arc<dyn RecognitionApi>, request: AnalysisRequest) -> Self {
        Self {
            client,
            request,
            hooks: Arc::new(Hooks::default()),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn client(&self) -> &Arc<dyn RecognitionApi> {
        &self.client
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Analyze the image attached to `id`.
    ///
    /// S3-hosted images are referenced directly when both the configuration
    /// and the client region allow it; otherwise their bytes are downloaded.
    /// Local files are read from disk.
    pub async fn analyze(&self, store: &dyn MetadataStore, id: AttachmentId) -> Result<AnalysisOutcome> {
        let attachment = store
            .attachment(id)
            .await?
            .ok_or(Error::AttachmentNotFound(id))?;

        let image = image_source(self.client.as_ref(), &attachment.file, self.request.use_object_storage).await?;

        Ok(self.analyze_source(id, image).await)
    }

    /// Run every enabled category against an already resolved image.
    ///
    /// Calls are issued concurrently; the outcome order does not depend on
    /// which call finishes first.
    pub async fn analyze_source(&self, id: AttachmentId, image: ImageSource) -> AnalysisOutcome {
        let requests: Vec<_> = self
            .request
            .enabled()
            .into_iter()
            .map(|category| {
                let mut request = self.request.request_for(category, image.clone());
                if let Some(hook) = &self.hooks.pre_request {
                    hook(category, &mut request);
                }
                (category, request)
            })
            .collect();

        let calls = requests.iter().map(|(category, request)| async move {
            tracing::debug!("Attachment {}: calling {}", id, category.operation());
            (*category, self.client.detect(*category, request).await)
        });

        let mut outcome: AnalysisOutcome = join_all(calls).await.into_iter().collect();

        for (category, result) in outcome.iter() {
            if let Err(e) = result {
                tracing::warn!("Attachment {}: {} failed: {}", id, category, e);
            }
        }

        if let Some(hook) = &self.hooks.post_response {
            hook(self.client.as_ref(), id, &image, &mut outcome).await;
        }

        tracing::info!(
            "Attachment {}: analyzed {} categories ({} failed)",
            id,
            outcome.len(),
            outcome.failures()
        );

        outcome
    }
}
