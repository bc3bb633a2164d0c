//! Caller-supplied extension points of the analysis pipeline.
//!
//! Every hook is optional. They run at fixed points:
//! - `pre_request` - once per category, before the call, with the request
//! - `post_response` - once per run, after all calls, with the client and
//!   the collected outcome
//! - `alt_text` - on the alt-text candidate, only when it will be written
//! - `keywords` - on the collected keywords, before normalisation

use futures::future::BoxFuture;

use super::orchestrator::AnalysisOutcome;
use crate::recognition::{Category, DetectRequest, ImageSource, RecognitionApi};
use crate::store::AttachmentId;

pub type PreRequestHook = Box<dyn Fn(Category, &mut DetectRequest) + Send + Sync>;

pub type PostResponseHook = Box<
    dyn for<'a> Fn(
            &'a dyn RecognitionApi,
            AttachmentId,
            &'a ImageSource,
            &'a mut AnalysisOutcome,
        ) -> BoxFuture<'a, ()>
        + Send
        + Sync,
>;

pub type AltTextHook = Box<dyn Fn(String, &AnalysisOutcome, AttachmentId) -> String + Send + Sync>;

pub type KeywordsHook =
    Box<dyn Fn(Vec<String>, &AnalysisOutcome, AttachmentId) -> Vec<String> + Send + Sync>;

/// The set of hooks for one pipeline.
///
/// # Example
///
/// ```ignore
/// let hooks = Hooks::default()
///     .with_keywords(|mut keywords, _, _| {
///         keywords.retain(|k| k != "Person");
///         keywords
///     });
/// ```
#[derive(Default)]
pub struct Hooks {
    pub pre_request: Option<PreRequestHook>,
    pub post_response: Option<PostResponseHook>,
    pub alt_text: Option<AltTextHook>,
    pub keywords: Option<KeywordsHook>,
}

impl Hooks {
    pub fn with_pre_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(Category, &mut DetectRequest) + Send + Sync + 'static,
    {
        self.pre_request = Some(Box::new(hook));
        self
    }

    /// The hook may call the client again and change the outcome before it
    /// is projected.
    pub fn with_post_response<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(
                &'a dyn RecognitionApi,
                AttachmentId,
                &'a ImageSource,
                &'a mut AnalysisOutcome,
            ) -> BoxFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        self.post_response = Some(Box::new(hook));
        self
    }

    pub fn with_alt_text<F>(mut self, hook: F) -> Self
    where
        F: Fn(String, &AnalysisOutcome, AttachmentId) -> String + Send + Sync + 'static,
    {
        self.alt_text = Some(Box::new(hook));
        self
    }

    pub fn with_keywords<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<String>, &AnalysisOutcome, AttachmentId) -> Vec<String> + Send + Sync + 'static,
    {
        self.keywords = Some(Box::new(hook));
        self
    }

    pub(crate) fn apply_alt_text(&self, candidate: String, outcome: &AnalysisOutcome, id: AttachmentId) -> String {
        match &self.alt_text {
            Some(hook) => hook(candidate, outcome, id),
            None => candidate,
        }
    }

    pub(crate) fn apply_keywords(
        &self,
        keywords: Vec<String>,
        outcome: &AnalysisOutcome,
        id: AttachmentId,
    ) -> Vec<String> {
        match &self.keywords {
            Some(hook) => hook(keywords, outcome, id),
            None => keywords,
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_request", &self.pre_request.is_some())
            .field("post_response", &self.post_response.is_some())
            .field("alt_text", &self.alt_text.is_some())
            .field("keywords", &self.keywords.is_some())
            .finish()
    }
}
