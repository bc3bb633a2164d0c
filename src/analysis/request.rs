//! Which categories to request, and with which parameters.

use serde::{Deserialize, Serialize};

use crate::recognition::{Category, DetectRequest, ImageSource};

/// Configuration of one analysis run.
///
/// Lives under `[analysis]` in the config file. Every category has its own
/// toggle; only labels are enabled by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    pub labels: bool,
    pub moderation: bool,
    pub faces: bool,
    pub celebrities: bool,
    pub text: bool,

    /// Minimum confidence (0-100) for labels and moderation labels
    pub min_confidence: f32,

    /// Maximum number of labels returned
    pub max_labels: u32,

    /// Facial attributes to request (`DEFAULT` or `ALL`)
    pub face_attributes: Vec<String>,

    /// Reference S3-hosted images directly instead of sending their bytes,
    /// when the region supports it
    pub use_object_storage: bool,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            labels: true,
            moderation: false,
            faces: false,
            celebrities: false,
            text: false,
            min_confidence: 60.0,
            max_labels: 50,
            face_attributes: vec!["ALL".to_string()],
            use_object_storage: true,
        }
    }
}

impl AnalysisRequest {
    /// Request every category, with default parameters.
    pub fn all() -> Self {
        Self {
            moderation: true,
            faces: true,
            celebrities: true,
            text: true,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Labels => self.labels,
            Category::Moderation => self.moderation,
            Category::Faces => self.faces,
            Category::Celebrities => self.celebrities,
            Category::Text => self.text,
        }
    }

    /// Enabled categories in processing order.
    pub fn enabled(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    /// The call for one category against the shared image.
    ///
    /// Parameters a category does not use are left unset.
    pub fn request_for(&self, category: Category, image: ImageSource) -> DetectRequest {
        let mut request = DetectRequest::new(image);
        match category {
            Category::Labels => {
                request.min_confidence = Some(self.min_confidence);
                request.max_labels = Some(self.max_labels);
            }
            Category::Moderation => {
                request.min_confidence = Some(self.min_confidence);
            }
            Category::Faces => {
                request.attributes = self.face_attributes.clone();
            }
            Category::Celebrities | Category::Text => {}
        }
        request
    }
}
