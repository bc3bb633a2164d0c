//! Internal domain models for image recognition results.
//!
//! These types are OUR types - they don't change when the recognition API
//! changes. All wire responses get converted into these types via the
//! adapter, and these are also the shapes persisted as attachment metadata.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One type of recognition analysis.
///
/// The declaration order is the processing order used everywhere: results
/// are collected, logged and merged as labels, moderation, faces,
/// celebrities, text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Labels,
    Moderation,
    Faces,
    Celebrities,
    Text,
}

impl Category {
    /// All categories in processing order.
    pub const ALL: [Category; 5] = [
        Category::Labels,
        Category::Moderation,
        Category::Faces,
        Category::Celebrities,
        Category::Text,
    ];

    /// Stable lowercase name, used in metadata keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Labels => "labels",
            Category::Moderation => "moderation",
            Category::Faces => "faces",
            Category::Celebrities => "celebrities",
            Category::Text => "text",
        }
    }

    /// Remote operation name for this category.
    pub fn operation(&self) -> &'static str {
        match self {
            Category::Labels => "DetectLabels",
            Category::Moderation => "DetectModerationLabels",
            Category::Faces => "DetectFaces",
            Category::Celebrities => "RecognizeCelebrities",
            Category::Text => "DetectText",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RecognitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RecognitionError::InvalidResponse(format!("unknown category: {s}")))
    }
}

/// Where the image for a run comes from.
///
/// Built once per run and shared by every category request.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Raw image content, transmitted inline.
    Bytes(Arc<[u8]>),
    /// An object already stored in S3, referenced by bucket and key.
    S3Object { bucket: String, name: String },
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            ImageSource::S3Object { bucket, name } => f
                .debug_struct("S3Object")
                .field("bucket", bucket)
                .field("name", name)
                .finish(),
        }
    }
}

/// A single recognition call: the shared image plus per-category parameters.
#[derive(Debug, Clone)]
pub struct DetectRequest {
    pub image: ImageSource,
    /// Minimum confidence (0-100) for labels and moderation labels.
    pub min_confidence: Option<f32>,
    /// Maximum number of labels returned.
    pub max_labels: Option<u32>,
    /// Facial attributes to return (e.g. `["ALL"]`).
    pub attributes: Vec<String>,
}

impl DetectRequest {
    pub fn new(image: ImageSource) -> Self {
        Self {
            image,
            min_confidence: None,
            max_labels: None,
            attributes: Vec::new(),
        }
    }
}

/// A detected object or concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// An unsafe-content flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationLabel {
    pub name: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
}

/// A value reported with a confidence, e.g. gender or smile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute<T> {
    pub value: T,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub kind: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub low: u32,
    pub high: u32,
}

/// Facial attributes for one detected face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceDetail {
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Attribute<String>>,
    /// `None` when emotions were not requested, which is distinct from an
    /// empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<Vec<Emotion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smile: Option<Attribute<bool>>,
}

/// A recognised public figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Celebrity {
    pub id: String,
    pub name: String,
    pub match_confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

/// A line or word of text found in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    pub detected_text: String,
    /// `LINE` or `WORD`.
    pub kind: String,
    pub confidence: f32,
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,
}

/// Successful result of one category call.
#[derive(Debug, Clone, PartialEq)]
pub enum Detections {
    Labels(Vec<Label>),
    Moderation(Vec<ModerationLabel>),
    Faces(Vec<FaceDetail>),
    Celebrities(Vec<Celebrity>),
    Text(Vec<TextDetection>),
}

impl Detections {
    /// An empty success for the given category.
    pub fn empty(category: Category) -> Self {
        match category {
            Category::Labels => Detections::Labels(Vec::new()),
            Category::Moderation => Detections::Moderation(Vec::new()),
            Category::Faces => Detections::Faces(Vec::new()),
            Category::Celebrities => Detections::Celebrities(Vec::new()),
            Category::Text => Detections::Text(Vec::new()),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Detections::Labels(_) => Category::Labels,
            Detections::Moderation(_) => Category::Moderation,
            Detections::Faces(_) => Category::Faces,
            Detections::Celebrities(_) => Category::Celebrities,
            Detections::Text(_) => Category::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Detections::Labels(v) => v.len(),
            Detections::Moderation(v) => v.len(),
            Detections::Faces(v) => v.len(),
            Detections::Celebrities(v) => v.len(),
            Detections::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize the detection list as stored in attachment metadata.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        match self {
            Detections::Labels(v) => serde_json::to_string(v),
            Detections::Moderation(v) => serde_json::to_string(v),
            Detections::Faces(v) => serde_json::to_string(v),
            Detections::Celebrities(v) => serde_json::to_string(v),
            Detections::Text(v) => serde_json::to_string(v),
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Detections::Labels(v) => serde_json::to_value(v),
            Detections::Moderation(v) => serde_json::to_value(v),
            Detections::Faces(v) => serde_json::to_value(v),
            Detections::Celebrities(v) => serde_json::to_value(v),
            Detections::Text(v) => serde_json::to_value(v),
        }
    }

    /// Parse a stored payload back into detections for `category`.
    pub fn from_payload(category: Category, payload: &str) -> Result<Self, serde_json::Error> {
        Ok(match category {
            Category::Labels => Detections::Labels(serde_json::from_str(payload)?),
            Category::Moderation => Detections::Moderation(serde_json::from_str(payload)?),
            Category::Faces => Detections::Faces(serde_json::from_str(payload)?),
            Category::Celebrities => Detections::Celebrities(serde_json::from_str(payload)?),
            Category::Text => Detections::Text(serde_json::from_str(payload)?),
        })
    }
}

/// Errors from a single recognition call.
///
/// These never abort a run: the orchestrator records them per category.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecognitionError {
    #[error("No AWS credentials configured")]
    MissingCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Error reported by the service, e.g. `ThrottlingException`.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl RecognitionError {
    /// Short machine-readable code for this error.
    pub fn code(&self) -> &str {
        match self {
            RecognitionError::MissingCredentials => "missing-credentials",
            RecognitionError::Network(_) => "network-error",
            RecognitionError::Http { .. } => "http-error",
            RecognitionError::Api { code, .. } => code,
            RecognitionError::Parse(_) | RecognitionError::InvalidResponse(_) => "invalid-response",
        }
    }

    /// Payload persisted under the category's error key.
    pub fn to_stored(&self) -> StoredError {
        StoredError {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Persisted form of a category failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredError {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_processing_order() {
        let mut shuffled = vec![
            Category::Text,
            Category::Faces,
            Category::Labels,
            Category::Celebrities,
            Category::Moderation,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Category::ALL.to_vec());
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("labels".parse::<Category>().unwrap(), Category::Labels);
        assert_eq!("Celebrities".parse::<Category>().unwrap(), Category::Celebrities);
        assert!("landmarks".parse::<Category>().is_err());
    }

    #[test]
    fn test_payload_roundtrip_keeps_category_shape() {
        let faces = Detections::Faces(vec![FaceDetail {
            confidence: 99.1,
            gender: Some(Attribute {
                value: "Female".to_string(),
                confidence: 98.0,
            }),
            emotions: Some(vec![Emotion {
                kind: "HAPPY".to_string(),
                confidence: 90.0,
            }]),
            ..Default::default()
        }]);

        let payload = faces.to_payload().unwrap();
        let parsed = Detections::from_payload(Category::Faces, &payload).unwrap();
        assert_eq!(parsed, faces);
    }

    #[test]
    fn test_payload_for_wrong_category_is_rejected() {
        let labels = Detections::Labels(vec![Label {
            name: "Cat".to_string(),
            confidence: 92.3,
            parents: vec![],
        }]);
        let payload = labels.to_payload().unwrap();
        assert!(Detections::from_payload(Category::Text, &payload).is_err());
    }

    #[test]
    fn test_api_error_code_is_service_code() {
        let err = RecognitionError::Api {
            code: "ThrottlingException".to_string(),
            message: "Rate exceeded".to_string(),
        };
        let stored = err.to_stored();
        assert_eq!(stored.code, "ThrottlingException");
        assert!(stored.message.contains("Rate exceeded"));
    }

    #[test]
    fn test_image_source_debug_hides_bytes() {
        let source = ImageSource::Bytes(Arc::from(vec![0u8; 2048]));
        assert_eq!(format!("{:?}", source), "Bytes(2048 bytes)");
    }
}
