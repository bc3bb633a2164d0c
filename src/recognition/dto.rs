//! Rekognition API Data Transfer Objects
//!
//! These types match what the Rekognition JSON 1.1 protocol sends and
//! returns. DO NOT use these types outside the recognition module - convert
//! to domain types in the adapter.
//!
//! API Reference: https://docs.aws.amazon.com/rekognition/latest/APIReference/
//!
//! Example `DetectLabels` response:
//! ```json
//! {
//!   "Labels": [
//!     {"Name": "Cat", "Confidence": 92.3, "Parents": [{"Name": "Animal"}]}
//!   ],
//!   "LabelModelVersion": "3.0"
//! }
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// The `Image` member shared by every request.
#[derive(Debug, Clone, Serialize)]
pub enum Image {
    /// Base64-encoded image content.
    Bytes(String),
    S3Object(S3Object),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Object {
    pub bucket: String,
    pub name: String,
}

/// Request body for any of the five operations.
///
/// Each operation only accepts a subset of the optional members; the
/// adapter fills in the ones that apply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectRequestBody {
    pub image: Image,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_labels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectLabelsResponse {
    #[serde(default)]
    pub labels: Vec<Label>,
    pub label_model_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    pub name: Option<String>,
    pub confidence: Option<f32>,
    #[serde(default)]
    pub parents: Vec<Parent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parent {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectModerationLabelsResponse {
    #[serde(default)]
    pub moderation_labels: Vec<ModerationLabel>,
    pub moderation_model_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModerationLabel {
    pub name: Option<String>,
    pub confidence: Option<f32>,
    /// Empty string for top-level categories.
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectFacesResponse {
    #[serde(default)]
    pub face_details: Vec<FaceDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaceDetail {
    pub confidence: Option<f32>,
    pub age_range: Option<AgeRange>,
    pub smile: Option<BoolAttribute>,
    pub gender: Option<StringAttribute>,
    pub emotions: Option<Vec<Emotion>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgeRange {
    pub low: Option<u32>,
    pub high: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoolAttribute {
    pub value: Option<bool>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StringAttribute {
    pub value: Option<String>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Emotion {
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecognizeCelebritiesResponse {
    #[serde(default)]
    pub celebrity_faces: Vec<Celebrity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Celebrity {
    pub id: Option<String>,
    pub name: Option<String>,
    pub match_confidence: Option<f32>,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectTextResponse {
    #[serde(default)]
    pub text_detections: Vec<TextDetection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextDetection {
    pub detected_text: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub confidence: Option<f32>,
    pub id: Option<u32>,
    pub parent_id: Option<u32>,
}

/// Error body returned with non-2xx responses.
///
/// The service is inconsistent about `message` vs `Message`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "__type")]
    pub kind: Option<String>,
    #[serde(alias = "Message")]
    pub message: Option<String>,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// ============================================================================

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[test]
    fn test_serialize_bytes_request() {
        let body = DetectRequestBody {
            image: Image::Bytes("aGVsbG8=".to_string()),
            min_confidence: Some(60.0),
            max_labels: Some(50),
            attributes: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["Image"]["Bytes"], "aGVsbG8=");
        assert_eq!(json["MinConfidence"], 60.0);
        assert_eq!(json["MaxLabels"], 50);
        assert!(json.get("Attributes").is_none());
    }

    #[test]
    fn test_serialize_s3_request() {
        let body = DetectRequestBody {
            image: Image::S3Object(S3Object {
                bucket: "media".to_string(),
                name: "uploads/cat.jpg".to_string(),
            }),
            min_confidence: None,
            max_labels: None,
            attributes: Some(vec!["ALL".to_string()]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["Image"]["S3Object"]["Bucket"], "media");
        assert_eq!(json["Image"]["S3Object"]["Name"], "uploads/cat.jpg");
        assert_eq!(json["Attributes"][0], "ALL");
        assert!(json.get("MinConfidence").is_none());
    }

    #[test]
    fn test_parse_labels_response() {
        let json = r#"{
            "Labels": [
                {"Name": "Cat", "Confidence": 92.3, "Instances": [], "Parents": [{"Name": "Animal"}, {"Name": "Pet"}]},
                {"Name": "Dog", "Confidence": 61.0}
            ],
            "LabelModelVersion": "3.0"
        }"#;
        let response: DetectLabelsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.labels.len(), 2);
        assert_eq!(response.labels[0].name.as_deref(), Some("Cat"));
        assert_eq!(response.labels[0].parents.len(), 2);
        assert!(response.labels[1].parents.is_empty());
        assert_eq!(response.label_model_version.as_deref(), Some("3.0"));
    }

    #[test]
    fn test_parse_faces_response() {
        let json = r#"{
            "FaceDetails": [{
                "BoundingBox": {"Width": 0.2, "Height": 0.3, "Left": 0.1, "Top": 0.1},
                "AgeRange": {"Low": 25, "High": 35},
                "Smile": {"Value": true, "Confidence": 97.5},
                "Gender": {"Value": "Female", "Confidence": 99.2},
                "Emotions": [{"Type": "HAPPY", "Confidence": 95.0}, {"Type": "CALM", "Confidence": 3.1}],
                "Confidence": 99.9
            }]
        }"#;
        let response: DetectFacesResponse = serde_json::from_str(json).unwrap();
        let face = &response.face_details[0];
        assert_eq!(face.gender.as_ref().unwrap().value.as_deref(), Some("Female"));
        assert_eq!(face.emotions.as_ref().unwrap()[0].kind.as_deref(), Some("HAPPY"));
        assert_eq!(face.age_range.as_ref().unwrap().low, Some(25));
    }

    #[test]
    fn test_parse_default_attribute_faces() {
        // Without Attributes=ALL the service omits gender and emotions
        let json = r#"{"FaceDetails": [{"Confidence": 99.0, "Landmarks": []}]}"#;
        let response: DetectFacesResponse = serde_json::from_str(json).unwrap();
        assert!(response.face_details[0].gender.is_none());
        assert!(response.face_details[0].emotions.is_none());
    }

    #[test]
    fn test_parse_celebrities_response() {
        let json = r#"{
            "CelebrityFaces": [{"Urls": ["www.imdb.com/name/nm0000001"], "Name": "Ada Lovelace", "Id": "1a2b", "MatchConfidence": 98.0, "Face": {}}],
            "UnrecognizedFaces": []
        }"#;
        let response: RecognizeCelebritiesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.celebrity_faces[0].name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(response.celebrity_faces[0].urls.len(), 1);
    }

    #[test]
    fn test_parse_text_response() {
        let json = r#"{
            "TextDetections": [
                {"DetectedText": "OPEN LATE", "Type": "LINE", "Id": 0, "Confidence": 99.0},
                {"DetectedText": "OPEN", "Type": "WORD", "Id": 1, "ParentId": 0, "Confidence": 99.0}
            ]
        }"#;
        let response: DetectTextResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text_detections.len(), 2);
        assert_eq!(response.text_detections[1].parent_id, Some(0));
        assert_eq!(response.text_detections[0].kind.as_deref(), Some("LINE"));
    }

    #[test]
    fn test_parse_moderation_response() {
        let json = r#"{
            "ModerationLabels": [{"Confidence": 88.0, "Name": "Violence", "ParentName": ""}],
            "ModerationModelVersion": "6.0"
        }"#;
        let response: DetectModerationLabelsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.moderation_labels[0].name.as_deref(), Some("Violence"));
        assert_eq!(response.moderation_labels[0].parent_name.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_error_response_either_casing() {
        let lower: ErrorResponse = serde_json::from_str(
            r#"{"__type": "ThrottlingException", "message": "Rate exceeded"}"#,
        )
        .unwrap();
        assert_eq!(lower.kind.as_deref(), Some("ThrottlingException"));
        assert_eq!(lower.message.as_deref(), Some("Rate exceeded"));

        let upper: ErrorResponse = serde_json::from_str(
            r#"{"__type": "InvalidImageFormatException", "Message": "Request has invalid image format"}"#,
        )
        .unwrap();
        assert_eq!(upper.message.as_deref(), Some("Request has invalid image format"));
    }
}
