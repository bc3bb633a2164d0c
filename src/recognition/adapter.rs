//! Adapter layer: convert between domain requests/results and Rekognition DTOs
//!
//! This is the ONLY place where DTO types are converted to domain types.
//! If the service changes its response format, only this file and dto.rs
//! need to change.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;

use super::domain::{
    AgeRange, Attribute, Category, Celebrity, DetectRequest, Detections, Emotion, FaceDetail,
    ImageSource, Label, ModerationLabel, RecognitionError, TextDetection,
};
use super::dto;

/// Build the request body for `category`.
///
/// Only the parameters the operation accepts are sent: confidence and
/// label limits for labels, confidence for moderation, attributes for
/// faces. Celebrities and text only take the image.
pub fn request_body(category: Category, request: &DetectRequest) -> dto::DetectRequestBody {
    let image = match &request.image {
        ImageSource::Bytes(bytes) => dto::Image::Bytes(STANDARD.encode(bytes)),
        ImageSource::S3Object { bucket, name } => dto::Image::S3Object(dto::S3Object {
            bucket: bucket.clone(),
            name: name.clone(),
        }),
    };

    let mut body = dto::DetectRequestBody {
        image,
        min_confidence: None,
        max_labels: None,
        attributes: None,
    };

    match category {
        Category::Labels => {
            body.min_confidence = request.min_confidence;
            body.max_labels = request.max_labels;
        }
        Category::Moderation => {
            body.min_confidence = request.min_confidence;
        }
        Category::Faces => {
            if !request.attributes.is_empty() {
                body.attributes = Some(request.attributes.clone());
            }
        }
        Category::Celebrities | Category::Text => {}
    }

    body
}

/// Parse a successful response body for `category` into detections.
pub fn to_detections(category: Category, body: &[u8]) -> Result<Detections, RecognitionError> {
    let parse_err = |e: serde_json::Error| RecognitionError::Parse(e.to_string());

    Ok(match category {
        Category::Labels => {
            let response: dto::DetectLabelsResponse = serde_json::from_slice(body).map_err(parse_err)?;
            Detections::Labels(response.labels.into_iter().filter_map(convert_label).collect())
        }
        Category::Moderation => {
            let response: dto::DetectModerationLabelsResponse =
                serde_json::from_slice(body).map_err(parse_err)?;
            Detections::Moderation(
                response
                    .moderation_labels
                    .into_iter()
                    .filter_map(convert_moderation_label)
                    .collect(),
            )
        }
        Category::Faces => {
            let response: dto::DetectFacesResponse = serde_json::from_slice(body).map_err(parse_err)?;
            Detections::Faces(response.face_details.into_iter().map(convert_face).collect())
        }
        Category::Celebrities => {
            let response: dto::RecognizeCelebritiesResponse =
                serde_json::from_slice(body).map_err(parse_err)?;
            Detections::Celebrities(
                response
                    .celebrity_faces
                    .into_iter()
                    .filter_map(convert_celebrity)
                    .collect(),
            )
        }
        Category::Text => {
            let response: dto::DetectTextResponse = serde_json::from_slice(body).map_err(parse_err)?;
            Detections::Text(
                response
                    .text_detections
                    .into_iter()
                    .filter_map(convert_text)
                    .collect(),
            )
        }
    })
}

/// Convert a non-2xx response into a typed error.
///
/// `__type` may be fully qualified (`com.amazonaws...#ThrottlingException`);
/// only the part after `#` is kept.
pub fn to_error(status: u16, body: &[u8]) -> RecognitionError {
    match serde_json::from_slice::<dto::ErrorResponse>(body) {
        Ok(dto::ErrorResponse {
            kind: Some(kind), message,
        }) => {
            let code = kind.rsplit('#').next().unwrap_or(&kind).to_string();
            RecognitionError::Api {
                code,
                message: message.unwrap_or_default(),
            }
        }
        _ => RecognitionError::Http {
            status,
            message: String::from_utf8_lossy(body).chars().take(200).collect(),
        },
    }
}

static XML_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<Code>([^<]+)</Code>.*?<Message>([^<]*)</Message>").expect("valid regex")
});

/// Convert an S3 error response (XML) into a typed error.
pub fn to_object_error(status: u16, body: &[u8]) -> RecognitionError {
    let text = String::from_utf8_lossy(body);
    match XML_ERROR.captures(&text) {
        Some(caps) => RecognitionError::Api {
            code: caps[1].trim().to_string(),
            message: caps[2].trim().to_string(),
        },
        None => RecognitionError::Http {
            status,
            message: text.chars().take(200).collect(),
        },
    }
}

// Entries without a name carry nothing we can use, so they are dropped.

fn convert_label(label: dto::Label) -> Option<Label> {
    Some(Label {
        name: label.name?,
        confidence: label.confidence.unwrap_or_default(),
        parents: label.parents.into_iter().filter_map(|p| p.name).collect(),
    })
}

fn convert_moderation_label(label: dto::ModerationLabel) -> Option<ModerationLabel> {
    Some(ModerationLabel {
        name: label.name?,
        confidence: label.confidence.unwrap_or_default(),
        parent_name: label.parent_name.filter(|p| !p.is_empty()),
    })
}

fn convert_face(face: dto::FaceDetail) -> FaceDetail {
    FaceDetail {
        confidence: face.confidence.unwrap_or_default(),
        gender: face.gender.and_then(|g| {
            Some(Attribute {
                value: g.value?,
                confidence: g.confidence.unwrap_or_default(),
            })
        }),
        emotions: face.emotions.map(|emotions| {
            emotions
                .into_iter()
                .filter_map(|e| {
                    Some(Emotion {
                        kind: e.kind?,
                        confidence: e.confidence.unwrap_or_default(),
                    })
                })
                .collect()
        }),
        age_range: face.age_range.and_then(|r| {
            Some(AgeRange {
                low: r.low?,
                high: r.high?,
            })
        }),
        smile: face.smile.and_then(|s| {
            Some(Attribute {
                value: s.value?,
                confidence: s.confidence.unwrap_or_default(),
            })
        }),
    }
}

fn convert_celebrity(celebrity: dto::Celebrity) -> Option<Celebrity> {
    Some(Celebrity {
        id: celebrity.id.unwrap_or_default(),
        name: celebrity.name?,
        match_confidence: celebrity.match_confidence.unwrap_or_default(),
        urls: celebrity.urls,
    })
}

fn convert_text(text: dto::TextDetection) -> Option<TextDetection> {
    Some(TextDetection {
        detected_text: text.detected_text?,
        kind: text.kind.unwrap_or_default(),
        confidence: text.confidence.unwrap_or_default(),
        id: text.id.unwrap_or_default(),
        parent_id: text.parent_id,
    })
}
