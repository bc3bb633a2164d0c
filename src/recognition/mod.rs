//! Image recognition - calls the remote recognition API for one image.
//!
//! # Architecture
//!
//! Same separation as any external API integration:
//! - **Domain models** (`domain.rs`) - categories, detections, errors
//! - **API DTOs** (`dto.rs`) - exact wire shapes
//! - **Adapter** (`adapter.rs`) - converts between the two
//! - **Client** (`client.rs`) - signed HTTP calls, object download, settings resolution
//! - **Image** (`image.rs`) - bytes vs. S3 object reference
//! - **Profile** (`profile.rs`) - shared AWS credentials and config files
//! - **Traits** (`traits.rs`) - the `RecognitionApi` seam used by the orchestrator

pub mod adapter;
pub mod client;
pub mod domain;
pub mod dto;
pub mod image;
pub mod profile;
pub mod signing;
pub mod traits;

pub use client::{ClientSettings, RekognitionClient, OBJECT_REFERENCE_REGIONS};
pub use domain::{
    AgeRange, Attribute, Category, Celebrity, DetectRequest, Detections, Emotion, FaceDetail,
    ImageSource, Label, ModerationLabel, RecognitionError, StoredError, TextDetection,
};
pub use image::{image_source, parse_object_location};
pub use profile::SharedProfile;
pub use traits::RecognitionApi;
