//! Image analysis - runs recognition for an attachment and projects the
//! results into metadata.
//!
//! # Architecture
//!
//! - **Request** (`request.rs`) - enabled categories and their parameters
//! - **Orchestrator** (`orchestrator.rs`) - one call per enabled category
//! - **Projector** (`projector.rs`) - outcome to keywords, terms, alt text
//! - **Keywords** (`keywords.rs`) - normalisation of the search keywords
//! - **Hooks** (`hooks.rs`) - caller-supplied extension points
//! - **Pipeline** (`pipeline.rs`) - analyze-and-persist, stored result readers
//!
//! # Usage
//!
//! ```ignore
//! use image_tagger::analysis::{Analyzer, Pipeline};
//!
//! let analyzer = Analyzer::new(Arc::new(client), config.analysis.clone());
//! let pipeline = Pipeline::new(analyzer, Arc::new(SqliteStore::new(pool)));
//! pipeline.update_attachment_data(42).await?;
//! ```

pub mod hooks;
pub mod keywords;
pub mod orchestrator;
pub mod pipeline;
pub mod projector;
pub mod request;

pub use hooks::Hooks;
pub use orchestrator::{AnalysisOutcome, Analyzer, CategoryResult};
pub use pipeline::{
    AttachmentRecognition, BatchReport, LabelSummary, Pipeline, ReprocessData, ReprocessResponse,
    attachment_recognition, stored_detections, stored_errors, stored_summary,
};
pub use projector::{DerivedMetadata, ExistingState, MetaWrite, Projection, Projector};
pub use request::AnalysisRequest;
