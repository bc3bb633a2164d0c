//! Image Tagger - image recognition metadata for attachment libraries.
//!
//! When an image attachment is uploaded or updated, a deferred job calls a
//! cloud image-recognition API (AWS Rekognition) for labels, moderation
//! flags, faces, celebrities and text. The results are stored as attachment
//! metadata, taxonomy terms, alt text and a keyword string that makes the
//! image findable by attachment search.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod recognition;
pub mod search;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod trigger;

pub use error::{Error, Result};
