//! Test utilities and fixtures for image-tagger tests.
//!
//! This module provides common test helpers, detection factories, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use image_tagger::test_utils::{temp_db, insert_image_file};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, dir) = temp_db().await;
//!     let id = insert_image_file(&pool, &dir, "cat.png").await;
//!     // ... test logic
//! }
//! ```

use std::path::PathBuf;

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::db::NewAttachment;
use crate::recognition::{Attribute, Celebrity, Emotion, FaceDetail, Label, TextDetection};

/// Smallest PNG prefix that content sniffing recognises (signature + IHDR).
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
];

/// JPEG SOI marker followed by a JFIF APP0 header.
pub const JPEG_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
    0x00, 0x01, 0x00, 0x00,
];

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Inserts an image attachment pointing at `file` and returns its ID.
///
/// The file itself is not created.
pub async fn insert_image(pool: &SqlitePool, file: &str) -> i64 {
    crate::db::insert_attachment(
        pool,
        &NewAttachment {
            file: file.to_string(),
            mime_type: Some("image/png".to_string()),
            title: "Test Image".to_string(),
            ..Default::default()
        },
    )
    .await
    .expect("Failed to insert attachment")
}

/// Writes `bytes` to `name` inside `dir`.
pub fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("Failed to write test file");
    path
}

/// Writes a PNG to `dir` and inserts an attachment for it.
pub async fn insert_image_file(pool: &SqlitePool, dir: &TempDir, name: &str) -> i64 {
    let path = write_file(dir, name, PNG_BYTES);
    insert_image(pool, &path.to_string_lossy()).await
}

pub fn label(name: &str, confidence: f32) -> Label {
    Label {
        name: name.to_string(),
        confidence,
        parents: Vec::new(),
    }
}

pub fn celebrity(name: &str) -> Celebrity {
    Celebrity {
        id: format!("id-{}", name.to_lowercase().replace(' ', "-")),
        name: name.to_string(),
        match_confidence: 99.0,
        urls: Vec::new(),
    }
}

/// A face with a gender and the given emotion types.
pub fn face(gender: &str, emotions: &[&str]) -> FaceDetail {
    FaceDetail {
        confidence: 99.0,
        gender: Some(Attribute {
            value: gender.to_string(),
            confidence: 98.0,
        }),
        emotions: Some(
            emotions
                .iter()
                .map(|kind| Emotion {
                    kind: kind.to_string(),
                    confidence: 90.0,
                })
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn text_line(id: u32, text: &str) -> TextDetection {
    TextDetection {
        detected_text: text.to_string(),
        kind: "LINE".to_string(),
        confidence: 95.0,
        id,
        parent_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        // Should be able to query
        let ids = crate::db::image_attachment_ids(&pool).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_insert_image_file() {
        let (pool, dir) = temp_db().await;

        let id = insert_image_file(&pool, &dir, "a.png").await;
        assert!(id > 0);

        let attachment = crate::db::get_attachment(&pool, id).await.unwrap().unwrap();
        assert!(attachment.file.ends_with("a.png"));
        assert_eq!(std::fs::read(&attachment.file).unwrap(), PNG_BYTES);
    }

    #[test]
    fn test_fixtures_are_sniffed_as_images() {
        assert_eq!(infer::get(PNG_BYTES).map(|t| t.mime_type()), Some("image/png"));
        assert_eq!(infer::get(JPEG_BYTES).map(|t| t.mime_type()), Some("image/jpeg"));
    }

    #[test]
    fn test_face_fixture() {
        let face = face("Female", &["HAPPY"]);
        assert_eq!(face.gender.unwrap().value, "Female");
        assert_eq!(face.emotions.unwrap().len(), 1);
    }
}
