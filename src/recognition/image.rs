//! Building the image argument for a run.

use std::sync::Arc;

use super::domain::ImageSource;
use super::traits::RecognitionApi;
use crate::error::{Error, Result, ResultExt};

/// Split an `s3://bucket/key` location into bucket and key.
pub fn parse_object_location(file: &str) -> Option<(&str, &str)> {
    let rest = file.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

/// Choose how to send the image at `file`.
///
/// Object-storage files are passed by reference when `use_object_storage`
/// is set and the client's region accepts references. Otherwise their
/// bytes are downloaded through the client. Local files are read from disk.
pub async fn image_source(
    client: &dyn RecognitionApi,
    file: &str,
    use_object_storage: bool,
) -> Result<ImageSource> {
    let Some((bucket, key)) = parse_object_location(file) else {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(format!("reading image {}", file))?;
        return Ok(ImageSource::Bytes(Arc::from(bytes)));
    };

    if use_object_storage && client.supports_object_reference() {
        return Ok(ImageSource::S3Object {
            bucket: bucket.to_string(),
            name: key.to_string(),
        });
    }

    tracing::debug!("Downloading {} from region {}", file, client.region());
    let bytes = client
        .fetch_object(bucket, key)
        .await
        .map_err(|e| Error::from(e).context(format!("fetching image {}", file)))?;
    Ok(ImageSource::Bytes(Arc::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::traits::mocks::MockRecognition;

    #[test]
    fn test_parse_object_location() {
        assert_eq!(
            parse_object_location("s3://media/uploads/2024/cat.jpg"),
            Some(("media", "uploads/2024/cat.jpg"))
        );
        assert_eq!(parse_object_location("/var/www/uploads/cat.jpg"), None);
        assert_eq!(parse_object_location("s3://media"), None);
        assert_eq!(parse_object_location("s3:///cat.jpg"), None);
    }

    #[tokio::test]
    async fn test_object_reference_when_allowed() {
        let client = MockRecognition::new().in_region("us-east-1");
        let source = image_source(&client, "s3://media/cat.jpg", true).await.unwrap();
        assert_eq!(
            source,
            ImageSource::S3Object {
                bucket: "media".to_string(),
                name: "cat.jpg".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_local_file_read_as_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let client = MockRecognition::new();
        let source = image_source(&client, path.to_str().unwrap(), true).await.unwrap();
        assert_eq!(source, ImageSource::Bytes(Arc::from(b"not really a png".to_vec())));
    }

    #[tokio::test]
    async fn test_object_downloaded_outside_reference_regions() {
        let client = MockRecognition::new()
            .in_region("sa-east-1")
            .with_object("media", "cat.jpg", b"jpeg bytes");

        let source = image_source(&client, "s3://media/cat.jpg", true).await.unwrap();
        assert_eq!(source, ImageSource::Bytes(Arc::from(b"jpeg bytes".to_vec())));
    }

    #[tokio::test]
    async fn test_object_downloaded_when_references_disabled() {
        let client = MockRecognition::new()
            .in_region("us-east-1")
            .with_object("media", "cat.jpg", b"jpeg bytes");

        let source = image_source(&client, "s3://media/cat.jpg", false).await.unwrap();
        assert_eq!(source, ImageSource::Bytes(Arc::from(b"jpeg bytes".to_vec())));
    }

    #[tokio::test]
    async fn test_missing_object_is_recognition_error() {
        let client = MockRecognition::new().in_region("sa-east-1");
        let err = image_source(&client, "s3://media/gone.jpg", true).await.unwrap_err();
        assert_eq!(err.code(), "recognition-error");
        assert!(err.to_string().contains("s3://media/gone.jpg"));
    }
}
