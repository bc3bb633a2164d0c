//! Trait definition for the recognition client.
//!
//! The orchestrator only sees `dyn RecognitionApi`, so tests can substitute
//! a mock for the real HTTP client.
//!
//! # Example
//!
//! ```ignore
//! use image_tagger::recognition::{RecognitionApi, Category};
//!
//! async fn labels(client: &dyn RecognitionApi, request: &DetectRequest) {
//!     let result = client.detect(Category::Labels, request).await;
//! }
//! ```

use async_trait::async_trait;

use super::domain::{Category, DetectRequest, Detections, RecognitionError};

/// One operation per category, sharing a request built once per run.
///
/// Implementations must report every failure as a [`RecognitionError`]
/// instead of panicking.
#[async_trait]
pub trait RecognitionApi: Send + Sync {
    /// Region the client talks to.
    fn region(&self) -> &str;

    /// Whether requests may reference S3 objects instead of carrying bytes.
    fn supports_object_reference(&self) -> bool;

    async fn detect(
        &self,
        category: Category,
        request: &DetectRequest,
    ) -> Result<Detections, RecognitionError>;

    /// Download an S3 object, for when it cannot be passed by reference.
    async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, RecognitionError>;
}

#[async_trait]
impl RecognitionApi for super::client::RekognitionClient {
    fn region(&self) -> &str {
        self.region()
    }

    fn supports_object_reference(&self) -> bool {
        self.settings().supports_object_reference()
    }

    async fn detect(
        &self,
        category: Category,
        request: &DetectRequest,
    ) -> Result<Detections, RecognitionError> {
        self.detect(category, request).await
    }

    async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, RecognitionError> {
        self.fetch_object(bucket, key).await
    }
}

/// Mock recognition client for testing.
#[cfg(test)]
pub mod mocks {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Returns configured results per category and records every call.
    ///
    /// Categories without a configured result return an empty success.
    /// Objects not added with [`MockRecognition::with_object`] fail with `NoSuchKey`.
    pub struct MockRecognition {
        pub responses: HashMap<Category, Result<Detections, RecognitionError>>,
        pub objects: HashMap<(String, String), Vec<u8>>,
        pub region: String,
        pub calls: Mutex<Vec<(Category, DetectRequest)>>,
    }

    impl MockRecognition {
        pub fn new() -> Self {
            Self {
                responses: HashMap::new(),
                objects: HashMap::new(),
                region: "us-east-1".to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Set the result for one category.
        pub fn with(mut self, category: Category, result: Result<Detections, RecognitionError>) -> Self {
            self.responses.insert(category, result);
            self
        }

        /// Serve `bytes` for `s3://bucket/key`.
        pub fn with_object(mut self, bucket: &str, key: &str, bytes: &[u8]) -> Self {
            self.objects.insert((bucket.to_string(), key.to_string()), bytes.to_vec());
            self
        }

        pub fn in_region(mut self, region: &str) -> Self {
            self.region = region.to_string();
            self
        }

        /// Categories called so far, in call order.
        pub fn called(&self) -> Vec<Category> {
            self.calls.lock().unwrap().iter().map(|(c, _)| *c).collect()
        }

        pub fn requests(&self) -> Vec<(Category, DetectRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecognitionApi for MockRecognition {
        fn region(&self) -> &str {
            &self.region
        }

        fn supports_object_reference(&self) -> bool {
            crate::recognition::client::OBJECT_REFERENCE_REGIONS.contains(&self.region.as_str())
        }

        async fn detect(
            &self,
            category: Category,
            request: &DetectRequest,
        ) -> Result<Detections, RecognitionError> {
            self.calls.lock().unwrap().push((category, request.clone()));
            self.responses
                .get(&category)
                .cloned()
                .unwrap_or_else(|| Ok(Detections::empty(category)))
        }

        async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, RecognitionError> {
            self.objects
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| RecognitionError::Api {
                    code: "NoSuchKey".to_string(),
                    message: format!("{}/{}", bucket, key),
                })
        }
    }

    #[cfg(test)]
    mod tests {
        use std::sync::Arc;

        use super::*;
        use crate::recognition::{ImageSource, Label};

        fn request() -> DetectRequest {
            DetectRequest::new(ImageSource::Bytes(Arc::from(vec![0u8; 4])))
        }

        #[tokio::test]
        async fn test_mock_unconfigured_category_is_empty() {
            let mock = MockRecognition::new();
            let result = mock.detect(Category::Text, &request()).await.unwrap();
            assert!(result.is_empty());
            assert_eq!(mock.called(), vec![Category::Text]);
        }

        #[tokio::test]
        async fn test_mock_configured_results() {
            let mock = MockRecognition::new()
                .with(
                    Category::Labels,
                    Ok(Detections::Labels(vec![Label {
                        name: "Cat".to_string(),
                        confidence: 92.3,
                        parents: vec![],
                    }])),
                )
                .with(
                    Category::Faces,
                    Err(RecognitionError::Network("timeout".to_string())),
                );

            assert_eq!(mock.detect(Category::Labels, &request()).await.unwrap().len(), 1);
            assert!(matches!(
                mock.detect(Category::Faces, &request()).await,
                Err(RecognitionError::Network(_))
            ));
        }

        #[test]
        fn test_mock_region_allow_list() {
            assert!(MockRecognition::new().supports_object_reference());
            assert!(!MockRecognition::new().in_region("sa-east-1").supports_object_reference());
        }
    }
}
