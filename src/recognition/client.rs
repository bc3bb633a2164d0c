//! Rekognition HTTP client
//!
//! Speaks the JSON 1.1 protocol directly over reqwest:
//! `POST /` with `X-Amz-Target: RekognitionService.<Operation>`, signed with
//! Signature Version 4.
//!
//! ## Settings resolution
//!
//! Region and credentials are resolved once, when the client is built:
//! explicit config first, then the standard AWS environment variables, then
//! the shared profile files, then defaults. Explicit credentials are only
//! used when key, secret AND region are all configured. With no credentials at all the client still builds;
//! every call then fails with [`RecognitionError::MissingCredentials`],
//! which the orchestrator records like any other per-category failure.
//!
//! ## Object bytes
//!
//! When a request may not reference an S3 object, [`RekognitionClient::fetch_object`]
//! downloads it with a signed `GetObject` so the bytes can be sent inline.

use std::time::Duration;

use chrono::Utc;

use super::adapter;
use super::domain::{Category, DetectRequest, Detections, RecognitionError};
use super::profile::SharedProfile;
use super::signing::{self, Credentials, SigningParams};
use crate::config::AwsConfig;

/// Region used when nothing else is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Regions where requests may reference an S3 object instead of carrying
/// the image bytes.
pub const OBJECT_REFERENCE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-2",
    "eu-west-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-2",
];

const SERVICE: &str = "rekognition";
const OBJECT_SERVICE: &str = "s3";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Fully resolved client settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub region: String,
    pub credentials: Option<Credentials>,
    pub endpoint: String,
    /// Path-style S3 endpoint; virtual-hosted AWS URLs when unset
    pub s3_endpoint: Option<String>,
    pub timeout: Duration,
}

impl ClientSettings {
    /// Resolve settings from config, the process environment and the
    /// shared profile files.
    pub fn resolve(config: &AwsConfig) -> Self {
        let env = |name: &str| std::env::var(name).ok();
        Self::resolve_with(config, env, &SharedProfile::load(env))
    }

    /// Resolve settings with a custom environment lookup and profile.
    pub fn resolve_with(
        config: &AwsConfig,
        env: impl Fn(&str) -> Option<String>,
        shared: &SharedProfile,
    ) -> Self {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let region = config
            .region
            .clone()
            .or_else(|| env("AWS_REGION"))
            .or_else(|| env("AWS_DEFAULT_REGION"))
            .or_else(|| shared.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let explicit = match (&config.access_key_id, &config.secret_access_key, &config.region) {
            (Some(key), Some(secret), Some(_)) => Some(Credentials {
                access_key_id: key.clone(),
                secret_access_key: secret.clone(),
                session_token: config.session_token.clone(),
            }),
            _ => None,
        };

        let credentials = explicit
            .or_else(|| {
                Some(Credentials {
                    access_key_id: env("AWS_ACCESS_KEY_ID")?,
                    secret_access_key: env("AWS_SECRET_ACCESS_KEY")?,
                    session_token: env("AWS_SESSION_TOKEN"),
                })
            })
            .or_else(|| shared.credentials.clone());

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.{}.amazonaws.com", SERVICE, region));

        Self {
            region,
            credentials,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            s3_endpoint: config
                .s3_endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Whether this region accepts S3 object references.
    pub fn supports_object_reference(&self) -> bool {
        OBJECT_REFERENCE_REGIONS.contains(&self.region.as_str())
    }

    fn host(&self) -> &str {
        host_of(&self.endpoint)
    }

    /// URL, host and encoded path of an S3 object.
    fn object_target(&self, bucket: &str, key: &str) -> (String, String, String) {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        match &self.s3_endpoint {
            Some(endpoint) => {
                let path = format!("/{}/{}", urlencoding::encode(bucket), encoded_key);
                (format!("{}{}", endpoint, path), host_of(endpoint).to_string(), path)
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.region);
                let path = format!("/{}", encoded_key);
                (format!("https://{}{}", host, path), host, path)
            }
        }
    }
}

fn host_of(endpoint: &str) -> &str {
    let without_scheme = endpoint
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(endpoint);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}

/// Rekognition API client
pub struct RekognitionClient {
    settings: ClientSettings,
    http_client: reqwest::Client,
}

impl RekognitionClient {
    /// Create a new client from resolved settings.
    ///
    /// The client is configured to:
    /// - Accept gzip-compressed responses
    /// - Send a User-Agent header identifying the application
    /// - Give up on requests after the configured timeout
    pub fn new(settings: ClientSettings) -> Result<Self, RecognitionError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .timeout(settings.timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| RecognitionError::Network(e.to_string()))?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn region(&self) -> &str {
        &self.settings.region
    }

    /// Run one recognition call.
    pub async fn detect(
        &self,
        category: Category,
        request: &DetectRequest,
    ) -> Result<Detections, RecognitionError> {
        let body = adapter::request_body(category, request);
        let payload =
            serde_json::to_vec(&body).map_err(|e| RecognitionError::InvalidResponse(e.to_string()))?;

        let response = self.send(category, payload).await?;
        adapter::to_detections(category, &response)
    }

    /// Sign and send the request, returning the raw success body.
    async fn send(&self, category: Category, payload: Vec<u8>) -> Result<Vec<u8>, RecognitionError> {
        let credentials = self
            .settings
            .credentials
            .as_ref()
            .ok_or(RecognitionError::MissingCredentials)?;

        let target = format!("RekognitionService.{}", category.operation());
        let headers = [
            ("content-type", CONTENT_TYPE),
            ("host", self.settings.host()),
            ("x-amz-target", target.as_str()),
        ];
        let signed = signing::sign(&SigningParams {
            credentials,
            region: &self.settings.region,
            service: SERVICE,
            method: "POST",
            path: "/",
            headers: &headers,
            payload: &payload,
            time: Utc::now(),
        });

        let mut builder = self
            .http_client
            .post(format!("{}/", self.settings.endpoint))
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            builder = builder.header("x-amz-security-token", token);
        }

        tracing::debug!(%category, bytes = payload.len(), "Sending recognition request");

        let (status, body) = read_response(builder.body(payload)).await?;
        if !status.is_success() {
            return Err(adapter::to_error(status.as_u16(), &body));
        }

        Ok(body)
    }

    /// Download an S3 object in the client's region.
    pub async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, RecognitionError> {
        let credentials = self
            .settings
            .credentials
            .as_ref()
            .ok_or(RecognitionError::MissingCredentials)?;

        let (url, host, path) = self.settings.object_target(bucket, key);
        let content_hash = signing::payload_hash(b"");
        let headers = [
            ("host", host.as_str()),
            ("x-amz-content-sha256", content_hash.as_str()),
        ];
        let signed = signing::sign(&SigningParams {
            credentials,
            region: &self.settings.region,
            service: OBJECT_SERVICE,
            method: "GET",
            path: &path,
            headers: &headers,
            payload: b"",
            time: Utc::now(),
        });

        let mut builder = self
            .http_client
            .get(url)
            .header("x-amz-content-sha256", &content_hash)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            builder = builder.header("x-amz-security-token", token);
        }

        tracing::debug!(bucket, key, "Fetching object");

        let (status, body) = read_response(builder).await?;
        if !status.is_success() {
            return Err(adapter::to_object_error(status.as_u16(), &body));
        }

        Ok(body)
    }
}

async fn read_response(
    builder: reqwest::RequestBuilder,
) -> Result<(reqwest::StatusCode, Vec<u8>), RecognitionError> {
    let response = builder
        .send()
        .await
        .map_err(|e| RecognitionError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| RecognitionError::Network(e.to_string()))?;

    Ok((status, body.to_vec()))
}
