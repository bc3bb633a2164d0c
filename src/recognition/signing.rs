//! AWS Signature Version 4.
//!
//! Only what the clients need: requests without a query string whose path
//! is already URI-encoded. The caller passes the headers to sign (at least
//! `host`); `x-amz-date` and, for temporary credentials,
//! `x-amz-security-token` are added here.
//!
//! Reference: https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Headers to attach to the signed request, in signing order.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

/// Input for one signature.
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub method: &'a str,
    /// Encoded request path, e.g. `/` or `/uploads/cat.jpg`
    pub path: &'a str,
    /// Lowercase header names and values to sign, including `host`
    pub headers: &'a [(&'a str, &'a str)],
    pub payload: &'a [u8],
    pub time: DateTime<Utc>,
}

/// Lowercase hex SHA-256 of a request body.
pub fn payload_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Sign one request.
pub fn sign(params: &SigningParams<'_>) -> SignedHeaders {
    let amz_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = params.time.format("%Y%m%d").to_string();

    let mut headers: Vec<(&str, &str)> = params.headers.to_vec();
    headers.push(("x-amz-date", amz_date.as_str()));
    if let Some(token) = &params.credentials.session_token {
        headers.push(("x-amz-security-token", token.as_str()));
    }
    headers.sort_by(|a, b| a.0.cmp(b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        params.method,
        params.path,
        canonical_headers,
        signed_headers,
        payload_hash(params.payload)
    );

    let scope = format!("{}/{}/{}/aws4_request", date, params.region, params.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        payload_hash(canonical_request.as_bytes())
    );

    let key = signing_key(
        &params.credentials.secret_access_key,
        &date,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, params.credentials.access_key_id, scope, signed_headers, signature
        ),
        amz_date,
        security_token: params.credentials.session_token.clone(),
    }
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn credentials(token: Option<&str>) -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: token.map(String::from),
        }
    }

    const JSON_HEADERS: &[(&str, &str)] = &[
        ("content-type", "application/x-amz-json-1.1"),
        ("host", "rekognition.us-east-1.amazonaws.com"),
        ("x-amz-target", "RekognitionService.DetectLabels"),
    ];

    fn params<'a>(creds: &'a Credentials, payload: &'a [u8]) -> SigningParams<'a> {
        SigningParams {
            credentials: creds,
            region: "us-east-1",
            service: "rekognition",
            method: "POST",
            path: "/",
            headers: JSON_HEADERS,
            payload,
            time: Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_signing_key_matches_documented_example() {
        // Worked example from the AWS "derive a signing key" documentation
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let creds = credentials(None);
        let signed = sign(&params(&creds, b"{}"));

        assert_eq!(signed.amz_date, "20240305T123000Z");
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240305/us-east-1/rekognition/aws4_request, "
        ));
        assert!(
            signed
                .authorization
                .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-target, ")
        );
        let signature = signed.authorization.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signed.security_token.is_none());
    }

    #[test]
    fn test_session_token_is_signed() {
        let creds = credentials(Some("session-token"));
        let signed = sign(&params(&creds, b"{}"));
        assert!(signed.authorization.contains(
            "SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"
        ));
        assert_eq!(signed.security_token.as_deref(), Some("session-token"));
    }

    #[test]
    fn test_signature_depends_on_payload() {
        let creds = credentials(None);
        let a = sign(&params(&creds, b"{\"a\":1}"));
        let b = sign(&params(&creds, b"{\"a\":2}"));
        assert_ne!(a.authorization, b.authorization);

        let again = sign(&params(&creds, b"{\"a\":1}"));
        assert_eq!(a.authorization, again.authorization);
    }

    #[test]
    fn test_empty_payload_hash() {
        assert_eq!(
            payload_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_get_object_signature_covers_path() {
        let creds = credentials(None);
        let content_hash = payload_hash(b"");
        let headers = [
            ("host", "media.s3.sa-east-1.amazonaws.com"),
            ("x-amz-content-sha256", content_hash.as_str()),
        ];
        let sign_path = |path: &'static str| {
            sign(&SigningParams {
                service: "s3",
                method: "GET",
                path,
                headers: &headers,
                ..params(&creds, b"")
            })
        };

        let cat = sign_path("/uploads/cat.jpg");
        let dog = sign_path("/uploads/dog.jpg");
        assert!(cat.authorization.contains("/us-east-1/s3/aws4_request, "));
        assert!(cat.authorization.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date, "));
        assert_ne!(cat.authorization, dog.authorization);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", credentials(Some("tok")));
        assert!(!debug.contains("EXAMPLEKEY"));
        assert!(!debug.contains("tok\""));
    }
}
