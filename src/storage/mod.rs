//! Signed upload URLs issued by the object storage service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("storage {0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid storage url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("storage returned no upload token")]
    MissingToken,
}

/// What the client needs to upload one object directly to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub signed_url: String,
    pub path: String,
    pub token: String,
}

/// Body accepted by the upload-url function.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: Option<String>,
    pub bucket_name: Option<String>,
}

#[async_trait]
pub trait UploadSigner: Send + Sync {
    /// Ask storage for a one-time upload URL for `path` in `bucket`.
    async fn create_signed_upload_url(&self, bucket: &str, path: &str) -> Result<SignedUpload, StorageError>;
}

/// HTTP client for the storage service, authenticated with the service role key.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: Option<Url>,
    service_role_key: String,
    internal_url: Option<String>,
    public_url: Option<String>,
}

impl StorageClient {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let base_url = match &config.url {
            Some(raw) if !raw.trim().is_empty() => Some(Url::parse(raw.trim_end_matches('/'))?),
            _ => None,
        };

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            service_role_key: config.service_role_key.clone(),
            internal_url: config.internal_url.clone(),
            public_url: config.public_url.clone(),
        })
    }

    fn storage_root(&self) -> Result<String, StorageError> {
        let base = self.base_url.as_ref().ok_or(StorageError::NotConfigured("url"))?;
        Ok(format!("{}/storage/v1", base.as_str().trim_end_matches('/')))
    }

    /// Signing endpoint for one object; bucket and path are each pushed as a single encoded segment.
    pub(crate) fn sign_endpoint(&self, bucket: &str, path: &str) -> Result<Url, StorageError> {
        let mut endpoint = self.base_url.clone().ok_or(StorageError::NotConfigured("url"))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| StorageError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", "upload", "sign", bucket, path]);
        Ok(endpoint)
    }

    /// Replace the internal gateway origin with the public one, if both are configured.
    pub fn publicize(&self, signed_url: &str) -> String {
        match (&self.internal_url, &self.public_url) {
            (Some(internal), Some(public)) if signed_url.contains(internal.as_str()) => {
                signed_url.replacen(internal.as_str(), public, 1)
            }
            _ => signed_url.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SignResponse {
    url: String,
}

#[async_trait]
impl UploadSigner for StorageClient {
    async fn create_signed_upload_url(&self, bucket: &str, path: &str) -> Result<SignedUpload, StorageError> {
        if self.service_role_key.is_empty() {
            return Err(StorageError::NotConfigured("service role key"));
        }
        let root = self.storage_root()?;
        let endpoint = self.sign_endpoint(bucket, path)?;

        tracing::debug!("Requesting signed upload url for {}/{}", bucket, path);
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.service_role_key)
            .header("apikey", &self.service_role_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("storage responded with {}", status));
            return Err(StorageError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let signed: SignResponse = response.json().await?;
        let signed_url = Url::parse(&format!("{}{}", root, signed.url))?;
        let token = signed_url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .ok_or(StorageError::MissingToken)?;

        Ok(SignedUpload {
            signed_url: self.publicize(signed_url.as_str()),
            path: path.to_string(),
            token,
        })
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// Bucket names are limited to `[A-Za-z0-9_.-]` and may not be a dot segment.
pub fn validate_bucket_name(name: &str) -> Result<(), StorageError> {
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if allowed && name != "." && name != ".." {
        Ok(())
    } else {
        Err(StorageError::InvalidRequest(format!("Invalid bucketName: {}", name)))
    }
}

/// Unique object path for an uploaded file.
pub fn object_path(file_name: &str) -> String {
    format!("{}-{}", uuid::Uuid::new_v4(), sanitize_file_name(file_name))
}

/// Validate an upload request and obtain a signed URL for it. Returns the signed upload and the bucket used.
pub async fn prepare_upload(
    signer: &dyn UploadSigner,
    request: UploadRequest,
    default_bucket: &str,
) -> Result<(SignedUpload, String), StorageError> {
    let file_name = request
        .file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StorageError::InvalidRequest("fileName is required".to_string()))?;
    let bucket = request
        .bucket_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_bucket.to_string());
    validate_bucket_name(&bucket)?;

    let path = object_path(&file_name);
    let signed = signer.create_signed_upload_url(&bucket, &path).await?;
    tracing::info!("Issued signed upload url for {}/{}", bucket, signed.path);
    Ok((signed, bucket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSigner {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl UploadSigner for RecordingSigner {
        async fn create_signed_upload_url(&self, bucket: &str, path: &str) -> Result<SignedUpload, StorageError> {
            self.calls.lock().unwrap().push((bucket.to_string(), path.to_string()));
            Ok(SignedUpload {
                signed_url: format!("http://localhost:54321/storage/v1/object/upload/sign/{}/{}?token=t", bucket, path),
                path: path.to_string(),
                token: "t".to_string(),
            })
        }
    }

    fn signer() -> RecordingSigner {
        RecordingSigner { calls: Mutex::new(Vec::new()) }
    }

    fn config(url: Option<&str>) -> StorageConfig {
        StorageConfig {
            url: url.map(str::to_string),
            service_role_key: "service-key".to_string(),
            default_bucket: "test-uploads".to_string(),
            internal_url: Some("http://kong:8000".to_string()),
            public_url: Some("http://localhost:54321".to_string()),
        }
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_file_name("report-2024.v2.pdf"), "report-2024.v2.pdf");
        assert_eq!(sanitize_file_name("héllo.txt"), "h_llo.txt");
    }

    #[test]
    fn object_paths_are_unique_and_keep_the_name() {
        let a = object_path("a b.txt");
        let b = object_path("a b.txt");
        assert_ne!(a, b);
        assert!(a.ends_with("-a_b.txt"));
        assert_eq!(a.len(), 36 + 1 + "a_b.txt".len());
    }

    #[test]
    fn rewrites_internal_gateway_urls() {
        let client = StorageClient::from_config(&config(Some("http://127.0.0.1:54321"))).unwrap();
        assert_eq!(
            client.publicize("http://kong:8000/storage/v1/object/upload/sign/b/p?token=x"),
            "http://localhost:54321/storage/v1/object/upload/sign/b/p?token=x"
        );
        assert_eq!(client.publicize("https://cdn.example.com/x"), "https://cdn.example.com/x");
    }

    #[tokio::test]
    async fn requires_a_file_name() {
        let signer = signer();
        let err = prepare_upload(&signer, UploadRequest { file_name: None, bucket_name: None }, "test-uploads")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "fileName is required");
        assert!(signer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn defaults_the_bucket() {
        let signer = signer();
        let request = UploadRequest {
            file_name: Some("cat pic.jpg".to_string()),
            bucket_name: None,
        };
        let (signed, bucket) = prepare_upload(&signer, request, "test-uploads").await.unwrap();

        assert_eq!(bucket, "test-uploads");
        assert!(signed.path.ends_with("-cat_pic.jpg"));
        let calls = signer.calls.lock().unwrap();
        assert_eq!(calls[0].0, "test-uploads");
        assert_eq!(calls[0].1, signed.path);
    }

    #[tokio::test]
    async fn rejects_bucket_names_that_leave_the_sign_endpoint() {
        let signer = signer();
        for bucket in ["../../../bucket", "..", "a/b", "a?b", "a#b"] {
            let request = UploadRequest {
                file_name: Some("a.txt".to_string()),
                bucket_name: Some(bucket.to_string()),
            };
            let err = prepare_upload(&signer, request, "test-uploads").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidRequest(_)), "{}", bucket);
        }
        assert!(signer.calls.lock().unwrap().is_empty());
        assert!(validate_bucket_name("user_avatars-2024.v1").is_ok());
    }

    #[test]
    fn sign_endpoint_encodes_each_segment() {
        let client = StorageClient::from_config(&config(Some("http://127.0.0.1:54321"))).unwrap();
        assert_eq!(
            client.sign_endpoint("avatars", "abc-me.png").unwrap().as_str(),
            "http://127.0.0.1:54321/storage/v1/object/upload/sign/avatars/abc-me.png"
        );
        assert_eq!(
            client.sign_endpoint("a?b", "x#y/z").unwrap().as_str(),
            "http://127.0.0.1:54321/storage/v1/object/upload/sign/a%3Fb/x%23y%2Fz"
        );
    }

    #[tokio::test]
    async fn unconfigured_client_reports_it() {
        let client = StorageClient::from_config(&config(None)).unwrap();
        let err = client.create_signed_upload_url("b", "p").await.unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured("url")));
    }
}
