//! Remote image hosting. Photos are uploaded to, and deleted from, a media
//! host that returns a public url and a deletion handle.

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use chrono::Utc;
use futures_util::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

/// Crop applied by the host to every upload.
const UPLOAD_TRANSFORMATION: &str = "c_fill,g_face,h_500,w_500";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

pub trait MediaHost: Send + Sync {
    fn upload(&self, file_name: String, bytes: Bytes) -> BoxFuture<'_, Result<UploadedImage>>;

    /// True when the host confirms the image is gone.
    fn destroy(&self, public_id: String) -> BoxFuture<'_, Result<bool>>;
}

#[derive(Debug, Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

pub struct CloudinaryHost {
    client: reqwest::Client,
    credentials: CloudinaryCredentials,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryHost {
    pub fn new(credentials: CloudinaryCredentials) -> Self {
        let base_url = format!("https://api.cloudinary.com/v1_1/{}/image", credentials.cloud_name);
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url,
        }
    }

    async fn upload_image(&self, file_name: String, bytes: Bytes) -> Result<UploadedImage> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("timestamp", timestamp.as_str()), ("transformation", UPLOAD_TRANSFORMATION)],
            &self.credentials.api_secret,
        );

        debug!("Uploading {} ({} bytes) to media host", file_name, bytes.len());
        let form = Form::new()
            .part("file", Part::bytes(bytes.to_vec()).file_name(file_name))
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("transformation", UPLOAD_TRANSFORMATION)
            .text("signature", signature);

        let response: UploadResponse = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("media upload request failed")?
            .error_for_status()
            .context("media host rejected the upload")?
            .json()
            .await
            .context("media host sent an unreadable upload response")?;

        info!("Uploaded image {}", response.public_id);
        Ok(UploadedImage {
            url: response.secure_url,
            public_id: response.public_id,
        })
    }

    async fn destroy_image(&self, public_id: String) -> Result<bool> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id.as_str()), ("timestamp", timestamp.as_str())],
            &self.credentials.api_secret,
        );

        let form = Form::new()
            .text("public_id", public_id.clone())
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response: DestroyResponse = self
            .client
            .post(format!("{}/destroy", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("media destroy request failed")?
            .error_for_status()
            .context("media host rejected the destroy request")?
            .json()
            .await
            .context("media host sent an unreadable destroy response")?;

        debug!("Destroy {} -> {}", public_id, response.result);
        Ok(response.result == "ok")
    }
}

impl MediaHost for CloudinaryHost {
    fn upload(&self, file_name: String, bytes: Bytes) -> BoxFuture<'_, Result<UploadedImage>> {
        Box::pin(self.upload_image(file_name, bytes))
    }

    fn destroy(&self, public_id: String) -> BoxFuture<'_, Result<bool>> {
        Box::pin(self.destroy_image(public_id))
    }
}

/// Stand-in used when no media credentials are configured. Every call fails.
pub struct UnconfiguredHost;

impl MediaHost for UnconfiguredHost {
    fn upload(&self, _file_name: String, _bytes: Bytes) -> BoxFuture<'_, Result<UploadedImage>> {
        Box::pin(async { bail!("media host is not configured") })
    }

    fn destroy(&self, _public_id: String) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async { bail!("media host is not configured") })
    }
}

/// Request signature: params sorted by name, joined as `k=v&k=v`, secret
/// appended, SHA-1 hex digest.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_params() {
        let forward = sign_params(&[("public_id", "abc"), ("timestamp", "1315060510")], "secret");
        let backward = sign_params(&[("timestamp", "1315060510"), ("public_id", "abc")], "secret");
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 40);
    }

    #[test]
    fn signature_matches_known_digest() {
        // sha1("public_id=sample_image&timestamp=1315060510abcd")
        let signature = sign_params(
            &[("timestamp", "1315060510"), ("public_id", "sample_image")],
            "abcd",
        );
        assert_eq!(signature, "b4ad47fb4e25c7bf5f92a20089f9db59bc302313");
    }

    #[tokio::test]
    async fn unconfigured_host_fails() {
        let host = UnconfiguredHost;
        assert!(host.upload("a.jpg".into(), Bytes::from_static(b"x")).await.is_err());
        assert!(host.destroy("abc".into()).await.is_err());
    }
}
