//! Upload-and-link flow
//!
//! A material either goes to the ark API (`Upstream`), or lands in the
//! single-use cache and is referenced through a callback URL: `Demo` when no
//! credentials are configured, `Fallback` when the upstream upload failed.

use crate::error::Result;
use crate::links::LinkSettings;
use ark_client::{ArkClient, ArkError, MaterialType};
use ephemeral_material_cache::{MaterialCache, NewMaterial};
use serde::Serialize;
use tracing::{info, warn};

/// How a material reference was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    Upstream,
    Fallback,
    Demo,
}

impl PublishMode {
    /// Anything other than a real upstream upload
    pub fn is_demo(&self) -> bool {
        !matches!(self, PublishMode::Upstream)
    }

    fn cache_tag(&self) -> &'static str {
        match self {
            PublishMode::Upstream => "material",
            PublishMode::Fallback => "fallback",
            PublishMode::Demo => "demo",
        }
    }
}

/// A material received from a caller
#[derive(Debug, Clone)]
pub struct MaterialUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
    pub display_name: String,
}

impl MaterialUpload {
    pub fn material_type(&self) -> MaterialType {
        MaterialType::from_mime(&self.mime_type)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Result of publishing a material
#[derive(Debug, Clone)]
pub struct Published {
    pub mode: PublishMode,
    pub material_type: MaterialType,
    pub material_url: String,
    pub material_id: Option<String>,
    pub deep_link: String,
}

pub struct Publisher {
    ark: ArkClient,
    cache: MaterialCache,
    links: LinkSettings,
}

impl Publisher {
    pub fn new(ark: ArkClient, cache: MaterialCache, links: LinkSettings) -> Self {
        Self { ark, cache, links }
    }

    pub fn cache(&self) -> &MaterialCache {
        &self.cache
    }

    pub fn links(&self) -> &LinkSettings {
        &self.links
    }

    pub fn has_credentials(&self) -> bool {
        self.ark.has_credentials()
    }

    /// Upload to the ark API, surfacing transport and status failures.
    ///
    /// A 2xx response without a material URL, or one that is not JSON at
    /// all, still produces a link; the app shows its own error in that case.
    pub async fn upload(
        &self,
        name: &str,
        material_type: MaterialType,
        bytes: &[u8],
    ) -> Result<Published> {
        let (material_url, material_id) =
            match self.ark.upload_material(name, material_type, bytes).await {
                Ok(material) => {
                    let material_url = material.url.unwrap_or_else(|| {
                        warn!(response = %material.raw, "Ark response carried no material URL");
                        String::new()
                    });
                    (material_url, material.material_id)
                }
                Err(ArkError::MalformedResponse(body)) => {
                    warn!(body = %body, "Ark response was not JSON, linking without a material URL");
                    (String::new(), None)
                }
                Err(e) => return Err(e.into()),
            };
        let deep_link = self
            .links
            .deep_link(&material_url, material_id.as_deref().unwrap_or(""));

        Ok(Published {
            mode: PublishMode::Upstream,
            material_type,
            material_url,
            material_id,
            deep_link,
        })
    }

    /// Upload to the ark API when possible, otherwise park the material in
    /// the cache and link to its callback URL. Never fails.
    pub async fn upload_and_link(&self, upload: MaterialUpload) -> Published {
        let material_type = upload.material_type();

        if !self.has_credentials() {
            info!(name = %upload.display_name, "No ark credentials, using demo mode");
            return self.park(PublishMode::Demo, upload).await;
        }

        match self
            .ark
            .upload_material(&upload.display_name, material_type, &upload.bytes)
            .await
        {
            Ok(material) => match material.url {
                Some(material_url) => {
                    let material_id = material.material_id;
                    let deep_link = self
                        .links
                        .deep_link(&material_url, material_id.as_deref().unwrap_or(""));
                    Published {
                        mode: PublishMode::Upstream,
                        material_type,
                        material_url,
                        material_id,
                        deep_link,
                    }
                }
                None => {
                    warn!(response = %material.raw, "Ark response carried no material URL, falling back");
                    self.park(PublishMode::Fallback, upload).await
                }
            },
            Err(e) => {
                warn!(error = %e, "Ark upload failed, falling back");
                self.park(PublishMode::Fallback, upload).await
            }
        }
    }

    async fn park(&self, mode: PublishMode, upload: MaterialUpload) -> Published {
        let material_type = upload.material_type();
        let id = self
            .cache
            .put_tagged(
                mode.cache_tag(),
                NewMaterial {
                    bytes: upload.bytes,
                    mime_type: upload.mime_type,
                    original_name: upload.original_name,
                    display_name: upload.display_name,
                },
            )
            .await;

        let material_url = self.links.callback_url(&id);
        let deep_link = self.links.deep_link(&material_url, &id);

        Published {
            mode,
            material_type,
            material_url,
            material_id: Some(id),
            deep_link,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ark_client::Credentials;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    pub(crate) fn links() -> LinkSettings {
        LinkSettings {
            publish_scheme: "xhsdiscover://creation?materialUrl={url}".to_string(),
            base_url: "http://relay.test".to_string(),
            fallback_store_url: "https://apps.example/".to_string(),
        }
    }

    pub(crate) fn credentials() -> Credentials {
        Credentials {
            app_id: "app-1".to_string(),
            app_secret: "secret".to_string(),
            access_token: None,
            method: "uploadMaterial".to_string(),
        }
    }

    pub(crate) fn upload(mime_type: &str) -> MaterialUpload {
        MaterialUpload {
            bytes: b"material bytes".to_vec(),
            mime_type: mime_type.to_string(),
            original_name: "photo.png".to_string(),
            display_name: "Photo".to_string(),
        }
    }

    /// Serve a single canned HTTP response on a random local port and
    /// return the endpoint URL.
    pub(crate) async fn mock_ark(status_code: u16, body: &'static str) -> String {
        let (endpoint, _request) = recording_ark(status_code, body).await;
        endpoint
    }

    /// Like `mock_ark`, also handing back the raw request it received
    pub(crate) async fn recording_ark(
        status_code: u16,
        body: &'static str,
    ) -> (String, oneshot::Receiver<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = drain_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status_code} OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            let _ = tx.send(request);
        });

        (format!("http://127.0.0.1:{port}/ark"), rx)
    }

    /// Accept one connection and never answer
    async fn hanging_ark() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            drain_request(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        format!("http://127.0.0.1:{port}/ark")
    }

    /// Read one request and return its body
    async fn drain_request(stream: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return buf;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return buf.split_off(header_end + 4);
            }
        }
    }

    fn publisher(ark: ArkClient) -> Publisher {
        Publisher::new(ark, MaterialCache::new(), links())
    }

    #[test]
    fn test_publish_mode_is_demo() {
        assert!(!PublishMode::Upstream.is_demo());
        assert!(PublishMode::Fallback.is_demo());
        assert!(PublishMode::Demo.is_demo());
        assert_eq!(serde_json::to_string(&PublishMode::Fallback).unwrap(), "\"fallback\"");
    }

    #[test]
    fn test_material_upload_type() {
        assert_eq!(upload("video/mp4").material_type(), MaterialType::Video);
        assert_eq!(upload("image/png").material_type(), MaterialType::Image);
    }

    #[tokio::test]
    async fn test_demo_mode_without_credentials() {
        let publisher = publisher(ArkClient::with_endpoint("http://127.0.0.1:9", None));

        let published = publisher.upload_and_link(upload("image/png")).await;

        assert_eq!(published.mode, PublishMode::Demo);
        let id = published.material_id.clone().unwrap();
        assert!(id.starts_with("demo_"));
        assert_eq!(published.material_url, format!("http://relay.test/material/{id}"));
        assert!(published
            .deep_link
            .starts_with("xhsdiscover://creation?materialUrl=http%3A%2F%2Frelay.test%2Fmaterial%2F"));

        let entry = publisher.cache().take(&id).await.unwrap();
        assert_eq!(entry.bytes, b"material bytes");
        assert_eq!(entry.display_name, "Photo");
    }

    #[tokio::test]
    async fn test_upstream_success() {
        let endpoint = mock_ark(200, r#"{"data":{"url":"https://cdn.example/m.png","materialId":"m-1"}}"#).await;
        let publisher = publisher(ArkClient::with_endpoint(&endpoint, Some(credentials())));

        let published = publisher.upload_and_link(upload("image/png")).await;

        assert_eq!(published.mode, PublishMode::Upstream);
        assert_eq!(published.material_url, "https://cdn.example/m.png");
        assert_eq!(published.material_id.as_deref(), Some("m-1"));
        assert_eq!(
            published.deep_link,
            "xhsdiscover://creation?materialUrl=https%3A%2F%2Fcdn.example%2Fm.png"
        );
        assert_eq!(publisher.cache().stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_fallback_on_server_error() {
        let endpoint = mock_ark(500, r#"{"error":"internal"}"#).await;
        let publisher = publisher(ArkClient::with_endpoint(&endpoint, Some(credentials())));

        let published = publisher.upload_and_link(upload("image/png")).await;

        assert_eq!(published.mode, PublishMode::Fallback);
        let id = published.material_id.unwrap();
        assert!(id.starts_with("fallback_"));
        assert_eq!(published.material_url, format!("http://relay.test/material/{id}"));
        assert!(publisher.cache().take(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_fallback_on_timeout() {
        let endpoint = hanging_ark().await;
        let publisher = publisher(ArkClient::with_endpoint_and_timeout(
            &endpoint,
            Some(credentials()),
            Duration::from_millis(200),
        ));

        let published = publisher.upload_and_link(upload("video/mp4")).await;

        assert_eq!(published.mode, PublishMode::Fallback);
        assert_eq!(published.material_type, MaterialType::Video);
        assert_eq!(publisher.cache().stats().await.entries, 1);
    }

    #[tokio::test]
    async fn test_fallback_when_url_missing() {
        let endpoint = mock_ark(200, r#"{"success":false,"msg":"invalid sign"}"#).await;
        let publisher = publisher(ArkClient::with_endpoint(&endpoint, Some(credentials())));

        let published = publisher.upload_and_link(upload("image/png")).await;

        assert_eq!(published.mode, PublishMode::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_on_malformed_body() {
        let endpoint = mock_ark(200, "<html>bad gateway</html>").await;
        let publisher = publisher(ArkClient::with_endpoint(&endpoint, Some(credentials())));

        let published = publisher.upload_and_link(upload("image/png")).await;

        assert_eq!(published.mode, PublishMode::Fallback);
    }

    #[tokio::test]
    async fn test_upload_surfaces_errors() {
        let endpoint = mock_ark(500, r#"{"error":"internal"}"#).await;
        let publisher = publisher(ArkClient::with_endpoint(&endpoint, Some(credentials())));

        let result = publisher.upload("Photo", MaterialType::Image, b"x").await;

        assert!(matches!(result, Err(crate::error::RelayError::Upstream(_))));
        assert_eq!(publisher.cache().stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_upload_requires_credentials() {
        let publisher = publisher(ArkClient::with_endpoint("http://127.0.0.1:9", None));

        let result = publisher.upload("Photo", MaterialType::Image, b"x").await;

        assert!(matches!(result, Err(crate::error::RelayError::Config(_))));
    }

    #[tokio::test]
    async fn test_upload_tolerates_missing_url() {
        let endpoint = mock_ark(200, r#"{"materialId":"m-7"}"#).await;
        let publisher = publisher(ArkClient::with_endpoint(&endpoint, Some(credentials())));

        let published = publisher
            .upload("Photo", MaterialType::Image, b"x")
            .await
            .unwrap();

        assert_eq!(published.mode, PublishMode::Upstream);
        assert_eq!(published.material_url, "");
        assert_eq!(published.material_id.as_deref(), Some("m-7"));
    }

    #[tokio::test]
    async fn test_upload_tolerates_non_json_body() {
        let endpoint = mock_ark(200, "<html>gateway says hi</html>").await;
        let publisher = publisher(ArkClient::with_endpoint(&endpoint, Some(credentials())));

        let published = publisher
            .upload("Photo", MaterialType::Image, b"x")
            .await
            .unwrap();

        assert_eq!(published.mode, PublishMode::Upstream);
        assert_eq!(published.material_url, "");
        assert!(published.material_id.is_none());
        assert_eq!(published.deep_link, "xhsdiscover://creation?materialUrl=");
        assert_eq!(publisher.cache().stats().await.entries, 0);
    }
}
