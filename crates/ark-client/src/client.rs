use std::time::Duration;

use ark_signature::{sign, SignablePayload};
use base64::Engine;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ArkError;
use crate::types::{Credentials, MaterialType, UploadedMaterial};

pub const DEFAULT_ENDPOINT: &str = "https://ark.xiaohongshu.com/ark/open_api/v3/common_controller";
pub const DEFAULT_METHOD: &str = "uploadMaterial";
pub const API_VERSION: &str = "2.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Client for the ark `common_controller` endpoint
pub struct ArkClient {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<Credentials>,
}

impl ArkClient {
    /// Create a client against the production endpoint
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, credentials)
    }

    /// Create a client against a custom endpoint
    pub fn with_endpoint(endpoint: &str, credentials: Option<Credentials>) -> Self {
        Self::with_endpoint_and_timeout(endpoint, credentials, DEFAULT_TIMEOUT)
    }

    /// Create a client against a custom endpoint with a custom request timeout
    pub fn with_endpoint_and_timeout(
        endpoint: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            credentials,
        }
    }

    /// Whether real signed uploads are possible
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload one material and return the normalized reference.
    ///
    /// A 2xx JSON body always yields `Ok`, even when it carries no material
    /// URL; callers decide whether that is usable.
    pub async fn upload_material(
        &self,
        name: &str,
        material_type: MaterialType,
        content: &[u8],
    ) -> crate::Result<UploadedMaterial> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ArkError::MissingCredentials)?;

        let timestamp = Utc::now().timestamp();
        let payload = signed_payload(credentials, name, material_type, content, timestamp);
        let body = serde_json::to_string(&payload)?;

        debug!(
            endpoint = %self.endpoint,
            name,
            material_type = %material_type,
            size = content.len(),
            "Uploading material"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, body = %text, "Ark upload rejected");
            return Err(ArkError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let raw: Value = serde_json::from_str(&text).map_err(|_| {
            warn!(body = %text, "Ark upload returned a non-JSON body");
            ArkError::MalformedResponse(text.clone())
        })?;

        let material = UploadedMaterial::from_response(raw);
        info!(
            url = material.url.as_deref().unwrap_or(""),
            material_id = material.material_id.as_deref().unwrap_or(""),
            "Ark upload completed"
        );
        Ok(material)
    }
}

/// Build the upload payload, including its `sign` field
pub(crate) fn signed_payload(
    credentials: &Credentials,
    name: &str,
    material_type: MaterialType,
    content: &[u8],
    timestamp: i64,
) -> SignablePayload {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);

    let mut payload = SignablePayload::new();
    payload.insert("name".into(), Value::from(name));
    payload.insert("type".into(), Value::from(material_type.as_str()));
    payload.insert("materialContent".into(), Value::from(vec![encoded]));
    payload.insert("timestamp".into(), Value::from(timestamp.to_string()));
    payload.insert("appId".into(), Value::from(credentials.app_id.as_str()));
    payload.insert("version".into(), Value::from(API_VERSION));
    payload.insert("method".into(), Value::from(credentials.method.as_str()));
    if let Some(ref token) = credentials.access_token {
        payload.insert("accessToken".into(), Value::from(token.as_str()));
    }

    let signature = sign(&payload, &credentials.app_secret);
    payload.insert("sign".into(), Value::from(signature));
    payload
}
