//! Response types for the material relay

use crate::publish::{MaterialUpload, PublishMode, Published};
use ark_client::MaterialType;
use ephemeral_material_cache::CacheStats;
use serde::{Deserialize, Serialize};

/// Query for the fetch-and-upload route
#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub img: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub material_type: Option<String>,
}

/// Uploaded file description echoed back to the caller
#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub originalname: String,
    pub mimetype: String,
    pub size: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
}

/// Response of the upload-and-link route
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLinkResponse {
    pub success: bool,
    pub is_demo: bool,
    pub mode: PublishMode,
    pub file_info: FileInfo,
    pub material_url: String,
    pub material_id: Option<String>,
    pub deep_link: String,
    /// QR landing page, only for cached materials
    pub jump_url: Option<String>,
    /// PNG data URL of a QR code for the deep link
    pub qr_code: Option<String>,
}

impl UploadLinkResponse {
    pub fn new(
        file_info: FileInfo,
        published: Published,
        jump_url: Option<String>,
        qr_code: Option<String>,
    ) -> Self {
        Self {
            success: true,
            is_demo: published.mode.is_demo(),
            mode: published.mode,
            file_info,
            material_url: published.material_url,
            material_id: published.material_id,
            deep_link: published.deep_link,
            jump_url,
            qr_code,
        }
    }
}

/// Query for the QR rendering route
#[derive(Debug, Deserialize)]
pub struct QrQuery {
    pub url: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub success: bool,
    pub qr_code: String,
    pub url: String,
}

impl From<&MaterialUpload> for FileInfo {
    fn from(upload: &MaterialUpload) -> Self {
        Self {
            originalname: upload.original_name.clone(),
            mimetype: upload.mime_type.clone(),
            size: upload.size(),
            name: upload.display_name.clone(),
            material_type: upload.material_type(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    /// `upstream` when credentials are configured, `demo` otherwise
    pub mode: PublishMode,
    pub cache: CacheStats,
}
