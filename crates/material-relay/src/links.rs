//! Deep-link and callback URL construction

use crate::config::Config;
use base64::Engine;

/// Settings for building links handed to the app
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub publish_scheme: String,
    pub base_url: String,
    pub fallback_store_url: String,
}

impl LinkSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            publish_scheme: config.publish_scheme.clone(),
            base_url: config.base_url.clone(),
            fallback_store_url: config.fallback_store_url.clone(),
        }
    }

    /// Fill the publish scheme's `{url}` and `{materialId}` placeholders
    pub fn deep_link(&self, material_url: &str, material_id: &str) -> String {
        self.publish_scheme
            .replace("{url}", &urlencoding::encode(material_url))
            .replace("{materialId}", &urlencoding::encode(material_id))
    }

    /// URL at which a cached material can be claimed once
    pub fn callback_url(&self, id: &str) -> String {
        format!(
            "{}/material/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(id)
        )
    }

    /// Landing page for a cached material, meant to be opened from a QR code
    pub fn jump_url(&self, id: &str) -> String {
        format!(
            "{}/jump/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(id)
        )
    }
}

/// Inline `data:` URL carrying the material itself
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
