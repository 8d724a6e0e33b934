use ark_client::{Credentials, DEFAULT_ENDPOINT, DEFAULT_METHOD};
use std::env;

pub const DEFAULT_PUBLISH_SCHEME: &str = "xhsdiscover://creation?materialUrl={url}";
pub const DEFAULT_FALLBACK_STORE_URL: &str =
    "https://apps.apple.com/cn/search?term=%E5%B0%8F%E7%BA%A2%E4%B9%A6";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Relay configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub base_url: String,
    pub ark_endpoint: String,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub access_token: Option<String>,
    pub upload_method: String,
    /// Deep-link template with `{url}` and `{materialId}` placeholders
    pub publish_scheme: String,
    pub fallback_store_url: String,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary variable source.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = var("BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            port,
            base_url,
            ark_endpoint: var("XHS_API_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            app_id: var("XHS_APP_ID"),
            app_secret: var("XHS_APP_SECRET"),
            access_token: var("XHS_ACCESS_TOKEN"),
            upload_method: var("XHS_METHOD_UPLOAD").unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            publish_scheme: var("XHS_PUBLISH_SCHEME")
                .unwrap_or_else(|| DEFAULT_PUBLISH_SCHEME.to_string()),
            fallback_store_url: var("FALLBACK_APPSTORE_URL")
                .unwrap_or_else(|| DEFAULT_FALLBACK_STORE_URL.to_string()),
        }
    }

    /// Signing credentials, present only when both app id and secret are set
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.app_id, &self.app_secret) {
            (Some(app_id), Some(app_secret)) => Some(Credentials {
                app_id: app_id.clone(),
                app_secret: app_secret.clone(),
                access_token: self.access_token.clone(),
                method: self.upload_method.clone(),
            }),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
