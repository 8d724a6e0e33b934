use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declared kind of an uploaded material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaterialType {
    Image,
    Video,
}

impl MaterialType {
    /// `video/*` is a video, everything else is treated as an image
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.to_ascii_lowercase().starts_with("video/") {
            Self::Video
        } else {
            Self::Image
        }
    }

    /// Parse a wire name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "IMAGE" => Some(Self::Image),
            "VIDEO" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application credentials for signed calls
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub access_token: Option<String>,
    pub method: String,
}

/// Material reference extracted from an upload response
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMaterial {
    pub url: Option<String>,
    pub material_id: Option<String>,
    /// The parsed response body as received
    pub raw: Value,
}

impl UploadedMaterial {
    /// Normalize an upload response.
    ///
    /// `url` and `materialId` are read from the top level first and from the
    /// nested `data` object second; a non-empty top-level value wins.
    pub fn from_response(raw: Value) -> Self {
        Self {
            url: lookup_field(&raw, "url"),
            material_id: lookup_field(&raw, "materialId"),
            raw,
        }
    }
}

fn lookup_field(raw: &Value, name: &str) -> Option<String> {
    scalar_text(raw.get(name)).or_else(|| scalar_text(raw.get("data").and_then(|d| d.get(name))))
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
