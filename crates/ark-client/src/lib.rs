//! Xiaohongshu Ark Material Upload Client
//!
//! Builds the signed `uploadMaterial` payload, posts it with a bounded
//! timeout, and normalizes the material reference out of the response.

mod client;
mod error;
mod types;

pub use client::{ArkClient, API_VERSION, DEFAULT_ENDPOINT, DEFAULT_METHOD, DEFAULT_TIMEOUT};
pub use error::{ArkError, Result};
pub use types::{Credentials, MaterialType, UploadedMaterial};
