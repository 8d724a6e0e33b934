//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Material handed to the cache for storage
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
    pub display_name: String,
}

/// A stored material, returned by a successful take
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
    pub size_bytes: u64,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub(crate) fn new(id: String, material: NewMaterial) -> Self {
        Self {
            id,
            size_bytes: material.bytes.len() as u64,
            bytes: material.bytes,
            mime_type: material.mime_type,
            original_name: material.original_name,
            display_name: material.display_name,
            created_at: Utc::now(),
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}
