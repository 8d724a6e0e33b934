use std::fmt;

/// Errors from the material cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Never inserted, already taken, or expired
    NotFound(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Material not found or expired: {id}"),
        }
    }
}

impl std::error::Error for CacheError {}

pub type Result<T> = std::result::Result<T, CacheError>;
