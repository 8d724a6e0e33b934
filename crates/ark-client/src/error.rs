use std::fmt;

/// Errors from the ark client
#[derive(Debug)]
pub enum ArkError {
    /// App id or secret missing; real uploads need both
    MissingCredentials,
    /// Transport failure or timeout
    Http(reqwest::Error),
    /// Upstream answered with a non-2xx status
    Status { status: u16, body: String },
    /// Upstream body was not JSON; carried verbatim
    MalformedResponse(String),
    Serialization(serde_json::Error),
}

impl ArkError {
    /// Whether this is a configuration problem rather than an upstream one
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredentials)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

impl fmt::Display for ArkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => {
                write!(f, "Configuration error: XHS_APP_ID or XHS_APP_SECRET is not set")
            }
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Status { status, body } => write!(f, "Upstream returned status {status}: {body}"),
            Self::MalformedResponse(body) => write!(f, "Malformed upstream response: {body}"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for ArkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ArkError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<serde_json::Error> for ArkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }
}

pub type Result<T> = std::result::Result<T, ArkError>;
