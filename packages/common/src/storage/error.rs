use std::fmt;

/// Errors raised by a single storage tier.
#[derive(Debug)]
pub enum TierError {
    /// The requested object was not found in this tier.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The key cannot be mapped to a location in this tier.
    InvalidKey(String),
    /// The remote object store rejected the request or could not be reached.
    Remote(String),
    /// The key-to-name lookup backing the local layout failed.
    Lookup(String),
}

impl TierError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl fmt::Display for TierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "object not found: {key}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidKey(msg) => write!(f, "invalid object key: {msg}"),
            Self::Remote(msg) => write!(f, "remote store error: {msg}"),
            Self::Lookup(msg) => write!(f, "local name lookup failed: {msg}"),
        }
    }
}

impl std::error::Error for TierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TierError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
