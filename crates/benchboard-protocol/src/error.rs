/// Errors surfaced while loading and presenting benchmark data.
///
/// `Fetch` and `Status` together cover transport failures; callers treat
/// both as "the resource could not be retrieved". `ProbeNotFound` is an
/// expected absence rather than a fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("fetch failed for {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("no recorded data at {path}")]
    ProbeNotFound { path: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),
}

impl BoardError {
    pub fn parse(path: &str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }

    /// True for network failures and non-success statuses.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Status { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Status { status: 404, .. } | Self::ProbeNotFound { .. }
        )
    }
}
