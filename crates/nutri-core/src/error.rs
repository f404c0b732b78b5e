use thiserror::Error;

pub const NETWORK_ERROR_TEXT: &str = "Network error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Unauthorized,
    Validation,
    NotFound,
    Server,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Unauthorized => "unauthorized",
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::Server => "server",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },
}

impl ApiFailure {
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 | 403 => Self::Unauthorized(detail),
            404 => Self::NotFound(detail),
            400..=499 => Self::Validation(detail),
            _ => Self::Server { status, detail },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::Unauthorized(_) => FailureKind::Unauthorized,
            Self::Validation(_) => FailureKind::Validation,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Server { .. } => FailureKind::Server,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Network(detail)
            | Self::Unauthorized(detail)
            | Self::Validation(detail)
            | Self::NotFound(detail)
            | Self::Server { detail, .. } => detail.as_str(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    // Transport failures always read the same; otherwise the backend's
    // detail wins over the caller's generic text.
    pub fn user_message(&self, fallback: &str) -> String {
        if self.is_network() {
            return NETWORK_ERROR_TEXT.to_string();
        }
        let detail = self.detail().trim();
        if detail.is_empty() {
            fallback.to_string()
        } else {
            detail.to_string()
        }
    }
}
