use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please fill in both title and content")]
    MissingFields,
    #[error("input is locked while a classification is in flight")]
    InputLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Network,
    Timeout,
    Status,
    Malformed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .status.map(|code| format!(" (HTTP {code})")).unwrap_or_default())]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ServiceError {
    fn new(kind: ServiceErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Network, None, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Timeout, None, message)
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Status, Some(code), message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Malformed, None, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Cancelled, None, message)
    }

    pub fn from_transport(operation: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("{operation} request timed out: {err}"))
        } else if err.is_decode() {
            Self::malformed(format!("{operation} response could not be read: {err}"))
        } else {
            Self::network(format!("{operation} request failed: {err}"))
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ServiceErrorKind::Network | ServiceErrorKind::Timeout
        ) || self.status.is_some_and(|code| code == 503 || code == 502)
    }
}
