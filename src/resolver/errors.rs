use reqwest::StatusCode;
use thiserror::Error;

/// Failure reported by an [`HttpTransport`](crate::resolver::HttpTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("too many redirects")]
    Redirect,

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("request interrupted")]
    Interrupted,

    #[error("io error: {0}")]
    Io(String),
}

impl TransportError {
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_redirect() {
            Self::Redirect
        } else if err.is_connect() || err.is_request() {
            Self::Connect(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("resource not found (http {status})")]
    NotFound { status: StatusCode },

    #[error("{}", unreachable_message(.status, .reason))]
    Unreachable {
        status: Option<StatusCode>,
        reason: String,
    },

    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("failed to fetch content: {0}")]
    FetchFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("retrieval interrupted")]
    Interrupted,
}

impl From<url::ParseError> for RetrievalError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

fn unreachable_message(status: &Option<StatusCode>, reason: &str) -> String {
    match status {
        Some(status) => format!("unexpected status {}: {}", status.as_u16(), reason),
        None => format!("unreachable: {reason}"),
    }
}

/// Flat discriminant of [`RetrievalError`], convenient for callers that only
/// branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalErrorKind {
    InvalidUrl,
    NotFound,
    UnreachableOrUnexpectedStatus,
    UnsupportedContentType,
    FetchFailed,
    Timeout,
    Interrupted,
}

impl RetrievalError {
    pub fn kind(&self) -> RetrievalErrorKind {
        match self {
            Self::InvalidUrl(_) => RetrievalErrorKind::InvalidUrl,
            Self::NotFound { .. } => RetrievalErrorKind::NotFound,
            Self::Unreachable { .. } => RetrievalErrorKind::UnreachableOrUnexpectedStatus,
            Self::UnsupportedContentType(_) => RetrievalErrorKind::UnsupportedContentType,
            Self::FetchFailed(_) => RetrievalErrorKind::FetchFailed,
            Self::Timeout => RetrievalErrorKind::Timeout,
            Self::Interrupted => RetrievalErrorKind::Interrupted,
        }
    }

    /// HTTP status that caused the failure, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { status } => Some(*status),
            Self::Unreachable { status, .. } => *status,
            _ => None,
        }
    }

    pub fn should_retry(&self) -> bool {
        match self {
            // Fatal errors - don't retry
            Self::InvalidUrl(_) => false,
            Self::NotFound { .. } => false,
            Self::UnsupportedContentType(_) => false,
            Self::Interrupted => false,
            Self::Unreachable {
                status: Some(status),
                ..
            } => status.is_server_error(),

            // Temporary errors - retry
            Self::Unreachable { status: None, .. } => true,
            Self::FetchFailed(_) => true,
            Self::Timeout => true,
        }
    }

    /// Failure of the header-only probe.
    pub(crate) fn from_probe(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::Timeout,
            TransportError::Interrupted => Self::Interrupted,
            other => Self::Unreachable {
                status: None,
                reason: other.to_string(),
            },
        }
    }

    /// Failure of the follow-up content fetch.
    pub(crate) fn from_fetch(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::Timeout,
            TransportError::Interrupted => Self::Interrupted,
            other => Self::FetchFailed(other.to_string()),
        }
    }
}
