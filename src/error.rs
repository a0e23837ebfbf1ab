//! Error taxonomy shared by every layer of the weather client
use std::fmt;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed set of failure kinds reported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    MissingMacAddress,
    InvalidResponseFormat,
    Timeout,
    Network,
    Unauthorized,
    Forbidden,
    RateLimitExceeded,
    ServerError,
    BadRequest,
    AllRequestsFailed,
    FetchDevices,
    FetchDeviceData,
    Unknown,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::MissingMacAddress => "MISSING_MAC_ADDRESS",
            ErrorKind::InvalidResponseFormat => "INVALID_RESPONSE_FORMAT",
            ErrorKind::Timeout => "TIMEOUT_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::AllRequestsFailed => "ALL_REQUESTS_FAILED",
            ErrorKind::FetchDevices => "FETCH_DEVICES_ERROR",
            ErrorKind::FetchDeviceData => "FETCH_DEVICE_DATA_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AmbientError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

pub type Result<T> = std::result::Result<T, AmbientError>;

impl AmbientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        AmbientError {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AmbientError::new(ErrorKind::Configuration, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Error produced from an HTTP response status.
    ///
    /// 401 and 403 reject the credential, 429 and 5xx are transient, 400 is a
    /// malformed request. Anything else is tagged `Unknown` with the status kept.
    pub fn from_status(status: u16) -> Self {
        let (kind, message) = match status {
            401 => (ErrorKind::Unauthorized, "Invalid API key or application key."),
            403 => (
                ErrorKind::Forbidden,
                "Access forbidden. Please check your permissions.",
            ),
            429 => (
                ErrorKind::RateLimitExceeded,
                "Rate limit exceeded. Please wait a moment and try again.",
            ),
            s if s >= 500 => (ErrorKind::ServerError, "Server error. Please try again later."),
            400 => (
                ErrorKind::BadRequest,
                "Bad request. Please check your parameters.",
            ),
            _ => (ErrorKind::Unknown, "An unknown error occurred"),
        };
        AmbientError::new(kind, message).with_status(status)
    }

    /// Whether the failure is bound to the credential that was used.
    ///
    /// Retrying with the same key pair cannot succeed.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self.kind, ErrorKind::Unauthorized | ErrorKind::Forbidden)
    }

    /// Re-tag a failure for the calling layer.
    ///
    /// Errors that already carry a transport or contract kind pass through
    /// unchanged; `Unknown` failures are wrapped in `kind` with the original
    /// kept as the source.
    pub fn or_wrap(self, kind: ErrorKind, message: impl Into<String>) -> Self {
        if self.kind != ErrorKind::Unknown {
            return self;
        }
        AmbientError::new(kind, message).with_source(self)
    }
}
