//! Classified failures.
//!
//! Every public operation returns `Result<T, ClientError>`. The `kind` is the
//! classification callers branch on; `code` is the platform code that produced
//! it (or the fixed internal code for client-side failures).

use crate::response::codes;

/// Failure classes, keyed off the platform response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Token missing, expired, or rejected
    NotLoggedIn,
    /// Request rejected as malformed (includes oversize uploads)
    BadRequest,
    /// Dataset, file, or resource does not exist
    NotFound,
    /// Platform failed while handling the request
    ServerError,
    /// Platform (or local read) ran out of memory
    OutOfMemory,
    /// Connection, timeout, DNS, or unreadable/non-JSON response
    Network,
    /// Any code this client does not recognize
    Unknown,
}

impl ErrorKind {
    /// Classify a platform failure code. Success codes are not failures and
    /// classify as `Unknown` if they ever reach here.
    pub fn from_code(code: &str) -> Self {
        match code {
            codes::NOT_LOGGED_IN => ErrorKind::NotLoggedIn,
            codes::BAD_REQUEST => ErrorKind::BadRequest,
            codes::NOT_FOUND => ErrorKind::NotFound,
            codes::SERVER_ERROR => ErrorKind::ServerError,
            codes::OUT_OF_MEMORY => ErrorKind::OutOfMemory,
            _ => ErrorKind::Unknown,
        }
    }

    /// Canonical platform code for this class.
    pub fn default_code(&self) -> &'static str {
        match self {
            ErrorKind::NotLoggedIn => codes::NOT_LOGGED_IN,
            ErrorKind::BadRequest => codes::BAD_REQUEST,
            ErrorKind::NotFound => codes::NOT_FOUND,
            ErrorKind::ServerError | ErrorKind::Network | ErrorKind::Unknown => codes::SERVER_ERROR,
            ErrorKind::OutOfMemory => codes::OUT_OF_MEMORY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotLoggedIn => "not_logged_in",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ServerError => "server_error",
            ErrorKind::OutOfMemory => "out_of_memory",
            ErrorKind::Network => "network",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure from any client operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ClientError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.default_code().to_string(),
            message: message.into(),
            cause: None,
        }
    }

    /// Failure reported by the platform, classified by its code.
    pub fn from_platform(code: &str, message: impl Into<String>, cause: Option<String>) -> Self {
        Self {
            kind: ErrorKind::from_code(code),
            code: code.to_string(),
            message: message.into(),
            cause,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Prefix the message with the failing operation, keeping kind, code and cause.
    pub fn context(mut self, operation: &str) -> Self {
        self.message = format!("{}: {}", operation, self.message);
        self
    }

    /// Whether a caller-supplied retry policy may repeat the call.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::ServerError)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::NotLoggedIn => write!(f, "Not logged in: {}", self.message)?,
            ErrorKind::Network => write!(f, "Network error: {}", self.message)?,
            _ => write!(f, "{} ({}): {}", self.kind, self.code, self.message)?,
        }
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ClientError {}
