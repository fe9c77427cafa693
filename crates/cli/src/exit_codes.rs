//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `fedlink` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                  |
//! |---------|-----------|----------------------------------------------|
//! | 0       | Universal | Success                                      |
//! | 2       | Universal | CLI usage error (bad args, invalid values)   |
//! | 3       | Universal | Local I/O error (stdout, output file)        |
//! | 40-49   | platform  | Classified platform API failures             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `platform_exit_code` if it comes from the client

use fedlink_client::{ClientError, ErrorKind};

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Local I/O error - cannot write stdout or a local file.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Platform (40-49)
// =============================================================================

/// Token rejected or expired (E0000000001, HTTP 401/403).
pub const EXIT_NOT_LOGGED_IN: u8 = 40;

/// Request rejected as invalid (E0000000400), including local validation
/// such as the upload size limit.
pub const EXIT_BAD_REQUEST: u8 = 41;

/// Resource not found (E0000000404), including missing local files.
pub const EXIT_NOT_FOUND: u8 = 42;

/// Platform-side failure (E0000000500) or local processing failure
/// during export.
pub const EXIT_SERVER_ERROR: u8 = 43;

/// Out of memory (E0000000507).
pub const EXIT_OUT_OF_MEMORY: u8 = 44;

/// Transport failure: connection refused, timeout, unparsable response.
pub const EXIT_NETWORK: u8 = 45;

/// Platform failure with an unrecognized code.
pub const EXIT_UNKNOWN: u8 = 46;

/// No token provided (neither flag, env var, nor config file).
pub const EXIT_MISSING_TOKEN: u8 = 47;

// =============================================================================
// Client Error Mapping
// =============================================================================

/// Map a client error class to its exit code.
pub fn platform_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotLoggedIn => EXIT_NOT_LOGGED_IN,
        ErrorKind::BadRequest => EXIT_BAD_REQUEST,
        ErrorKind::NotFound => EXIT_NOT_FOUND,
        ErrorKind::ServerError => EXIT_SERVER_ERROR,
        ErrorKind::OutOfMemory => EXIT_OUT_OF_MEMORY,
        ErrorKind::Network => EXIT_NETWORK,
        ErrorKind::Unknown => EXIT_UNKNOWN,
    }
}

/// Structured error output for `--json` mode.
/// Printed to stderr so stdout stays parseable.
#[derive(Debug, serde::Serialize)]
pub struct PlatformErrorOutput {
    pub error: &'static str,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    pub exit_code: u8,
}

impl PlatformErrorOutput {
    pub fn from_client_error(err: &ClientError) -> Self {
        Self {
            error: err.kind.as_str(),
            code: err.code.clone(),
            message: err.message.clone(),
            cause: err.cause.clone(),
            exit_code: platform_exit_code(err.kind),
        }
    }

    /// Print as a single JSON line on stderr.
    pub fn print(&self) {
        if let Ok(output) = serde_json::to_string(self) {
            eprintln!("{}", output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_distinct_code() {
        let kinds = [
            ErrorKind::NotLoggedIn,
            ErrorKind::BadRequest,
            ErrorKind::NotFound,
            ErrorKind::ServerError,
            ErrorKind::OutOfMemory,
            ErrorKind::Network,
            ErrorKind::Unknown,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| platform_exit_code(*k)).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|c| (40..=49).contains(c)));
        assert!(!codes.contains(&EXIT_MISSING_TOKEN));
    }

    #[test]
    fn test_json_output_shape() {
        let err = ClientError::from_platform("E0000000001", "用户未登录", None);
        let out = PlatformErrorOutput::from_client_error(&err);
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["error"], "not_logged_in");
        assert_eq!(v["code"], "E0000000001");
        assert_eq!(v["exit_code"], 40);
        assert!(v.get("cause").is_none());
    }
}
