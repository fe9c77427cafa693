//! Per-client connection settings.
//!
//! A `ClientSession` is fixed for the life of a client. Reconfiguring means
//! building a new session and a new client; nothing here is global.

use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USERNAME: &str = "admin007";
pub const DEFAULT_ENGINE_TAG: &str = "蓝象-联邦学习:1.0.0";
pub const DEFAULT_METHOD_SUFFIX: &str =
    ".0001100000000000000000000000000000000.lx0000000000000.trustbe.net";

/// Immutable connection settings for one client instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSession {
    token: String,
    base_url: String,
    namespace_id: String,
    username: String,
    timeout: Duration,
    method_suffix: String,
}

impl ClientSession {
    /// Session with default namespace, username, timeout and suffix.
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into(),
            namespace_id: String::new(),
            username: DEFAULT_USERNAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
            method_suffix: DEFAULT_METHOD_SUFFIX.to_string(),
        }
    }

    pub fn builder(token: impl Into<String>, base_url: impl Into<String>) -> SessionBuilder {
        SessionBuilder {
            session: Self::new(token, base_url),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn namespace_id(&self) -> &str {
        &self.namespace_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn method_suffix(&self) -> &str {
        &self.method_suffix
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// Token with everything but the last four characters masked.
    pub fn redacted_token(&self) -> String {
        redact(&self.token)
    }

    /// Use the caller's namespace when given, else the session default.
    pub(crate) fn namespace_or<'a>(&'a self, namespace_id: Option<&'a str>) -> &'a str {
        namespace_id.unwrap_or(&self.namespace_id)
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("token", &self.redacted_token())
            .field("base_url", &self.base_url)
            .field("namespace_id", &self.namespace_id)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for [`ClientSession`]; `build` validates the endpoint address.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    session: ClientSession,
}

impl SessionBuilder {
    pub fn namespace_id(mut self, namespace_id: impl Into<String>) -> Self {
        self.session.namespace_id = namespace_id.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.session.username = username.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.session.timeout = timeout;
        self
    }

    pub fn method_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.session.method_suffix = suffix.into();
        self
    }

    pub fn build(self) -> Result<ClientSession, ClientError> {
        let url = self.session.base_url.trim();
        if url.is_empty() {
            return Err(ClientError::bad_request("base URL is empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::bad_request(format!(
                "base URL must start with http:// or https:// (got '{}')",
                url
            )));
        }
        if self.session.timeout.is_zero() {
            return Err(ClientError::bad_request("timeout must be greater than zero"));
        }
        Ok(self.session)
    }
}

/// Mask a secret for display, keeping only its last four characters.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return "(not set)".to_string();
    }
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
