// Resolved connection profile
//
// Each value is taken from the first layer that sets it:
// 1. Command-line flag
// 2. Environment variable (FEDLINK_TOKEN, etc.)
// 3. Config file
// 4. Built-in default
//
// Blank values count as unset at every layer.

use serde::Serialize;

pub use fedlink_client::{redact, DEFAULT_EXPORT_PAGE_SIZE, DEFAULT_USERNAME};

use crate::settings::Settings;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8865/janus/invoke/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = fedlink_client::DEFAULT_TIMEOUT.as_secs();

pub const ENV_BASE_URL: &str = "FEDLINK_BASE_URL";
pub const ENV_TOKEN: &str = "FEDLINK_TOKEN";
pub const ENV_NAMESPACE: &str = "FEDLINK_NAMESPACE";
pub const ENV_USERNAME: &str = "FEDLINK_USERNAME";
pub const ENV_TIMEOUT_SECS: &str = "FEDLINK_TIMEOUT_SECS";

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Flag,
    Environment,
    File,
    Default,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Flag => "flag",
            Source::Environment => "environment",
            Source::File => "file",
            Source::Default => "default",
        }
    }
}

/// A resolved value and its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Setting<T> {
    fn new(value: T, source: Source) -> Self {
        Self { value, source }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub namespace_id: Option<String>,
    pub username: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub base_url: Setting<String>,
    /// `None` when no layer provides a token
    pub token: Setting<Option<String>>,
    pub namespace_id: Setting<String>,
    pub username: Setting<String>,
    pub timeout_secs: Setting<u64>,
    /// `None` means the client's built-in suffix
    pub method_suffix: Setting<Option<String>>,
    pub export_page_size: Setting<u32>,
}

impl Profile {
    /// Resolve against the process environment.
    pub fn resolve(settings: &Settings, overrides: &Overrides) -> Self {
        Self::resolve_with(settings, overrides, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        settings: &Settings,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env_text = |name: &str| non_blank(env(name));

        let env_timeout = env_text(ENV_TIMEOUT_SECS).and_then(|raw| match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Some(secs),
            _ => {
                log::warn!("ignoring {}={:?}: expected a positive integer", ENV_TIMEOUT_SECS, raw);
                None
            }
        });

        Self {
            base_url: pick(
                non_blank(overrides.base_url.clone()),
                env_text(ENV_BASE_URL),
                non_blank(settings.base_url.clone()),
            )
            .unwrap_or_else(|| Setting::new(DEFAULT_BASE_URL.to_string(), Source::Default)),

            token: match pick(
                non_blank(overrides.token.clone()),
                env_text(ENV_TOKEN),
                non_blank(settings.token.clone()),
            ) {
                Some(s) => Setting::new(Some(s.value), s.source),
                None => Setting::new(None, Source::Default),
            },

            namespace_id: pick(
                non_blank(overrides.namespace_id.clone()),
                env_text(ENV_NAMESPACE),
                non_blank(settings.namespace_id.clone()),
            )
            .unwrap_or_else(|| Setting::new(String::new(), Source::Default)),

            username: pick(
                non_blank(overrides.username.clone()),
                env_text(ENV_USERNAME),
                non_blank(settings.username.clone()),
            )
            .unwrap_or_else(|| Setting::new(DEFAULT_USERNAME.to_string(), Source::Default)),

            timeout_secs: pick(
                overrides.timeout_secs.filter(|s| *s > 0),
                env_timeout,
                settings.timeout_secs.filter(|s| *s > 0),
            )
            .unwrap_or_else(|| Setting::new(DEFAULT_TIMEOUT_SECS, Source::Default)),

            // File-only: the suffix is a deployment constant, not a per-run knob
            method_suffix: match settings.method_suffix.clone() {
                Some(suffix) => Setting::new(Some(suffix), Source::File),
                None => Setting::new(None, Source::Default),
            },

            export_page_size: match settings.export_page_size.filter(|n| *n > 0) {
                Some(n) => Setting::new(n, Source::File),
                None => Setting::new(DEFAULT_EXPORT_PAGE_SIZE, Source::Default),
            },
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.value.as_deref()
    }

    /// Display-safe view. The token is masked.
    pub fn redacted(&self) -> RedactedProfile {
        RedactedProfile {
            base_url: self.base_url.value.clone(),
            token: redact(self.token().unwrap_or("")),
            token_source: self.token.source,
            namespace_id: self.namespace_id.value.clone(),
            username: self.username.value.clone(),
            timeout_secs: self.timeout_secs.value,
            export_page_size: self.export_page_size.value,
        }
    }
}

/// Profile as printed by `config show` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactedProfile {
    pub base_url: String,
    pub token: String,
    pub token_source: Source,
    pub namespace_id: String,
    pub username: String,
    pub timeout_secs: u64,
    pub export_page_size: u32,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn pick<T>(flag: Option<T>, env: Option<T>, file: Option<T>) -> Option<Setting<T>> {
    flag.map(|v| Setting::new(v, Source::Flag))
        .or_else(|| env.map(|v| Setting::new(v, Source::Environment)))
        .or_else(|| file.map(|v| Setting::new(v, Source::File)))
}
