// Configuration loading

pub mod profile;
pub mod settings;

pub use profile::{
    redact, Overrides, Profile, RedactedProfile, Setting, Source, DEFAULT_BASE_URL,
    DEFAULT_EXPORT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS, DEFAULT_USERNAME, ENV_BASE_URL,
    ENV_NAMESPACE, ENV_TIMEOUT_SECS, ENV_TOKEN, ENV_USERNAME,
};
pub use settings::Settings;
