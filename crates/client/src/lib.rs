//! Platform API client, shared between the CLI and any embedding service.
//!
//! This crate is the single source of truth for the platform wire contract:
//! request envelopes, transport, response classification, endpoint methods,
//! and the chunked CSV exporter.
//!
//! No CLI concepts. No automatic retries. No global state.

mod client;
mod envelope;
mod error;
mod export;
mod response;
mod retry;
mod session;
mod transport;

pub use client::{
    AuditRecord, AuthStatus, NetworkReport, OrderReport, OrderType, PartnerDataset,
    PartnerQuery, PlatformClient, TaskReport, UserInfo, MAX_UPLOAD_BYTES,
};
pub use envelope::{Method, RequestEnvelope};
pub use error::{ClientError, ErrorKind};
pub use export::{
    default_output_path, ExportOptions, ExportSummary, OffsetMode, DEFAULT_EXPORT_PAGE_SIZE,
};
pub use response::{codes, PagedListing, ResponseEnvelope};
pub use retry::RetryPolicy;
pub use session::{
    redact, ClientSession, SessionBuilder, DEFAULT_ENGINE_TAG, DEFAULT_METHOD_SUFFIX,
    DEFAULT_TIMEOUT, DEFAULT_USERNAME,
};
pub use transport::{HttpTransport, Transport};
