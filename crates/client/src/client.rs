//! Endpoint methods.
//!
//! One method per platform capability. Each builds an envelope with its
//! fixed method identifier, sends it through the transport, and maps the
//! response code to a typed result. Nothing is retried here.

use std::io::{self, Read};
use std::path::Path;

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::envelope::{Method, RequestEnvelope};
use crate::error::{ClientError, ErrorKind};
use crate::response::PagedListing;
use crate::session::{ClientSession, DEFAULT_ENGINE_TAG};
use crate::transport::{HttpTransport, Transport};

/// Upload ceiling, checked before any bytes are read or sent.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Platform API client. Generic over the transport so tests and embedders
/// can supply their own; defaults to HTTP.
pub struct PlatformClient<T = HttpTransport> {
    session: ClientSession,
    transport: T,
}

/// Logged-in user, from the auth check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

/// Result of an auth check. `Unknown` is not "logged out": the platform
/// could not be asked, or answered with something other than the
/// not-logged-in code.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    LoggedIn(UserInfo),
    LoggedOut { message: String },
    Unknown(ClientError),
}

/// A partner dataset this namespace has been granted access to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartnerDataset {
    #[serde(deserialize_with = "string_or_number")]
    pub metano: String,
    pub metaname: String,
    pub auth_number: String,
    pub engine_tag: String,
    pub inst_name: String,
    pub namespace_id: String,
    pub published_inst_id: String,
    pub network_ip: String,
    pub granted_at: String,
    pub expires_at: String,
    pub status: String,
    pub line_count: u64,
    pub meta_count: u64,
}

/// Paging and filters for the partner listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerQuery {
    pub page_num: u32,
    pub page_size: u32,
    /// Defaults to [`DEFAULT_ENGINE_TAG`]
    pub engine_tag: Option<String>,
    /// Defaults to the session username
    pub username: Option<String>,
}

impl Default for PartnerQuery {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: 10,
            engine_tag: None,
            username: None,
        }
    }
}

/// Task outcome report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task_id: String,
    /// e.g. "success", "failed", "running"
    pub status: String,
    /// RFC 3339 timestamp; defaults to now (UTC)
    pub exec_time: Option<String>,
    /// Seconds
    pub total_time: u64,
    pub namespace_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Result is a served API endpoint
    Api,
    /// Result is an uploaded file, addressed by its storage ETag
    File,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Api => "api",
            OrderType::File => "file",
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api" => Ok(OrderType::Api),
            "file" => Ok(OrderType::File),
            other => Err(format!("unknown order type '{}' (expected api or file)", other)),
        }
    }
}

/// Order result report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReport {
    pub namespace_id: Option<String>,
    pub order_type: OrderType,
    /// Request parameters for `api` orders; empty for `file` orders
    pub request_param: String,
    /// Service address for `api`, storage ETag for `file`
    pub result_address: String,
    pub order_id: Option<String>,
}

/// Operation audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub namespace_id: Option<String>,
    /// Defaults to the session username
    pub username: Option<String>,
    pub action: String,
    pub description: String,
    pub module: String,
}

/// Network topology report. Addresses are `IP:PORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReport {
    pub namespace_id: Option<String>,
    pub network_ip: String,
    pub access_ip: String,
}

impl PlatformClient<HttpTransport> {
    /// Client over HTTP for the given session.
    pub fn new(session: ClientSession) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&session)?;
        Ok(Self { session, transport })
    }
}

impl<T: Transport> PlatformClient<T> {
    pub fn with_transport(session: ClientSession, transport: T) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the logged-in user.
    pub fn user_info(&self) -> Result<UserInfo, ClientError> {
        let env = RequestEnvelope::build(Method::UserInfo);
        self.call_typed(&env)
    }

    /// Auth check that keeps "not logged in" apart from "could not tell".
    pub fn auth_status(&self) -> AuthStatus {
        match self.user_info() {
            Ok(user) => AuthStatus::LoggedIn(user),
            Err(e) if e.kind == ErrorKind::NotLoggedIn => AuthStatus::LoggedOut { message: e.message },
            Err(e) => AuthStatus::Unknown(e),
        }
    }

    /// Identifiers of the namespace's local datasets (unpaged).
    pub fn list_local_data(&self, namespace_id: Option<&str>) -> Result<Vec<String>, ClientError> {
        let env = RequestEnvelope::build(Method::ListLocalData)
            .param("namespaceId", self.session.namespace_or(namespace_id));

        let content = self.call(&env)?;
        let Some(content) = content else {
            return Ok(Vec::new());
        };
        let items = content.as_array().ok_or_else(|| {
            ClientError::network("local data listing: expected an array of identifiers")
        })?;

        items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(ClientError::network(format!(
                    "local data listing: unexpected identifier {}",
                    other
                ))),
            })
            .collect()
    }

    /// One page of partner datasets granted to this namespace.
    pub fn list_partner_data(
        &self,
        query: &PartnerQuery,
    ) -> Result<PagedListing<PartnerDataset>, ClientError> {
        if query.page_num == 0 {
            return Err(ClientError::bad_request("page_num must be at least 1"));
        }
        if query.page_size == 0 {
            return Err(ClientError::bad_request("page_size must be at least 1"));
        }

        let env = RequestEnvelope::build(Method::ListPartnerData)
            .param("pageNum", query.page_num)
            .param("pageSize", query.page_size)
            .param("engineTAG", query.engine_tag.as_deref().unwrap_or(DEFAULT_ENGINE_TAG))
            .param("username", query.username.as_deref().unwrap_or(self.session.username()));

        match self.call(&env)? {
            Some(content) => decode(content, Method::ListPartnerData),
            None => Ok(PagedListing {
                content: Vec::new(),
                current: query.page_num,
                page_size: query.page_size,
                total: 0,
            }),
        }
    }

    /// Field/schema description of one partner dataset.
    pub fn partner_columns(&self, metano: &str) -> Result<Value, ClientError> {
        require("metano", metano)?;
        let env = RequestEnvelope::build(Method::PartnerColumns).param("metano", metano);
        Ok(self.call(&env)?.unwrap_or(Value::Null))
    }

    pub fn report_task(&self, report: &TaskReport) -> Result<(), ClientError> {
        require("task_id", &report.task_id)?;
        require("status", &report.status)?;

        let exec_time = report.exec_time.clone().unwrap_or_else(now_rfc3339);
        let env = RequestEnvelope::build(Method::ReportTask)
            .param("taskId", report.task_id.as_str())
            .param("status", report.status.as_str())
            .param("execTime", exec_time)
            .param("totalTime", report.total_time)
            .param("namespaceId", self.session.namespace_or(report.namespace_id.as_deref()));

        self.call(&env).map(|_| ())
    }

    pub fn report_order(&self, report: &OrderReport) -> Result<(), ClientError> {
        require("result_address", &report.result_address)?;

        let env = RequestEnvelope::build(Method::ReportOrder)
            .param("namespace", self.session.namespace_or(report.namespace_id.as_deref()))
            .param("orderType", report.order_type.as_str())
            .param("requestParam", report.request_param.as_str())
            .param("resultAddress", report.result_address.as_str())
            .opt_param("orderId", report.order_id.as_deref());

        self.call(&env).map(|_| ())
    }

    pub fn report_audit(&self, record: &AuditRecord) -> Result<(), ClientError> {
        require("action", &record.action)?;
        require("module", &record.module)?;

        let env = RequestEnvelope::build(Method::ReportAudit)
            .param("spaceName", self.session.namespace_or(record.namespace_id.as_deref()))
            .param("userName", record.username.as_deref().unwrap_or(self.session.username()))
            .param("action", record.action.as_str())
            .param("description", record.description.as_str())
            .param("module", record.module.as_str());

        self.call(&env).map(|_| ())
    }

    pub fn report_network(&self, report: &NetworkReport) -> Result<(), ClientError> {
        check_host_port("network_ip", &report.network_ip)?;
        check_host_port("access_ip", &report.access_ip)?;

        let env = RequestEnvelope::build(Method::ReportNetwork)
            .param("namespace", self.session.namespace_or(report.namespace_id.as_deref()))
            .param("networkIp", report.network_ip.as_str())
            .param("accessIp", report.access_ip.as_str());

        self.call(&env).map(|_| ())
    }

    /// Upload a local file (base64 in the JSON body). Files over
    /// [`MAX_UPLOAD_BYTES`] are rejected without a network call.
    ///
    /// Returns the platform's receipt (e.g. the stored object's ETag).
    pub fn upload_file(&self, path: &Path, file_name: Option<&str>) -> Result<Value, ClientError> {
        let meta = std::fs::metadata(path).map_err(|e| read_error(path, e))?;
        if !meta.is_file() {
            return Err(ClientError::bad_request(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let size = meta.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(ClientError::bad_request(format!(
                "file too large: {} bytes ({:.2} MB), limit is {} bytes (5 MB)",
                size,
                size as f64 / 1024.0 / 1024.0,
                MAX_UPLOAD_BYTES
            )));
        }

        let name = match file_name {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(String::from)
                .ok_or_else(|| ClientError::bad_request("cannot derive file name; pass one explicitly"))?,
        };

        // The file can grow after the size check; never read past the limit
        let file = std::fs::File::open(path).map_err(|e| read_error(path, e))?;
        let data = read_capped(file, MAX_UPLOAD_BYTES).map_err(|e| read_error(path, e))?;
        if data.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(ClientError::bad_request(format!(
                "file too large: {} grew past {} bytes while reading, limit is 5 MB",
                path.display(),
                MAX_UPLOAD_BYTES
            )));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        drop(data);

        log::info!("uploading {} ({} bytes) as '{}'", path.display(), size, name);

        let env = RequestEnvelope::build(Method::UploadFile)
            .param("fileName", name)
            .param("content", encoded);

        Ok(self.call(&env)?.unwrap_or(Value::Null))
    }

    // ── Internal helpers ────────────────────────────────────────────

    pub(crate) fn call(&self, env: &RequestEnvelope) -> Result<Option<Value>, ClientError> {
        self.transport.send(env)?.into_result()
    }

    fn call_typed<R: DeserializeOwned>(&self, env: &RequestEnvelope) -> Result<R, ClientError> {
        let content = self.call(env)?.ok_or_else(|| {
            ClientError::network(format!("{}: success response without content", env.method))
        })?;
        decode(content, env.method)
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn decode<R: DeserializeOwned>(content: Value, method: Method) -> Result<R, ClientError> {
    serde_json::from_value(content)
        .map_err(|e| ClientError::network(format!("{}: unexpected content: {}", method, e)))
}

fn require(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::bad_request(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn check_host_port(field: &str, value: &str) -> Result<(), ClientError> {
    let valid = value
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        .unwrap_or(false);
    if !valid {
        return Err(ClientError::bad_request(format!(
            "{} must be IP:PORT (got '{}')",
            field, value
        )));
    }
    Ok(())
}

/// Read at most `limit + 1` bytes, so a result longer than `limit`
/// means the source was over the limit.
fn read_capped(reader: impl Read, limit: u64) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut data)?;
    Ok(data)
}

fn read_error(path: &Path, e: io::Error) -> ClientError {
    match e.kind() {
        io::ErrorKind::NotFound => {
            ClientError::not_found(format!("file not found: {}", path.display()))
        }
        io::ErrorKind::OutOfMemory => ClientError::new(
            ErrorKind::OutOfMemory,
            format!("out of memory reading {}", path.display()),
        ),
        _ => ClientError::server(format!("cannot read {}: {}", path.display(), e)),
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
