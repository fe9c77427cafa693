//! HTTP transport.
//!
//! Blocking reqwest client (no Tokio runtime required). One POST per call;
//! every failure below the platform envelope (connect, timeout, unreadable
//! or non-JSON body) comes back as `ErrorKind::Network`.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::envelope::RequestEnvelope;
use crate::error::ClientError;
use crate::response::ResponseEnvelope;
use crate::session::ClientSession;

const USER_AGENT: &str = concat!("fedlink/", env!("CARGO_PKG_VERSION"));
const BODY_SNIPPET_CHARS: usize = 200;

/// Sends one envelope and returns the normalized response.
///
/// Endpoint methods depend on this seam rather than on HTTP directly, so a
/// deployment can substitute its own carrier.
pub trait Transport {
    fn send(&self, envelope: &RequestEnvelope) -> Result<ResponseEnvelope, ClientError>;
}

/// JSON-over-HTTP transport bound to one session.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::blocking::Client,
    url: String,
    method_suffix: String,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(session: &ClientSession) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(session.timeout())
            .build()
            .map_err(|e| ClientError::network(format!("failed to create HTTP client: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if session.has_token() {
            let mut value = HeaderValue::from_str(session.token().trim()).map_err(|_| {
                ClientError::bad_request("token contains characters not allowed in a header")
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            http,
            url: session.base_url().to_string(),
            method_suffix: session.method_suffix().to_string(),
            headers,
        })
    }

    /// Replace (or add) a default header for every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ClientError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST an envelope to an explicit URL with per-call header overrides.
    pub fn send_to(
        &self,
        url: &str,
        envelope: &RequestEnvelope,
        overrides: &[(&str, &str)],
    ) -> Result<ResponseEnvelope, ClientError> {
        let mut headers = self.headers.clone();
        for (name, value) in overrides {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        let body = serde_json::to_vec(&envelope.to_wire(&self.method_suffix))
            .map_err(|e| ClientError::bad_request(format!("cannot encode request: {}", e)))?;

        log::debug!("POST {} method={} params={}", url, envelope.method, envelope.params.len());

        let response = self
            .http
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .map_err(|e| ClientError::network(describe_send_error(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ClientError::network(format!("failed to read response body: {}", e)))?;

        decode_body(status.as_u16(), status.is_success(), &text)
    }
}

impl Transport for HttpTransport {
    fn send(&self, envelope: &RequestEnvelope) -> Result<ResponseEnvelope, ClientError> {
        self.send_to(&self.url, envelope, &[])
    }
}

/// Turn a raw HTTP response into an envelope.
///
/// A body that parses as a platform envelope wins regardless of status.
/// Anything else is a Network failure; the status only appears in the
/// message, so a proxy's 401 page is never read as "not logged in".
fn decode_body(status: u16, ok: bool, text: &str) -> Result<ResponseEnvelope, ClientError> {
    let trimmed = text.trim_start_matches('\u{feff}');

    let parsed = serde_json::from_str::<Value>(trimmed)
        .map_err(|e| e.to_string())
        .and_then(|v| ResponseEnvelope::from_wire(v).map_err(|e| e.message));

    match parsed {
        Ok(envelope) => Ok(envelope),
        Err(_) if !ok => Err(ClientError::network(format!(
            "HTTP {}: {}",
            status,
            snippet(trimmed)
        ))),
        Err(reason) => Err(ClientError::network(format!(
            "invalid JSON response: {} (body: {})",
            reason,
            snippet(trimmed)
        ))),
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ClientError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ClientError::bad_request(format!("invalid header name '{}'", name)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| ClientError::bad_request(format!("invalid value for header '{}'", name)))?;
    Ok((name, value))
}

fn describe_send_error(e: &reqwest::Error) -> String {
    let prefix = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let mut msg = format!("{}: {}", prefix, e);
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}

fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(BODY_SNIPPET_CHARS).collect();
    if text.chars().count() > BODY_SNIPPET_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Method;
    use crate::error::ErrorKind;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn session_for(url: &str) -> ClientSession {
        ClientSession::builder("tok-abc", url)
            .method_suffix(".sfx")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_decode_non_json_ok_status_is_network() {
        let err = decode_body(200, true, "<html>gateway</html>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.message.contains("invalid JSON response"));
        assert!(err.message.contains("<html>"));
    }

    #[test]
    fn test_decode_non_json_error_status_is_network() {
        for (status, body) in [
            (502, "Bad Gateway"),
            (404, "<html>404 Not Found</html>"),
            (401, "<html>proxy login</html>"),
        ] {
            let err = decode_body(status, false, body).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Network, "status {}", status);
            assert_eq!(err.code, "E0000000500", "status {}", status);
            assert!(err.message.contains(&format!("HTTP {}", status)));
        }
    }

    #[test]
    fn test_decode_envelope_wins_over_status() {
        let body = r#"{"code":"E0000000001","message":"用户未登录","cause":null}"#;
        let env = decode_body(401, false, body).unwrap();
        assert_eq!(env.code, "E0000000001");
    }

    #[test]
    fn test_decode_strips_bom() {
        let body = "\u{feff}{\"code\":\"E0000000000\",\"message\":\"ok\",\"content\":[]}";
        assert!(decode_body(200, true, body).unwrap().is_success());
    }

    #[test]
    fn test_snippet_is_char_safe() {
        let long = "数".repeat(300);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), BODY_SNIPPET_CHARS + 1);
    }

    #[test]
    fn test_send_attaches_headers_and_wire_body() {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/invoke")
                .header("Authorization", "tok-abc")
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "method": "list.data.local.engine.paas.sfx",
                    "content": {"param": {"namespaceId": "jg01"}}
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "code": "E0000000000",
                    "message": "请求成功",
                    "cause": null,
                    "content": ["225819277"]
                }));
        });

        let transport = HttpTransport::new(&session_for(&server.url("/invoke"))).unwrap();
        let env = RequestEnvelope::build(Method::ListLocalData).param("namespaceId", "jg01");
        let resp = transport.send(&env).unwrap();

        mock.assert();
        assert!(resp.is_success());
        assert_eq!(resp.content, Some(serde_json::json!(["225819277"])));
    }

    #[test]
    fn test_header_override_replaces_default() {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(POST).path("/").header("Authorization", "other-token");
            then.status(200).json_body(serde_json::json!({
                "code": "E0000000000", "message": "ok", "content": null
            }));
        });

        let transport = HttpTransport::new(&session_for(&server.base_url())).unwrap();
        let env = RequestEnvelope::build(Method::UserInfo);
        transport
            .send_to(&server.url("/"), &env, &[("Authorization", "other-token")])
            .unwrap();

        mock.assert();
    }

    #[test]
    fn test_connection_refused_is_network_failure() {
        // Bind then drop a listener so the port is closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport =
            HttpTransport::new(&session_for(&format!("http://127.0.0.1:{}/", port))).unwrap();

        let err = transport.send(&RequestEnvelope::build(Method::UserInfo)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.code, "E0000000500");
    }

    #[test]
    fn test_timeout_is_network_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(serde_json::json!({"code": "E0000000000", "message": "ok"}));
        });

        let session = ClientSession::builder("tok", server.base_url())
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let transport = HttpTransport::new(&session).unwrap();

        let err = transport.send(&RequestEnvelope::build(Method::UserInfo)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.message.contains("timed out"), "message: {}", err.message);
    }

    #[test]
    fn test_invalid_override_header_is_bad_request() {
        let transport = HttpTransport::new(&session_for("http://127.0.0.1:9/")).unwrap();
        let err = transport
            .send_to("http://127.0.0.1:9/", &RequestEnvelope::build(Method::UserInfo), &[("bad header", "x")])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
    }
}
