//! Response envelopes.
//!
//! The platform answers in one of two shapes:
//!
//! ```text
//! {"code": "E0000000000", "message": "...", "cause": null, "content": ...}
//! {"code": "200", "message": "...", "signature": "", "success": true, "content": ...}
//! ```
//!
//! Both are normalized here into one [`ResponseEnvelope`] so endpoint code
//! never branches on the wire variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Platform response codes.
pub mod codes {
    pub const SUCCESS: &str = "E0000000000";
    /// Success code used by the transport-level response variant.
    pub const TRANSPORT_OK: &str = "200";
    pub const NOT_LOGGED_IN: &str = "E0000000001";
    pub const BAD_REQUEST: &str = "E0000000400";
    pub const NOT_FOUND: &str = "E0000000404";
    pub const SERVER_ERROR: &str = "E0000000500";
    pub const OUT_OF_MEMORY: &str = "E0000000507";
}

/// Canonical response shape. `content` is only populated on success.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub code: String,
    pub message: String,
    pub cause: Option<String>,
    pub content: Option<Value>,
}

impl ResponseEnvelope {
    /// Normalize a decoded response body.
    ///
    /// Anything that is not a JSON object with a `code` or `success` field is
    /// reported as a network-class failure, since the body was unreadable as
    /// a platform response.
    pub fn from_wire(body: Value) -> Result<Self, ClientError> {
        let Value::Object(mut obj) = body else {
            return Err(ClientError::network(format!(
                "unexpected response shape: expected JSON object, got {}",
                json_type_name(&body)
            )));
        };

        let code = match obj.remove("code") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let success_flag = obj.get("success").and_then(Value::as_bool);

        let success = match (success_flag, code.as_deref()) {
            (Some(flag), _) => flag,
            (None, Some(c)) => c == codes::SUCCESS || c == codes::TRANSPORT_OK,
            (None, None) => {
                return Err(ClientError::network(
                    "unexpected response shape: missing `code` and `success`",
                ));
            }
        };

        let message = match obj.remove("message") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let cause = match obj.remove("cause") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        if success {
            let content = match obj.remove("content") {
                Some(Value::Null) | None => None,
                Some(v) => Some(v),
            };
            Ok(Self {
                code: codes::SUCCESS.to_string(),
                message,
                cause,
                content,
            })
        } else {
            Ok(Self {
                code: code.unwrap_or_else(|| codes::SERVER_ERROR.to_string()),
                message,
                cause,
                content: None,
            })
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == codes::SUCCESS
    }

    /// Split into the success payload or a classified failure.
    pub fn into_result(self) -> Result<Option<Value>, ClientError> {
        if self.is_success() {
            Ok(self.content)
        } else {
            Err(ClientError::from_platform(&self.code, self.message, self.cause))
        }
    }
}

/// One page of a paged listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedListing<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default = "first_page")]
    pub current: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

impl<T> PagedListing<T> {
    /// Last valid page number; zero when the listing is empty.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64)
    }

    pub fn has_next(&self) -> bool {
        (self.current as u64) < self.total_pages()
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_platform_success_variant() {
        let resp = ResponseEnvelope::from_wire(json!({
            "code": "E0000000000",
            "message": "请求成功",
            "cause": null,
            "content": {"userId": 1755166221, "userName": "admin007"}
        }))
        .unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.content.unwrap()["userName"], "admin007");
    }

    #[test]
    fn test_transport_success_variant_normalizes_code() {
        let resp = ResponseEnvelope::from_wire(json!({
            "code": "200",
            "message": "执行成功",
            "signature": "",
            "content": {"userName": "admin007", "userId": 1754447233},
            "success": true
        }))
        .unwrap();
        assert_eq!(resp.code, codes::SUCCESS);
        assert!(resp.content.is_some());
    }

    #[test]
    fn test_transport_failure_variant() {
        let resp = ResponseEnvelope::from_wire(json!({
            "code": "E0000000500",
            "message": "用户未登录",
            "signature": "",
            "success": false
        }))
        .unwrap();
        assert!(!resp.is_success());
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerError);
        assert_eq!(err.message, "用户未登录");
    }

    #[test]
    fn test_failure_drops_content() {
        let resp = ResponseEnvelope::from_wire(json!({
            "code": "E0000000001",
            "message": "用户未登录:reference_handler.go:199",
            "cause": "token expired",
            "content": {"ignored": true}
        }))
        .unwrap();
        assert!(resp.content.is_none());
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotLoggedIn);
        assert_eq!(err.code, "E0000000001");
        assert_eq!(err.cause.as_deref(), Some("token expired"));
    }

    #[test]
    fn test_non_object_body_is_network_failure() {
        let err = ResponseEnvelope::from_wire(json!(["a", "b"])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.message.contains("array"));
    }

    #[test]
    fn test_missing_code_is_network_failure() {
        let err = ResponseEnvelope::from_wire(json!({"message": "hi"})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[test]
    fn test_null_content_on_success() {
        let resp = ResponseEnvelope::from_wire(json!({
            "code": "E0000000000", "message": "请求成功", "cause": null, "content": null
        }))
        .unwrap();
        assert_eq!(resp.into_result().unwrap(), None);
    }

    #[test]
    fn test_paged_listing_single_page() {
        let listing: PagedListing<Value> = serde_json::from_value(json!({
            "content": [{"metano": "2257188319"}],
            "current": 1,
            "pageSize": 10,
            "total": 1
        }))
        .unwrap();
        assert_eq!(listing.current, 1);
        assert_eq!(listing.content.len(), 1);
        assert_eq!(listing.total_pages(), 1);
        assert!(!listing.has_next());
    }

    #[test]
    fn test_paged_listing_total_pages_rounds_up() {
        let listing: PagedListing<Value> = PagedListing {
            content: vec![],
            current: 2,
            page_size: 10,
            total: 21,
        };
        assert_eq!(listing.total_pages(), 3);
        assert!(listing.has_next());
    }
}
