//! Request envelopes.
//!
//! Every call sends `{method, params}`. On the wire the platform expects the
//! method identifier with a deployment suffix and the params nested under
//! `content.param`:
//!
//! ```text
//! {"method": "info.user.paas<suffix>", "content": {"param": {...}}}
//! ```

use serde_json::{Map, Value};

/// Fixed platform method identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    UserInfo,
    ListLocalData,
    ListPartnerData,
    PartnerColumns,
    RangeDelivery,
    ReportTask,
    ReportAudit,
    ReportNetwork,
    ReportOrder,
    UploadFile,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::UserInfo,
        Method::ListLocalData,
        Method::ListPartnerData,
        Method::PartnerColumns,
        Method::RangeDelivery,
        Method::ReportTask,
        Method::ReportAudit,
        Method::ReportNetwork,
        Method::ReportOrder,
        Method::UploadFile,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            Method::UserInfo => "info.user.paas",
            Method::ListLocalData => "list.data.local.engine.paas",
            Method::ListPartnerData => "list.resource.receive.auth.paas",
            Method::PartnerColumns => "detail.partner.metaset.paas",
            Method::RangeDelivery => "range.delivery.paas",
            Method::ReportTask => "save.task.engine.paas",
            Method::ReportAudit => "record.operate.audit.paas",
            Method::ReportNetwork => "report.network.engine.paas",
            Method::ReportOrder => "report.order.engine.paas",
            Method::UploadFile => "upload.file.engine.paas",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

/// A method plus its parameters. `params` is an unordered mapping; key
/// presence is what matters, not order.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub method: Method,
    pub params: Map<String, Value>,
}

impl RequestEnvelope {
    pub fn build(method: Method) -> Self {
        Self {
            method,
            params: Map::new(),
        }
    }

    /// Add a parameter. Later values for the same key replace earlier ones.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Add a parameter only when set. `None` is omitted entirely rather than
    /// sent as `null`; some endpoints treat absent and empty differently.
    pub fn opt_param<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Render the platform wire body.
    pub fn to_wire(&self, method_suffix: &str) -> Value {
        let mut content = Map::new();
        content.insert("param".into(), Value::Object(self.params.clone()));

        let mut body = Map::new();
        body.insert(
            "method".into(),
            Value::String(format!("{}{}", self.method.identifier(), method_suffix)),
        );
        body.insert("content".into(), Value::Object(content));
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_is_deterministic() {
        let a = RequestEnvelope::build(Method::ReportTask)
            .param("taskId", "12345678abc2")
            .param("totalTime", 300);
        let b = RequestEnvelope::build(Method::ReportTask)
            .param("totalTime", 300)
            .param("taskId", "12345678abc2");
        assert_eq!(a, b);
        assert_eq!(a.to_wire(".sfx"), b.to_wire(".sfx"));
    }

    #[test]
    fn test_unset_params_are_omitted() {
        let env = RequestEnvelope::build(Method::ReportOrder)
            .param("orderType", "api")
            .opt_param("orderId", None::<String>)
            .opt_param("requestParam", Some(""));
        assert!(env.get("orderId").is_none());
        // Empty string is a value, not "unset"
        assert_eq!(env.get("requestParam"), Some(&json!("")));
        assert_eq!(env.params.len(), 2);
    }

    #[test]
    fn test_wire_shape() {
        let env = RequestEnvelope::build(Method::ListLocalData).param("namespaceId", "jg01");
        let wire = env.to_wire(".sfx");
        assert_eq!(
            wire,
            json!({
                "method": "list.data.local.engine.paas.sfx",
                "content": {"param": {"namespaceId": "jg01"}}
            })
        );
    }

    #[test]
    fn test_empty_params_still_render_object() {
        let wire = RequestEnvelope::build(Method::UserInfo).to_wire("");
        assert_eq!(wire["content"]["param"], json!({}));
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut ids: Vec<&str> = Method::ALL.iter().map(|m| m.identifier()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Method::ALL.len());
    }
}
