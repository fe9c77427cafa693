// End-to-end tests for the platform client against a mock HTTP endpoint.
// Run with: cargo test -p fedlink-client --test platform_http

use std::time::Duration;

use base64::Engine as _;
use httpmock::prelude::*;
use serde_json::json;

use fedlink_client::{
    AuthStatus, ClientSession, ErrorKind, ExportOptions, PartnerQuery, PlatformClient, TaskReport,
    DEFAULT_METHOD_SUFFIX,
};

const INVOKE_PATH: &str = "/janus/invoke/v1";

fn client_for(server: &MockServer, token: &str) -> PlatformClient {
    let session = ClientSession::builder(token, server.url(INVOKE_PATH))
        .namespace_id("jg0100006200000000")
        .username("admin007")
        .method_suffix("")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    PlatformClient::new(session).unwrap()
}

fn wire(method: &str, params: serde_json::Value) -> serde_json::Value {
    json!({"method": method, "content": {"param": params}})
}

fn encode_rows(rows: &serde_json::Value) -> String {
    base64::engine::general_purpose::STANDARD.encode(serde_json::to_vec(rows).unwrap())
}

#[test]
fn auth_check_with_invalid_token_is_not_logged_in() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(INVOKE_PATH)
            .header("Authorization", "expired-token")
            .json_body(wire("info.user.paas", json!({})));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "code": "E0000000001",
                "message": "用户未登录:reference_handler.go:199",
                "cause": null,
                "content": null
            }));
    });

    let client = client_for(&server, "expired-token");
    let err = client.user_info().unwrap_err();

    mock.assert();
    assert_eq!(err.kind, ErrorKind::NotLoggedIn);
    assert_eq!(err.code, "E0000000001");
    assert!(err.message.contains("用户未登录"));
}

#[test]
fn auth_check_accepts_transport_level_variant() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH);
        then.status(200).json_body(json!({
            "code": "200",
            "message": "执行成功",
            "signature": "",
            "content": {"userName": "admin007", "userId": 1754447233},
            "success": true
        }));
    });

    let client = client_for(&server, "tok");
    match client.auth_status() {
        AuthStatus::LoggedIn(user) => assert_eq!(user.user_id, "1754447233"),
        other => panic!("expected LoggedIn, got {:?}", other),
    }
}

#[test]
fn default_method_suffix_is_appended() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH).json_body(wire(
            &format!("info.user.paas{}", DEFAULT_METHOD_SUFFIX),
            json!({}),
        ));
        then.status(200).json_body(json!({
            "code": "E0000000000", "message": "请求成功", "cause": null,
            "content": {"userId": 1, "userName": "u"}
        }));
    });

    let session = ClientSession::builder("tok", server.url(INVOKE_PATH)).build().unwrap();
    PlatformClient::new(session).unwrap().user_info().unwrap();
    mock.assert();
}

#[test]
fn partner_listing_single_page() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH).json_body(wire(
            "list.resource.receive.auth.paas",
            json!({
                "pageNum": 1,
                "pageSize": 10,
                "engineTAG": "蓝象-联邦学习:1.0.0",
                "username": "admin007"
            }),
        ));
        then.status(200).json_body(json!({
            "code": "E0000000000",
            "message": "请求成功",
            "cause": null,
            "content": {
                "content": [{
                    "metano": "2257188319",
                    "metaname": "83-partner-1w-new",
                    "status": "已授权",
                    "lineCount": 10000
                }],
                "current": 1,
                "pageSize": 10,
                "total": 1
            }
        }));
    });

    let client = client_for(&server, "tok");
    let listing = client.list_partner_data(&PartnerQuery::default()).unwrap();

    mock.assert();
    assert_eq!(listing.current, 1);
    assert_eq!(listing.total, 1);
    assert_eq!(listing.content.len(), 1);
    assert_eq!(listing.total_pages(), 1);
    assert_eq!(listing.content[0].metaname, "83-partner-1w-new");
}

#[test]
fn report_task_sends_platform_field_names() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH).json_body(wire(
            "save.task.engine.paas",
            json!({
                "taskId": "12345678abc2",
                "status": "success",
                "execTime": "2025-06-05T11:15:23.050541Z",
                "totalTime": 300,
                "namespaceId": "JG0100006200000000"
            }),
        ));
        then.status(200).json_body(json!({
            "code": "E0000000000", "message": "请求成功", "cause": null, "content": null
        }));
    });

    let client = client_for(&server, "tok");
    client
        .report_task(&TaskReport {
            task_id: "12345678abc2".into(),
            status: "success".into(),
            exec_time: Some("2025-06-05T11:15:23.050541Z".into()),
            total_time: 300,
            namespace_id: Some("JG0100006200000000".into()),
        })
        .unwrap();

    mock.assert();
}

#[test]
fn export_streams_pages_to_csv() {
    let server = MockServer::start();
    let page1_rows = json!([{"id": "1", "age": 30}, {"id": "2", "age": 41}]);
    let page2_rows = json!([{"id": "3", "age": 25}]);

    let page1 = server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH).json_body(wire(
            "range.delivery.paas",
            json!({"metano": "225819277", "limit": 2, "offset": 0}),
        ));
        then.status(200).json_body(json!({
            "code": "E0000000000", "message": "请求成功", "cause": null,
            "content": {
                "total": 3,
                "columns": [{"name": "id"}, {"name": "age"}],
                "content": encode_rows(&page1_rows)
            }
        }));
    });
    let page2 = server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH).json_body(wire(
            "range.delivery.paas",
            json!({"metano": "225819277", "limit": 2, "offset": 1}),
        ));
        then.status(200).json_body(json!({
            "code": "E0000000000", "message": "请求成功", "cause": null,
            "content": {
                "total": 3,
                "columns": [{"name": "id"}, {"name": "age"}],
                "content": encode_rows(&page2_rows)
            }
        }));
    });

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("225819277.csv");
    let client = client_for(&server, "tok");
    let summary = client
        .export_csv(
            "225819277",
            &ExportOptions {
                output: Some(out.clone()),
                page_size: 2,
                ..ExportOptions::default()
            },
        )
        .unwrap();

    page1.assert();
    page2.assert();
    assert_eq!(summary.row_count, 3);
    assert_eq!(summary.peak_page_rows, 2);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "id,age\n1,30\n2,41\n3,25\n"
    );

    let json = serde_json::to_value(&summary).unwrap();
    assert!(json["filename"].as_str().unwrap().ends_with("225819277.csv"));
    assert_eq!(json["rowCount"], 3);
}

#[test]
fn http_error_without_envelope_is_network_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH);
        then.status(503).body("Service Unavailable");
    });

    let client = client_for(&server, "tok");
    let err = client.list_local_data(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.code, "E0000000500");
    assert!(err.message.contains("HTTP 503"));
}

#[test]
fn proxy_401_page_is_not_read_as_logged_out() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH);
        then.status(401)
            .header("content-type", "text/html")
            .body("<html>401 Authorization Required</html>");
    });

    let client = client_for(&server, "tok");
    match client.auth_status() {
        AuthStatus::Unknown(err) => assert_eq!(err.kind, ErrorKind::Network),
        other => panic!("expected Unknown, got {:?}", other),
    }
}

#[test]
fn non_json_success_body_is_network_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH);
        then.status(200).header("content-type", "text/html").body("<html>login</html>");
    });

    let client = client_for(&server, "tok");
    let err = client.partner_columns("2257188319").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
}

#[test]
fn oversize_upload_never_reaches_server() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(INVOKE_PATH);
        then.status(200).json_body(json!({"code": "E0000000000", "message": "ok"}));
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let size = 6 * 1024 * 1024u64;
    std::fs::File::create(&path).unwrap().set_len(size).unwrap();

    let client = client_for(&server, "tok");
    let err = client.upload_file(&path, None).unwrap_err();

    mock.assert_calls(0);
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert!(err.message.contains("6291456"), "message: {}", err.message);
}
