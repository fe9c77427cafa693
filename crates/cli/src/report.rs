// Write commands: event reports and file upload
//
// These are never retried; a repeated report may be recorded twice.

use std::path::Path;

use fedlink_client::{AuditRecord, NetworkReport, OrderReport, OrderType, TaskReport};

use crate::{print_json, print_line, CliError, Context};

fn print_ok(ctx: &Context, what: &str) -> Result<(), CliError> {
    if ctx.json {
        print_json(&serde_json::json!({ "ok": true, "reported": what }))
    } else {
        print_line(format!("{} reported", what))
    }
}

pub fn cmd_report_task(
    ctx: &Context,
    task_id: String,
    status: String,
    total_time: u64,
    exec_time: Option<String>,
) -> Result<(), CliError> {
    if let Some(ts) = &exec_time {
        chrono::DateTime::parse_from_rfc3339(ts).map_err(|e| {
            CliError::args(format!("invalid --exec-time '{}': {}", ts, e))
                .with_hint("use RFC 3339, e.g. 2025-06-05T11:15:23.050541Z")
        })?;
    }

    let client = ctx.client()?;
    client.report_task(&TaskReport {
        task_id,
        status,
        exec_time,
        total_time,
        namespace_id: None,
    })?;
    print_ok(ctx, "task")
}

pub fn cmd_report_order(
    ctx: &Context,
    order_type: OrderType,
    result_address: String,
    request_param: String,
    order_id: Option<String>,
) -> Result<(), CliError> {
    let client = ctx.client()?;
    client.report_order(&OrderReport {
        namespace_id: None,
        order_type,
        request_param,
        result_address,
        order_id,
    })?;
    print_ok(ctx, "order")
}

pub fn cmd_report_audit(
    ctx: &Context,
    action: String,
    description: String,
    module: String,
    user: Option<String>,
) -> Result<(), CliError> {
    let client = ctx.client()?;
    client.report_audit(&AuditRecord {
        namespace_id: None,
        username: user,
        action,
        description,
        module,
    })?;
    print_ok(ctx, "audit")
}

pub fn cmd_report_network(
    ctx: &Context,
    network_ip: String,
    access_ip: String,
) -> Result<(), CliError> {
    let client = ctx.client()?;
    client.report_network(&NetworkReport {
        namespace_id: None,
        network_ip,
        access_ip,
    })?;
    print_ok(ctx, "network")
}

pub fn cmd_upload(ctx: &Context, path: &Path, name: Option<&str>) -> Result<(), CliError> {
    let client = ctx.client()?;
    let result = client.upload_file(path, name)?;

    if ctx.json {
        return print_json(&result);
    }
    match result {
        serde_json::Value::Null => print_line(format!("uploaded {}", path.display())),
        other => print_line(format!("uploaded {}: {}", path.display(), other)),
    }
}
