// Read-only platform commands: whoami, status, config show, listings

use serde::Serialize;

use fedlink_client::{AuthStatus, PartnerQuery, RetryPolicy, UserInfo};
use fedlink_config::{RedactedProfile, Settings};

use crate::exit_codes::EXIT_NOT_LOGGED_IN;
use crate::{print_json, print_line, CliError, Context};

// ── whoami ──────────────────────────────────────────────────────────

pub fn cmd_whoami(ctx: &Context) -> Result<(), CliError> {
    let client = ctx.client()?;

    match client.auth_status() {
        AuthStatus::LoggedIn(user) => print_user(ctx, &user),
        AuthStatus::LoggedOut { message } => Err(CliError {
            code: EXIT_NOT_LOGGED_IN,
            message: format!("not logged in: {}", message),
            hint: Some("log in to the platform and refresh the token".to_string()),
            platform: None,
        }),
        AuthStatus::Unknown(err) => Err(CliError::platform(err)),
    }
}

fn print_user(ctx: &Context, user: &UserInfo) -> Result<(), CliError> {
    if ctx.json {
        print_json(user)
    } else {
        print_line(format!("{} (id {})", user.user_name, user.user_id))
    }
}

// ── status ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StatusReport {
    api_connection: &'static str,
    user_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    server_time: String,
    config: RedactedProfile,
}

/// Always exits 0: the report itself says what is wrong.
pub fn cmd_status(ctx: &Context) -> Result<(), CliError> {
    let (api_connection, user, detail) = if ctx.profile.token().is_none() {
        ("not_checked", None, Some("no token configured".to_string()))
    } else {
        match ctx.client() {
            Ok(client) => match client.auth_status() {
                AuthStatus::LoggedIn(user) => ("online", Some(user), None),
                // The platform answered, so the connection is fine
                AuthStatus::LoggedOut { message } => ("online", None, Some(message)),
                AuthStatus::Unknown(err) => ("offline", None, Some(err.to_string())),
            },
            Err(err) => ("misconfigured", None, Some(err.message)),
        }
    };

    let report = StatusReport {
        api_connection,
        user_logged_in: user.is_some(),
        user,
        detail,
        server_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        config: ctx.profile.redacted(),
    };

    if ctx.json {
        return print_json(&report);
    }

    print_line(format!("api_connection:  {}", report.api_connection))?;
    print_line(format!("user_logged_in:  {}", report.user_logged_in))?;
    if let Some(user) = &report.user {
        print_line(format!("user:            {} (id {})", user.user_name, user.user_id))?;
    }
    if let Some(detail) = &report.detail {
        print_line(format!("detail:          {}", detail))?;
    }
    print_line(format!("server_time:     {}", report.server_time))?;
    print_line(format!("base_url:        {}", report.config.base_url))?;
    print_line(format!("namespace_id:    {}", report.config.namespace_id))?;
    print_line(format!("token:           {}", report.config.token))
}

// ── config show ─────────────────────────────────────────────────────

pub fn cmd_config_show(ctx: &Context) -> Result<(), CliError> {
    let p = &ctx.profile;
    let view = p.redacted();

    if ctx.json {
        return print_json(&serde_json::json!({
            "config_path": Settings::config_path_display(),
            "profile": view,
        }));
    }

    print_line(format!("config_path:      {}", Settings::config_path_display()))?;
    print_line(format!("base_url:         {} ({})", view.base_url, p.base_url.source.as_str()))?;
    print_line(format!("token:            {} ({})", view.token, view.token_source.as_str()))?;
    print_line(format!(
        "namespace_id:     {} ({})",
        if view.namespace_id.is_empty() { "(not set)" } else { view.namespace_id.as_str() },
        p.namespace_id.source.as_str()
    ))?;
    print_line(format!("username:         {} ({})", view.username, p.username.source.as_str()))?;
    print_line(format!("timeout_secs:     {} ({})", view.timeout_secs, p.timeout_secs.source.as_str()))?;
    print_line(format!(
        "export_page_size: {} ({})",
        view.export_page_size,
        p.export_page_size.source.as_str()
    ))
}

// ── local / partner listings ────────────────────────────────────────

pub fn cmd_local_list(ctx: &Context, retries: u32) -> Result<(), CliError> {
    let client = ctx.client()?;
    let datasets = RetryPolicy::with_retries(retries).run(|| client.list_local_data(None))?;

    if ctx.json {
        return print_json(&datasets);
    }
    for name in &datasets {
        print_line(name)?;
    }
    ctx.note(format!("{} dataset(s)", datasets.len()));
    Ok(())
}

pub fn cmd_partner_list(
    ctx: &Context,
    page: u32,
    page_size: u32,
    engine_tag: Option<String>,
    partner_user: Option<String>,
    retries: u32,
) -> Result<(), CliError> {
    if page == 0 {
        return Err(CliError::args("--page starts at 1"));
    }
    if page_size == 0 {
        return Err(CliError::args("--page-size must be at least 1"));
    }

    let client = ctx.client()?;
    let query = PartnerQuery {
        page_num: page,
        page_size,
        engine_tag,
        username: partner_user,
    };
    let listing = RetryPolicy::with_retries(retries).run(|| client.list_partner_data(&query))?;

    if ctx.json {
        return print_json(&listing);
    }

    print_line("metano\tmetaname\tstatus\tlineCount\texpiresAt")?;
    for d in &listing.content {
        print_line(format!(
            "{}\t{}\t{}\t{}\t{}",
            d.metano, d.metaname, d.status, d.line_count, d.expires_at
        ))?;
    }
    ctx.note(format!(
        "page {}/{} ({} total)",
        listing.current,
        listing.total_pages().max(1),
        listing.total
    ));
    Ok(())
}

pub fn cmd_partner_columns(ctx: &Context, metano: &str, retries: u32) -> Result<(), CliError> {
    let client = ctx.client()?;
    let columns = RetryPolicy::with_retries(retries).run(|| client.partner_columns(metano))?;
    print_json(&columns)
}
