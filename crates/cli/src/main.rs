// fedlink - command-line client for the federated-learning platform API

mod exit_codes;
mod export;
mod platform;
mod report;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use fedlink_client::{ClientError, ClientSession, OffsetMode, OrderType, PlatformClient};
use fedlink_config::{Overrides, Profile, Settings, ENV_TOKEN};

use exit_codes::{
    platform_exit_code, PlatformErrorOutput, EXIT_IO, EXIT_MISSING_TOKEN, EXIT_SUCCESS,
    EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "fedlink")]
#[command(about = "Federated-learning platform API client")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Platform invoke endpoint (env: FEDLINK_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Access token (env: FEDLINK_TOKEN)
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    /// Namespace for namespace-scoped calls (env: FEDLINK_NAMESPACE)
    #[arg(long, global = true, value_name = "ID")]
    namespace: Option<String>,

    /// Platform username (env: FEDLINK_USERNAME)
    #[arg(long, global = true)]
    username: Option<String>,

    /// Request timeout in seconds (env: FEDLINK_TIMEOUT_SECS)
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only errors on stderr
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the token and print the logged-in user
    #[command(after_help = "\
Examples:
  fedlink whoami --token $TOKEN
  FEDLINK_TOKEN=... fedlink whoami --json")]
    Whoami,

    /// Report connectivity, login state and the active configuration
    Status,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Local datasets of the namespace
    #[command(subcommand)]
    Local(LocalCommands),

    /// Partner datasets shared with this namespace
    #[command(subcommand)]
    Partner(PartnerCommands),

    /// Export a dataset to CSV, one page at a time
    #[command(after_help = "\
Examples:
  fedlink export 225819277
  fedlink export 225819277 --out data/partner.csv --page-size 500
  fedlink export 225819277 --offset-mode row --json")]
    Export {
        /// Dataset identifier
        metano: String,

        /// Output file (default: <METANO>.csv in the current directory)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Rows per page (default from config, else 1000)
        #[arg(long)]
        page_size: Option<u32>,

        /// How the page offset advances
        #[arg(long, value_enum, default_value = "page")]
        offset_mode: OffsetModeArg,
    },

    /// Report task, order, audit and network events
    #[command(subcommand)]
    Report(ReportCommands),

    /// Upload a file (5 MB limit)
    #[command(after_help = "\
Examples:
  fedlink upload model.bin
  fedlink upload ./out/result.csv --name result-2025-06-05.csv")]
    Upload {
        /// File to upload
        path: PathBuf,

        /// Name to store it under (default: the file's name)
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration (token redacted)
    Show,
}

#[derive(Subcommand)]
enum LocalCommands {
    /// List local datasets
    List {
        /// Retry transient failures this many times
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
}

#[derive(Subcommand)]
enum PartnerCommands {
    /// List partner datasets, one page
    #[command(after_help = "\
Examples:
  fedlink partner list
  fedlink partner list --page 2 --page-size 50
  fedlink partner list --engine-tag '蓝象-联邦学习:1.0.0' --json")]
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        page_size: u32,

        /// Engine tag filter
        #[arg(long)]
        engine_tag: Option<String>,

        /// Username the grants were made to (default: --username)
        #[arg(long)]
        partner_user: Option<String>,

        /// Retry transient failures this many times
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },

    /// Show column metadata of a partner dataset
    Columns {
        /// Dataset identifier
        metano: String,

        /// Retry transient failures this many times
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Report a task outcome
    #[command(after_help = "\
Examples:
  fedlink report task --task-id 12345678abc2 --status success --total-time 300")]
    Task {
        #[arg(long)]
        task_id: String,

        /// e.g. success, failed, running
        #[arg(long)]
        status: String,

        /// Total run time in seconds
        #[arg(long)]
        total_time: u64,

        /// RFC 3339 timestamp (default: now)
        #[arg(long)]
        exec_time: Option<String>,
    },

    /// Report where an order's result was delivered
    Order {
        #[arg(long, value_enum)]
        order_type: OrderTypeArg,

        #[arg(long)]
        result_address: String,

        #[arg(long, default_value = "")]
        request_param: String,

        #[arg(long)]
        order_id: Option<String>,
    },

    /// Record an operation in the audit log
    Audit {
        #[arg(long)]
        action: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        module: String,

        /// Acting user (default: --username)
        #[arg(long)]
        user: Option<String>,
    },

    /// Report the engine's network addresses
    Network {
        /// Internal address, IP:PORT
        #[arg(long)]
        network_ip: String,

        /// Externally reachable address, IP:PORT
        #[arg(long)]
        access_ip: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OffsetModeArg {
    /// Offset is the page index
    Page,
    /// Offset advances by the rows received
    Row,
}

impl From<OffsetModeArg> for OffsetMode {
    fn from(arg: OffsetModeArg) -> Self {
        match arg {
            OffsetModeArg::Page => OffsetMode::Page,
            OffsetModeArg::Row => OffsetMode::Row,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderTypeArg {
    Api,
    File,
}

impl From<OrderTypeArg> for OrderType {
    fn from(arg: OrderTypeArg) -> Self {
        match arg {
            OrderTypeArg::Api => OrderType::Api,
            OrderTypeArg::File => OrderType::File,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nclient:  fedlink-client ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    };

    // RUST_LOG, when set, overrides the flag-derived level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let overrides = Overrides {
        base_url: cli.base_url,
        token: cli.token,
        namespace_id: cli.namespace,
        username: cli.username,
        timeout_secs: cli.timeout,
    };
    let ctx = Context {
        profile: Profile::resolve(&Settings::load(), &overrides),
        json: cli.json,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Whoami => platform::cmd_whoami(&ctx),
        Commands::Status => platform::cmd_status(&ctx),
        Commands::Config(ConfigCommands::Show) => platform::cmd_config_show(&ctx),
        Commands::Local(LocalCommands::List { retries }) => platform::cmd_local_list(&ctx, retries),
        Commands::Partner(PartnerCommands::List {
            page,
            page_size,
            engine_tag,
            partner_user,
            retries,
        }) => platform::cmd_partner_list(&ctx, page, page_size, engine_tag, partner_user, retries),
        Commands::Partner(PartnerCommands::Columns { metano, retries }) => {
            platform::cmd_partner_columns(&ctx, &metano, retries)
        }
        Commands::Export {
            metano,
            out,
            page_size,
            offset_mode,
        } => export::cmd_export(&ctx, &metano, out, page_size, offset_mode.into()),
        Commands::Report(ReportCommands::Task {
            task_id,
            status,
            total_time,
            exec_time,
        }) => report::cmd_report_task(&ctx, task_id, status, total_time, exec_time),
        Commands::Report(ReportCommands::Order {
            order_type,
            result_address,
            request_param,
            order_id,
        }) => report::cmd_report_order(&ctx, order_type.into(), result_address, request_param, order_id),
        Commands::Report(ReportCommands::Audit {
            action,
            description,
            module,
            user,
        }) => report::cmd_report_audit(&ctx, action, description, module, user),
        Commands::Report(ReportCommands::Network {
            network_ip,
            access_ip,
        }) => report::cmd_report_network(&ctx, network_ip, access_ip),
        Commands::Upload { path, name } => report::cmd_upload(&ctx, &path, name.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
            platform,
        }) => {
            match platform {
                Some(err) if ctx.json => PlatformErrorOutput::from_client_error(&err).print(),
                _ if !message.is_empty() => eprintln!("error: {}", message),
                _ => {}
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Shared command context
// ============================================================================

/// Resolved profile plus output flags, shared by every command.
pub struct Context {
    pub profile: Profile,
    pub json: bool,
    pub quiet: bool,
}

impl Context {
    /// Build a client from the resolved profile. Fails with exit 47 when no
    /// token is configured.
    pub fn client(&self) -> Result<PlatformClient, CliError> {
        let token = self.profile.token().ok_or_else(|| {
            CliError {
                code: EXIT_MISSING_TOKEN,
                message: format!("missing platform token (use --token or set {})", ENV_TOKEN),
                hint: None,
                platform: None,
            }
            .with_hint(format!(
                "or add token = \"...\" to {}",
                Settings::config_path_display()
            ))
        })?;

        let mut builder = ClientSession::builder(token, self.profile.base_url.value.as_str())
            .namespace_id(self.profile.namespace_id.value.as_str())
            .username(self.profile.username.value.as_str())
            .timeout(Duration::from_secs(self.profile.timeout_secs.value));
        if let Some(suffix) = &self.profile.method_suffix.value {
            builder = builder.method_suffix(suffix.as_str());
        }

        let session = builder.build().map_err(|e| {
            CliError::args(e.message).with_hint("check --base-url and --timeout")
        })?;
        log::debug!("session: {:?}", session);
        PlatformClient::new(session).map_err(CliError::platform)
    }

    /// Progress note on stderr, unless --quiet.
    pub fn note(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            eprintln!("{}", msg.as_ref());
        }
    }
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", text).map_err(|e| CliError::io(e.to_string()))
}

/// Write one line to stdout.
pub fn print_line(line: impl AsRef<str>) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", line.as_ref()).map_err(|e| CliError::io(e.to_string()))
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
    /// Original client failure, kept for --json error output
    pub platform: Option<ClientError>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None, platform: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None, platform: None }
    }

    /// Create error from a client failure with the class's exit code.
    pub fn platform(err: ClientError) -> Self {
        use fedlink_client::ErrorKind;

        let hint = match err.kind {
            ErrorKind::NotLoggedIn => Some(format!("token rejected or expired; refresh {}", ENV_TOKEN)),
            ErrorKind::Network => Some("is the platform reachable at --base-url?".to_string()),
            ErrorKind::OutOfMemory => Some("try a smaller --page-size".to_string()),
            _ => None,
        };
        Self {
            code: platform_exit_code(err.kind),
            message: err.to_string(),
            hint,
            platform: Some(err),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        Self::platform(err)
    }
}
