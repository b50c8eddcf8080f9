mod config_commands;

use std::path::PathBuf;

use {
    anyhow::Context as _,
    clap::{Parser, Subcommand},
    linecord_config::BridgeConfig,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use linecord_config::validate::{self, Severity};

#[derive(Parser)]
#[command(name = "linecord", about = "linecord: Discord ↔ LINE message bridge", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/linecord/).
    #[arg(long, short, global = true, env = "LINECORD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value and PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge (default when no subcommand is provided).
    Serve,
    /// Validate the configuration and report errors/warnings.
    Check,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load config from `--config` or discovery, then layer env and CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => linecord_config::load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => linecord_config::discover_and_load(),
    };
    linecord_config::apply_env_overrides(&mut config);

    if let Some(bind) = cli.bind.as_ref() {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

async fn serve(config: BridgeConfig) -> anyhow::Result<()> {
    let diagnostics = validate::validate(&config);
    for d in &diagnostics {
        match d.severity {
            Severity::Error => error!(path = d.path, "{}", d.message),
            Severity::Warning => warn!(path = d.path, "{}", d.message),
        }
    }
    if validate::has_errors(&diagnostics) {
        anyhow::bail!("invalid configuration, run `linecord check` for details");
    }

    linecord_gateway::start_gateway(config).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "linecord starting");

    let config = load_config(&cli)?;
    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Check) => config_commands::check(&config),
    }
}
