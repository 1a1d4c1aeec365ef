mod commands;
mod logging;
mod serve;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use procflow_config::{Config, ConfigLoader};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Process workflow engine.
#[derive(Parser)]
#[command(name = "procflow", version, about = "Process workflow engine")]
struct Cli {
    /// Path to the process config file (JSON or YAML).
    /// Defaults to $PROCFLOW_CONFIG, then ./config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the config, build the registry and compile every payload schema
    Check,

    /// Start the HTTP API over an in-memory store
    Serve {
        /// Port to listen on (default: server.port from the config, then 3000)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level) {
        report_error(&format!("{:#}", e), cli.output);
        process::exit(1);
    }

    let result = match cli.command {
        Commands::Check => commands::check::cmd_check(cli.config.as_deref(), cli.output),
        Commands::Serve { port } => run_server(cli.config.as_deref(), port),
    };

    if let Err(e) = result {
        report_error(&format!("{:#}", e), cli.output);
        process::exit(1);
    }
}

fn run_server(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let (path, config) = load_config(config_path)?;
    tracing::info!(config = %path.display(), "config loaded");
    let port = port.unwrap_or(config.server.port);
    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    rt.block_on(serve::start_server(port, config))
}

/// Load the config from `--config`, `$PROCFLOW_CONFIG` or the default path.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<(PathBuf, Config)> {
    let mut loader = ConfigLoader::from_env();
    if let Some(path) = path {
        loader = loader.with_path(path);
    }
    let config = loader
        .load()
        .with_context(|| format!("failed to load config {}", loader.path().display()))?;
    Ok((loader.path().to_path_buf(), config))
}

pub(crate) fn report_error(msg: &str, output: OutputFormat) {
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
