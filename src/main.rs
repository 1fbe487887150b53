use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use tablog::Collector;
use tablog_core::config::{Config, Overrides};
use tablog_feeds::DevtoolsClient;

#[derive(Parser)]
#[command(
    name = "tablog",
    version,
    about = "Tab Log — collect browser console and network errors into JSONL"
)]
struct Cli {
    /// Remote-debugging host.
    #[arg(long, env = "CDP_HOST")]
    host: Option<String>,

    /// Remote-debugging port.
    #[arg(short, long, env = "CDP_PORT")]
    port: Option<u16>,

    /// Output JSONL file.
    #[arg(short, long, env = "BROWSER_LOG_FILE")]
    output: Option<PathBuf>,

    /// Config file (defaults to ~/.config/tablog/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write debug logs to /tmp/tablog-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Ok(ExitCode::from(usage_status(&e)));
        }
    };
    init_tracing(cli.debug)?;

    let config = Config::load(&Overrides {
        config_file: cli.config,
        host: cli.host,
        port: cli.port,
        output: cli.output,
    })?;

    let client = Arc::new(DevtoolsClient::new(&config.host.address, config.host.port));
    let authority = config.host.authority();

    let mut collector = match Collector::start(config, client).await {
        Ok(collector) => collector,
        Err(e) => {
            tracing::error!(error = %e, "collector failed to start");
            eprintln!("tablog: cannot collect from {authority}: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let reason = collector.run().await;
    tracing::info!(%reason, "collector exited");
    Ok(ExitCode::from(reason.exit_code()))
}

/// Help and version exit 0. Any other usage error, such as a malformed
/// `CDP_PORT`, fails start-up with status 1.
fn usage_status(e: &clap::Error) -> u8 {
    match e.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    if debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/tablog-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("tablog debug log started — tail -f /tmp/tablog-debug.log");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();
    }
    Ok(())
}
