// LLM chess entry point.
//
// `llm-chess` (or `llm-chess play`) runs the terminal game:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Create mpsc channels
// 4. Spawn app logic task
// 5. Run the TUI until the user quits
// 6. Cleanup on exit
//
// `llm-chess serve` runs the browser front-end instead.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};

use llm_chess::app;
use llm_chess::config;
use llm_chess::llm::client::LlmClient;
use llm_chess::tui;
use llm_chess::web;

#[derive(Parser, Debug)]
#[command(name = "llm-chess", version, about = "Play chess against a large language model")]
struct Cli {
    /// Directory holding config/ and defaults/ (defaults to the working directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play in the terminal (default)
    Play,
    /// Serve the browser front-end
    Serve {
        /// Address to bind (overrides [server] host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides [server] port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = match cli.config_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read working directory")?,
    };

    match cli.command.unwrap_or(Command::Play) {
        Command::Play => play(base_dir).await,
        Command::Serve { host, port } => serve(base_dir, host, port).await,
    }
}

async fn play(base_dir: PathBuf) -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing(Some(&base_dir))?;
    info!("LLM chess starting up");

    // 2. Load config
    let config = config::load_config_in(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: human plays {:?}, opponent {}",
        config.game.human_color, config.llm.model
    );

    // 3. Create mpsc channels (before AppState so llm_tx can be passed in)
    let (llm_tx, llm_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let llm_client = LlmClient::from_config(&config);
    let configured: Vec<&str> = llm_client
        .configured_providers()
        .iter()
        .map(|p| p.name())
        .collect();
    info!("API keys configured for: {:?}", configured);

    let app_state = app::AppState::new(config, llm_client, llm_tx);

    // 4. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(llm_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 5. Run the TUI event loop (blocking until user quits)
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {:#}", e);
    }

    // 6. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("LLM chess shut down cleanly");
    Ok(())
}

async fn serve(base_dir: PathBuf, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    init_tracing(None)?;

    let config = config::load_config_in(&base_dir).context("failed to load configuration")?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    web::run(&config, &host, port)
        .await
        .with_context(|| format!("web server on {host}:{port} failed"))
}

/// Initialize tracing.
///
/// The terminal game logs to `logs/llm-chess.log` under `log_base` since the
/// terminal belongs to the TUI; the web server logs to stderr.
fn init_tracing(log_base: Option<&PathBuf>) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("llm_chess=info,warn"));

    match log_base {
        Some(base) => {
            let log_dir = base.join("logs");
            std::fs::create_dir_all(&log_dir)?;
            let log_file = std::fs::File::create(log_dir.join("llm-chess.log"))?;

            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(log_file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }

    Ok(())
}
