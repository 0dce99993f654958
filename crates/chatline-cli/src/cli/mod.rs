//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatline_core::{Config, ResponseOrchestrator, logging};
use chatline_providers::HttpBackend;
use chatline_render::{MarkdownEngine, RendererPreference};
use clap::Parser;

mod commands;
pub mod interrupt;
mod surface;

#[derive(Parser)]
#[command(name = "chatline")]
#[command(version)]
#[command(about = "Terminal chat client with streaming markdown replies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Send one message and print the rendered reply
    Send {
        /// The message to send
        message: String,

        /// Print the reply text instead of HTML markup
        #[arg(long)]
        raw: bool,

        /// User ID to send as (overrides config)
        #[arg(long, value_name = "ID", env = "CHATLINE_USER")]
        user: Option<String>,

        /// Echo streamed text to stderr even when it is not a terminal
        #[arg(long)]
        progress: bool,
    },

    /// Interactive chat over stdin, one turn per line (`:q` quits)
    Chat {
        /// Print reply text instead of HTML markup
        #[arg(long)]
        raw: bool,

        /// User ID to send as (overrides config)
        #[arg(long, value_name = "ID", env = "CHATLINE_USER")]
        user: Option<String>,
    },

    /// Render markdown from a file (or stdin) to HTML
    Render {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,

        /// Renderer to use: auto, external or fallback
        #[arg(long, value_name = "ENGINE")]
        engine: Option<RendererPreference>,
    },

    /// Clear the server-side conversation history
    Reset {
        /// User ID whose conversation to clear (overrides config)
        #[arg(long, value_name = "ID", env = "CHATLINE_USER")]
        user: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the config file path
    Path,
    /// Create a default config file
    Init,
    /// Print a config file populated with default values
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        };
    }

    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging).context("init logging")?;
    interrupt::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Send {
            message,
            raw,
            user,
            progress,
        } => {
            let user = user.unwrap_or_else(|| config.user_id.clone());
            commands::send::run(&config, &user, &message, raw, progress).await
        }
        Commands::Chat { raw, user } => {
            let user = user.unwrap_or_else(|| config.user_id.clone());
            commands::chat::run(&config, &user, raw).await
        }
        Commands::Render { file, engine } => {
            commands::render::run(file.as_deref(), engine.unwrap_or(config.renderer))
        }
        Commands::Reset { user } => {
            let user = user.unwrap_or_else(|| config.user_id.clone());
            commands::reset::run(&config, &user).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Builds the orchestrator for the configured endpoint and renderer.
fn build_orchestrator(config: &Config) -> Result<ResponseOrchestrator<HttpBackend>> {
    let backend = HttpBackend::new(config.backend_config()?).context("create HTTP backend")?;
    let engine = MarkdownEngine::detect(config.renderer);
    tracing::debug!(
        base_url = %backend.config().base_url,
        renderer = engine.active_name(),
        "orchestrator ready"
    );
    Ok(ResponseOrchestrator::new(backend, engine).with_cursor(config.cursor.clone()))
}
