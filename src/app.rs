//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands::{self, SnapshotOptions};
use crate::config::VisualizationMode;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A terminal audio player with a real-time audio-reactive visualizer
#[derive(Parser)]
#[command(name = "aura")]
#[command(version)]
#[command(about = "Aura Player: your daily audio & news companion")]
#[command(long_about = "Aura Player: your daily audio & news companion.\n\nA terminal audio player with a real-time, audio-reactive waveform visualizer\nand a top-headlines page.\n\nDEFAULT COMMAND:\n    If no command is specified, 'play' is used by default.\n    A file or URL can be given without explicitly saying 'play'.\n\nEXAMPLES:\n    # Open the player with the configured catalog\n    $ aura\n    \n    # Play a local file or a stream\n    $ aura episode.mp3\n    $ aura play https://example.com/show.m4a\n    \n    # Browse top headlines\n    $ aura news\n    \n    # Render one frame of what the capture device hears\n    $ aura snapshot -o frame.png\n    \n    # Find the capture device to visualize\n    $ aura list-devices")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/aura/aura.toml\n    Logs:               ~/.local/state/aura/aura.log.*"
)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Audio file or URL to play (play default command)
    #[arg(value_name = "SOURCE")]
    source: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the player with the live visualization (default)
    ///
    /// Space to play/pause, arrows to seek and choose a source, Enter to
    /// switch source, v to change visualization, Tab for news, q to quit.
    #[command(visible_alias = "p")]
    Play {
        /// Audio file or URL, listed first in the catalog
        #[arg(value_name = "SOURCE")]
        source: Option<String>,
    },

    /// Browse top headlines
    ///
    /// Requires a news API key in aura.toml or AURA_NEWS_API_KEY.
    #[command(visible_alias = "n")]
    News,

    /// Render one visualization frame to a PNG file
    ///
    /// Captures from the configured device for a moment, then renders a
    /// single frame at the given logical size and pixel ratio.
    Snapshot {
        /// Output PNG file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Logical width
        #[arg(long, default_value_t = 600)]
        width: u32,

        /// Logical height
        #[arg(long, default_value_t = 300)]
        height: u32,

        /// Device pixels per logical pixel
        #[arg(long, default_value_t = 2.0)]
        scale: f32,

        /// How long to capture before rendering, in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 500)]
        capture_ms: u64,

        /// Visualization to render (defaults to the configured one)
        #[arg(long, value_enum)]
        mode: Option<VisualizationMode>,

        /// Render the silent baseline without opening the capture device
        #[arg(long)]
        no_capture: bool,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List audio capture devices
    ///
    /// Shows device IDs, names and configurations to help choose the
    /// device the visualizer listens on.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   aura completions bash > aura.bash
    ///   aura completions zsh > _aura
    ///   aura completions fish > aura.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that need neither logging nor config
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "aura", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None => commands::handle_play(cli.source).await?,
        Some(Commands::Play { source }) => commands::handle_play(source).await?,
        Some(Commands::News) => commands::handle_news().await?,
        Some(Commands::Snapshot {
            output,
            width,
            height,
            scale,
            capture_ms,
            mode,
            no_capture,
        }) => {
            commands::handle_snapshot(SnapshotOptions {
                output,
                width,
                height,
                scale,
                capture_ms,
                mode,
                no_capture,
            })
            .await?
        }
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
