//! Interactive session: the player and news pages in one terminal shell.

use anyhow::Result;
use tokio::task::LocalSet;

use crate::config::AuraConfig;
use crate::player::{build_catalog, AudioSource, PlayerBackend};
use crate::ui::error::wait_for_dismiss;
use crate::ui::{show_fatal, Page, Shell};

/// Opens the player page, optionally with `source` (file path or URL) first
/// in the catalog.
///
/// # Errors
/// - If the configuration is invalid
/// - If the source cannot be resolved
/// - If no player binary is installed
/// - If the terminal fails
pub async fn handle_play(source: Option<String>) -> Result<()> {
    run_session(Page::Player, source).await
}

/// Runs the shell starting on `start`.
pub(crate) async fn run_session(start: Page, source_arg: Option<String>) -> Result<()> {
    tracing::info!("=== Aura Player Started ===");

    let config = match AuraConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            show_fatal(&format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/aura/aura.toml file and try again."
            ));
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, mode={}, fft_size={}, segments={}, frame_rate={}",
        config.audio.device,
        config.visualizer.mode,
        config.visualizer.fft_size,
        config.visualizer.segments,
        config.visualizer.frame_rate
    );

    let explicit = match source_arg.as_deref().map(AudioSource::from_arg).transpose() {
        Ok(source) => source,
        Err(err) => {
            tracing::error!("Invalid source: {err}");
            show_fatal(&format!("Source Error:\n\n{err}"));
            return Err(err);
        }
    };
    let catalog = build_catalog(&config.catalog, explicit);

    let backend = match PlayerBackend::detect() {
        Ok(backend) => backend,
        Err(err) => {
            tracing::error!("No player available: {err}");
            show_fatal(&format!("Playback Error:\n\n{err}"));
            return Err(err);
        }
    };
    tracing::info!("Using {} for playback", backend.name());

    let mut shell = Shell::new(config, catalog, backend)?;
    let result = LocalSet::new().run_until(shell.run(start)).await;

    if let Err(err) = &result {
        tracing::error!("Session failed: {err:#}");
        let _ = wait_for_dismiss(shell.terminal_mut(), &format!("Error:\n\n{err}"));
    }
    shell.cleanup()?;
    result
}
