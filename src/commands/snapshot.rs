//! Render a single visualization frame to a PNG file.
//!
//! Useful for checking the capture device and the look of the visualization
//! without opening the TUI.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{AuraConfig, VisualizationMode};
use crate::visualizer::{
    CaptureTap, SignalSource, SkipReason, SurfaceGeometry, TickOutcome, Visualizer,
};

/// Options of the `snapshot` command.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub capture_ms: u64,
    pub mode: Option<VisualizationMode>,
    pub no_capture: bool,
}

/// Source that never delivers samples, giving the silent baseline frame.
struct SilentSource;

impl SignalSource for SilentSource {
    fn pull(&mut self, _out: &mut Vec<f32>) {}

    fn sample_rate(&self) -> u32 {
        48_000
    }
}

/// Captures for a moment, renders one frame and writes it as PNG.
///
/// # Errors
/// - If the configuration is invalid
/// - If the capture device cannot be opened
/// - If the frame cannot be rendered or written
pub async fn handle_snapshot(options: SnapshotOptions) -> Result<()> {
    let config = AuraConfig::load().context("load configuration")?;

    let mut visualizer = Visualizer::new(&config.visualizer);
    if let Some(mode) = options.mode {
        visualizer.set_mode(mode);
    }

    if options.no_capture {
        visualizer.attach_tap(|| Ok(Box::new(SilentSource)))?;
    } else {
        let device = config.audio.device.clone();
        visualizer.attach_tap(move || Ok(Box::new(CaptureTap::open(&device)?)))?;
        tracing::debug!("Capturing for {}ms", options.capture_ms);
        tokio::time::sleep(Duration::from_millis(options.capture_ms)).await;
    }

    let geometry = SurfaceGeometry::new(options.width as f32, options.height as f32, options.scale);
    render_to_file(&mut visualizer, geometry, &options.output)?;

    println!("Snapshot written to {}", options.output.display());
    Ok(())
}

/// Runs one frame and saves the surface.
fn render_to_file(visualizer: &mut Visualizer, geometry: SurfaceGeometry, output: &Path) -> Result<()> {
    match visualizer.tick(geometry) {
        TickOutcome::Rendered => {}
        TickOutcome::Skipped(SkipReason::EmptySurface) => {
            return Err(anyhow!("Snapshot size must be greater than zero"));
        }
        TickOutcome::Skipped(SkipReason::InsufficientSamples) => {
            return Err(anyhow!("visualizer.segments is larger than the analysis window"));
        }
        TickOutcome::Skipped(SkipReason::TapUnavailable) => {
            return Err(anyhow!("No analysis tap attached"));
        }
    }

    let pixmap = visualizer
        .surface()
        .pixmap()
        .ok_or_else(|| anyhow!("Surface has no backing buffer"))?;
    pixmap
        .save_png(output)
        .map_err(|e| anyhow!("Failed to write {}: {e}", output.display()))?;

    tracing::info!(
        "Snapshot {}x{} written to {}",
        pixmap.width(),
        pixmap.height(),
        output.display()
    );
    Ok(())
}
