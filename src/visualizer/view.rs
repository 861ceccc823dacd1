//! One visualization view: the analysis tap, the surface and the renderer,
//! driven a frame at a time.

use super::analyzer::{AnalyzerBinding, AnalyzerConfig, AnalyzerError, SignalSource};
use super::reducer::{reduce, ReduceError};
use super::renderer::{CurveRenderer, RenderStyle};
use super::surface::{Resolution, Surface, SurfaceGeometry};
use crate::config::{VisualizationMode, VisualizerConfig};

/// Why a frame produced no drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No analysis tap is attached yet.
    TapUnavailable,
    /// The snapshot is shorter than the segment count.
    InsufficientSamples,
    /// The surface has zero area.
    EmptySurface,
}

/// Result of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    Skipped(SkipReason),
}

/// Per-frame visualization pipeline.
///
/// A frame reads the snapshot, reduces it, sizes the surface and repaints.
/// Any failure skips the frame without disturbing the next one.
pub struct Visualizer {
    analyzer: AnalyzerBinding,
    surface: Surface,
    renderer: CurveRenderer,
    mode: VisualizationMode,
    segments: usize,
    frames_rendered: u64,
}

impl Visualizer {
    pub fn new(config: &VisualizerConfig) -> Self {
        let style = RenderStyle {
            line_width: config.line_width,
            glow_gain: config.glow_gain,
            ..RenderStyle::default()
        };

        Self {
            analyzer: AnalyzerBinding::new(AnalyzerConfig {
                fft_size: config.fft_size,
                smoothing: config.smoothing,
            }),
            surface: Surface::new(),
            renderer: CurveRenderer::new(style),
            mode: config.mode,
            segments: config.segments,
            frames_rendered: 0,
        }
    }

    /// Attaches the analysis tap if it is not attached yet.
    ///
    /// # Errors
    /// - If `connect` fails; the view stays detached and may be retried
    pub fn attach_tap<F>(&mut self, connect: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<Box<dyn SignalSource>>,
    {
        self.analyzer.attach(connect).map(|_| ())
    }

    pub fn is_tap_attached(&self) -> bool {
        self.analyzer.is_attached()
    }

    pub fn mode(&self) -> VisualizationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: VisualizationMode) {
        self.mode = mode;
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Runs one frame against the host's current `geometry`.
    pub fn tick(&mut self, geometry: SurfaceGeometry) -> TickOutcome {
        let segments = self.segments;

        let reduced = match self.analyzer.read() {
            Ok(snapshot) => reduce(snapshot.as_slice(), segments),
            Err(AnalyzerError::NotAttached) => {
                return TickOutcome::Skipped(SkipReason::TapUnavailable);
            }
        };
        let reduced = match reduced {
            Ok(reduced) => reduced,
            Err(err) => return skip_reduce(err),
        };

        let points = match self.mode {
            VisualizationMode::Waveform => reduced.points,
            VisualizationMode::Spectrum => {
                // Same window as the snapshot above; nothing is pulled twice
                let bars = match self.analyzer.read_frequency() {
                    Ok(bins) => reduce(bins, segments),
                    Err(AnalyzerError::NotAttached) => {
                        return TickOutcome::Skipped(SkipReason::TapUnavailable);
                    }
                };
                match bars {
                    Ok(bars) => bars.points,
                    Err(err) => return skip_reduce(err),
                }
            }
        };

        if self.surface.ensure_resolution(geometry) == Resolution::Empty {
            tracing::trace!("Skipping frame: empty surface");
            return TickOutcome::Skipped(SkipReason::EmptySurface);
        }

        let drawn = match self.mode {
            VisualizationMode::Waveform => {
                self.renderer
                    .render(&mut self.surface, &points, reduced.intensity)
            }
            VisualizationMode::Spectrum => {
                self.renderer
                    .render_spectrum(&mut self.surface, &points, reduced.intensity)
            }
        };

        if drawn {
            self.frames_rendered += 1;
            TickOutcome::Rendered
        } else {
            TickOutcome::Skipped(SkipReason::EmptySurface)
        }
    }
}

fn skip_reduce(err: ReduceError) -> TickOutcome {
    tracing::trace!("Skipping frame: {}", err);
    TickOutcome::Skipped(SkipReason::InsufficientSamples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::analyzer::tests::QueueSource;

    fn small_config() -> VisualizerConfig {
        VisualizerConfig {
            fft_size: 64,
            segments: 16,
            ..VisualizerConfig::default()
        }
    }

    fn geometry() -> SurfaceGeometry {
        SurfaceGeometry::new(40.0, 20.0, 1.0)
    }

    #[test]
    fn test_tick_without_tap_is_skipped() {
        let mut view = Visualizer::new(&small_config());

        assert_eq!(
            view.tick(geometry()),
            TickOutcome::Skipped(SkipReason::TapUnavailable)
        );
        assert!(view.surface().backing_size().is_none());
        assert_eq!(view.frames_rendered(), 0);
    }

    #[test]
    fn test_tick_renders_once_attached() {
        let mut view = Visualizer::new(&small_config());
        view.attach_tap(|| Ok(Box::new(QueueSource::default())))
            .unwrap();

        assert_eq!(view.tick(geometry()), TickOutcome::Rendered);
        assert_eq!(view.surface().backing_size(), Some((40, 20)));
        assert_eq!(view.frames_rendered(), 1);
    }

    #[test]
    fn test_failed_attach_leaves_view_retryable() {
        let mut view = Visualizer::new(&small_config());

        assert!(view.attach_tap(|| anyhow::bail!("no device")).is_err());
        assert!(!view.is_tap_attached());

        view.attach_tap(|| Ok(Box::new(QueueSource::default())))
            .unwrap();
        assert!(view.is_tap_attached());
    }

    #[test]
    fn test_empty_geometry_is_skipped() {
        let mut view = Visualizer::new(&small_config());
        view.attach_tap(|| Ok(Box::new(QueueSource::default())))
            .unwrap();

        assert_eq!(
            view.tick(SurfaceGeometry::new(0.0, 20.0, 1.0)),
            TickOutcome::Skipped(SkipReason::EmptySurface)
        );
    }

    #[test]
    fn test_too_many_segments_is_skipped() {
        let config = VisualizerConfig {
            fft_size: 32,
            segments: 64,
            ..VisualizerConfig::default()
        };
        let mut view = Visualizer::new(&config);
        view.attach_tap(|| Ok(Box::new(QueueSource::default())))
            .unwrap();

        assert_eq!(
            view.tick(geometry()),
            TickOutcome::Skipped(SkipReason::InsufficientSamples)
        );
    }

    #[test]
    fn test_spectrum_mode_renders() {
        let mut view = Visualizer::new(&small_config());
        view.set_mode(VisualizationMode::Spectrum);
        let source = QueueSource::default();
        let feed = source.clone();
        view.attach_tap(move || Ok(Box::new(source))).unwrap();

        let tone: Vec<f32> = (0..64).map(|i| (i as f32 * 0.7).sin() * 0.8).collect();
        feed.push(&tone);

        assert_eq!(view.tick(geometry()), TickOutcome::Rendered);
        assert_eq!(view.mode(), VisualizationMode::Spectrum);
    }

    #[test]
    fn test_spectrum_with_too_few_bins_is_skipped() {
        // 64-sample window yields 32 bins, fewer than 48 bars
        let config = VisualizerConfig {
            fft_size: 64,
            segments: 48,
            mode: VisualizationMode::Spectrum,
            ..VisualizerConfig::default()
        };
        let mut view = Visualizer::new(&config);
        view.attach_tap(|| Ok(Box::new(QueueSource::default())))
            .unwrap();

        assert_eq!(
            view.tick(geometry()),
            TickOutcome::Skipped(SkipReason::InsufficientSamples)
        );
    }
}
