//! Read-only analysis tap on the live signal path.
//!
//! The binding owns at most one `AnalysisHandle` for the lifetime of a view. The
//! handle is created lazily, inside the handler of the user gesture that starts
//! playback, and is never recreated afterwards. Until then every read reports
//! `AnalyzerError::NotAttached` so callers can skip the frame.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use thiserror::Error;

/// Byte value that represents silence in a time-domain snapshot.
pub const SILENCE_MIDPOINT: u8 = 128;

/// Default analysis window (history depth) in samples.
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Default temporal smoothing applied to the spectral readout.
pub const DEFAULT_SMOOTHING: f32 = 0.88;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Conditions under which the binding cannot produce data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnalyzerError {
    /// No tap has been attached yet (no qualifying user gesture so far).
    #[error("analysis tap not yet available")]
    NotAttached,
}

/// A live signal path the tap can read from without altering it.
///
/// Implementations hand over mono samples in `[-1.0, 1.0]` that arrived since
/// the previous call. They must never block.
pub trait SignalSource {
    /// Appends newly available samples to `out`.
    fn pull(&mut self, out: &mut Vec<f32>);

    /// Rate the samples were captured at, in Hz.
    fn sample_rate(&self) -> u32;
}

/// Fixed analysis parameters of a tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    pub fft_size: usize,
    pub smoothing: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

/// Time-domain snapshot of the most recent analysis window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSnapshot {
    samples: Vec<u8>,
}

impl SampleSnapshot {
    /// A snapshot of `len` silent samples.
    pub fn silent(len: usize) -> Self {
        Self {
            samples: vec![SILENCE_MIDPOINT; len],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Overwrites the snapshot in place from float history.
    ///
    /// History shorter than the window leaves the oldest slots silent.
    fn refresh(&mut self, history: &VecDeque<f32>) {
        let len = self.samples.len();
        let pad = len.saturating_sub(history.len());
        let skip = history.len().saturating_sub(len);

        self.samples[..pad].fill(SILENCE_MIDPOINT);
        for (slot, &sample) in self.samples[pad..].iter_mut().zip(history.iter().skip(skip)) {
            *slot = sample_to_byte(sample);
        }
    }
}

/// Maps a float sample to the unsigned byte domain.
pub fn sample_to_byte(sample: f32) -> u8 {
    (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8
}

/// Spectral readout state: the FFT plan and the smoothed magnitudes carried
/// from one read to the next.
struct Spectrum {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl Spectrum {
    fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(fft_size),
            window: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            bytes: vec![0; fft_size / 2],
        }
    }

    fn update(&mut self, history: &VecDeque<f32>, smoothing: f32) -> &[u8] {
        let fft_size = self.buffer.len();
        let pad = fft_size.saturating_sub(history.len());
        let skip = history.len().saturating_sub(fft_size);

        for slot in &mut self.buffer[..pad] {
            *slot = Complex::new(0.0, 0.0);
        }
        for (i, &sample) in history.iter().skip(skip).enumerate() {
            let idx = pad + i;
            self.buffer[idx] = Complex::new(sample * self.window[idx], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / fft_size as f32;
        let db_range = MAX_DECIBELS - MIN_DECIBELS;
        for (k, (smoothed, byte)) in self.smoothed.iter_mut().zip(self.bytes.iter_mut()).enumerate() {
            let magnitude = self.buffer[k].norm() * scale;
            *smoothed = smoothing * *smoothed + (1.0 - smoothing) * magnitude;

            let db = if *smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            *byte = (255.0 * (db - MIN_DECIBELS) / db_range).clamp(0.0, 255.0) as u8;
        }

        &self.bytes
    }
}

fn blackman_window(len: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let n = len as f32;
    (0..len)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}

/// A live tap: one signal source plus the buffers refreshed on each read.
pub struct AnalysisHandle {
    source: Box<dyn SignalSource>,
    config: AnalyzerConfig,
    incoming: Vec<f32>,
    history: VecDeque<f32>,
    snapshot: SampleSnapshot,
    spectrum: Spectrum,
    /// How long the source may stay quiet before the window reads as silence.
    stale_after: Duration,
    last_audio: Option<Instant>,
}

impl AnalysisHandle {
    fn new(source: Box<dyn SignalSource>, config: AnalyzerConfig) -> Self {
        let stale_after = window_duration(config.fft_size, source.sample_rate());
        Self {
            source,
            config,
            incoming: Vec::with_capacity(config.fft_size),
            history: VecDeque::with_capacity(config.fft_size),
            snapshot: SampleSnapshot::silent(config.fft_size),
            spectrum: Spectrum::new(config.fft_size),
            stale_after,
            last_audio: None,
        }
    }

    /// Moves whatever the source captured since the last read into the window.
    ///
    /// Once a whole window's worth of time passes without samples the
    /// history is dropped, so a stalled or unplugged source reads as silence.
    fn pull(&mut self) {
        self.incoming.clear();
        self.source.pull(&mut self.incoming);

        if self.incoming.is_empty() {
            let stalled = self
                .last_audio
                .is_some_and(|last| last.elapsed() >= self.stale_after);
            if stalled {
                tracing::debug!("No audio for {:?}, window reset to silence", self.stale_after);
                self.history.clear();
                self.last_audio = None;
            }
            return;
        }
        self.last_audio = Some(Instant::now());

        let window = self.config.fft_size;
        if self.incoming.len() >= window {
            self.history.clear();
            self.history
                .extend(&self.incoming[self.incoming.len() - window..]);
        } else {
            let overflow = (self.history.len() + self.incoming.len()).saturating_sub(window);
            self.history.drain(..overflow);
            self.history.extend(&self.incoming);
        }
    }

    /// Refreshes and returns the time-domain snapshot.
    pub fn read(&mut self) -> &SampleSnapshot {
        self.pull();
        self.snapshot.refresh(&self.history);
        &self.snapshot
    }

    /// Advances and returns the smoothed frequency-domain readout
    /// (`fft_size / 2` bins, 0-255) of the window captured by the latest
    /// `read`, so both readouts of a frame describe the same samples.
    pub fn read_frequency(&mut self) -> &[u8] {
        self.spectrum.update(&self.history, self.config.smoothing)
    }
}

/// Time spanned by `fft_size` samples at `sample_rate`.
fn window_duration(fft_size: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(fft_size as f64 / f64::from(sample_rate.max(1)))
}

/// Owner of the optional analysis tap for one view.
pub struct AnalyzerBinding {
    config: AnalyzerConfig,
    handle: Option<AnalysisHandle>,
}

impl AnalyzerBinding {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            handle: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Attaches the tap, connecting the signal source on the first call only.
    ///
    /// Subsequent calls return the existing handle without invoking `connect`;
    /// a signal path can only be tapped once.
    ///
    /// # Errors
    /// - If `connect` fails on the first attachment
    pub fn attach<F>(&mut self, connect: F) -> anyhow::Result<&mut AnalysisHandle>
    where
        F: FnOnce() -> anyhow::Result<Box<dyn SignalSource>>,
    {
        if self.handle.is_none() {
            let source = connect()?;
            tracing::info!(
                "Analysis tap attached (window {} samples, smoothing {})",
                self.config.fft_size,
                self.config.smoothing
            );
            self.handle = Some(AnalysisHandle::new(source, self.config));
        } else {
            tracing::debug!("Analysis tap already attached");
        }

        self.handle
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("analysis tap missing after attach"))
    }

    /// Returns the handle if the tap has been attached.
    pub fn handle(&mut self) -> Result<&mut AnalysisHandle, AnalyzerError> {
        self.handle.as_mut().ok_or(AnalyzerError::NotAttached)
    }

    /// Reads the current time-domain snapshot.
    pub fn read(&mut self) -> Result<&SampleSnapshot, AnalyzerError> {
        Ok(self.handle()?.read())
    }

    /// Reads the smoothed spectrum of the window taken by the last `read`.
    pub fn read_frequency(&mut self) -> Result<&[u8], AnalyzerError> {
        Ok(self.handle()?.read_frequency())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Source fed from a shared queue, standing in for a capture callback.
    #[derive(Clone)]
    pub(crate) struct QueueSource {
        pub queue: Rc<RefCell<Vec<f32>>>,
        pub rate: u32,
    }

    impl Default for QueueSource {
        // 1 Hz keeps small test windows from going stale between reads
        fn default() -> Self {
            Self::with_sample_rate(1)
        }
    }

    impl QueueSource {
        pub fn with_sample_rate(rate: u32) -> Self {
            Self {
                queue: Rc::default(),
                rate,
            }
        }

        pub fn push(&self, samples: &[f32]) {
            self.queue.borrow_mut().extend_from_slice(samples);
        }
    }

    impl SignalSource for QueueSource {
        fn pull(&mut self, out: &mut Vec<f32>) {
            out.append(&mut self.queue.borrow_mut());
        }

        fn sample_rate(&self) -> u32 {
            self.rate
        }
    }

    fn small_config() -> AnalyzerConfig {
        AnalyzerConfig {
            fft_size: 8,
            smoothing: 0.5,
        }
    }

    #[test]
    fn test_read_before_attach_is_not_available() {
        let mut binding = AnalyzerBinding::new(AnalyzerConfig::default());
        assert_eq!(binding.read().err(), Some(AnalyzerError::NotAttached));
        assert_eq!(binding.read_frequency().err(), Some(AnalyzerError::NotAttached));
        assert!(!binding.is_attached());
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut binding = AnalyzerBinding::new(small_config());
        let mut connects = 0;

        binding
            .attach(|| {
                connects += 1;
                Ok(Box::new(QueueSource::default()))
            })
            .unwrap();
        binding
            .attach(|| {
                connects += 1;
                Err(anyhow::anyhow!("signal path already tapped"))
            })
            .unwrap();

        assert_eq!(connects, 1);
        assert!(binding.is_attached());
    }

    #[test]
    fn test_failed_attach_leaves_binding_detached() {
        let mut binding = AnalyzerBinding::new(small_config());
        assert!(binding
            .attach(|| Err(anyhow::anyhow!("no capture device")))
            .is_err());
        assert!(!binding.is_attached());
    }

    #[test]
    fn test_silent_when_no_audio_flows() {
        let mut binding = AnalyzerBinding::new(AnalyzerConfig::default());
        binding
            .attach(|| Ok(Box::new(QueueSource::default())))
            .unwrap();

        let snapshot = binding.read().unwrap();
        assert_eq!(snapshot.len(), DEFAULT_FFT_SIZE);
        assert!(snapshot.as_slice().iter().all(|&s| s == SILENCE_MIDPOINT));
    }

    #[test]
    fn test_snapshot_keeps_latest_window() {
        let source = QueueSource::default();
        let mut binding = AnalyzerBinding::new(small_config());
        let feed = source.clone();
        binding.attach(move || Ok(Box::new(source))).unwrap();

        feed.push(&[0.5, -0.5]);
        let snapshot = binding.read().unwrap().as_slice().to_vec();
        assert_eq!(snapshot, vec![128, 128, 128, 128, 128, 128, 192, 64]);

        feed.push(&[1.0; 10]);
        let snapshot = binding.read().unwrap().as_slice().to_vec();
        assert_eq!(snapshot, vec![255; 8]);

        // Nothing new arrived within a window's time: the window is kept
        let snapshot = binding.read().unwrap().as_slice().to_vec();
        assert_eq!(snapshot, vec![255; 8]);
    }

    #[test]
    fn test_stalled_source_returns_to_silence() {
        // 8 samples at 8 kHz: a window spans 1ms
        let source = QueueSource::with_sample_rate(8_000);
        let feed = source.clone();
        let mut binding = AnalyzerBinding::new(small_config());
        binding.attach(move || Ok(Box::new(source))).unwrap();

        feed.push(&[1.0; 8]);
        assert_eq!(binding.read().unwrap().as_slice(), &[255; 8]);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(binding.read().unwrap().as_slice(), &[SILENCE_MIDPOINT; 8]);

        // Audio resuming refills the window
        feed.push(&[-1.0; 8]);
        assert_eq!(binding.read().unwrap().as_slice(), &[0; 8]);
    }

    #[test]
    fn test_frequency_readout_shares_the_read_window() {
        let source = QueueSource::default();
        let feed = source.clone();
        let config = AnalyzerConfig {
            fft_size: 64,
            smoothing: 0.0,
        };
        let mut binding = AnalyzerBinding::new(config);
        binding.attach(move || Ok(Box::new(source))).unwrap();
        binding.read().unwrap();

        // Samples queued after the read stay out of this frame's spectrum
        let tone: Vec<f32> = (0..64)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / 64.0).sin())
            .collect();
        feed.push(&tone);
        assert!(binding.read_frequency().unwrap().iter().all(|&bin| bin == 0));

        binding.read().unwrap();
        assert!(binding.read_frequency().unwrap()[8] > 0);
    }

    #[test]
    fn test_window_duration() {
        assert_eq!(window_duration(2048, 48_000), Duration::from_secs_f64(2048.0 / 48_000.0));
        assert_eq!(window_duration(8, 0), Duration::from_secs(8));
    }

    #[test]
    fn test_sample_to_byte_clamps() {
        assert_eq!(sample_to_byte(0.0), 128);
        assert_eq!(sample_to_byte(-1.0), 0);
        assert_eq!(sample_to_byte(1.0), 255);
        assert_eq!(sample_to_byte(-3.0), 0);
        assert_eq!(sample_to_byte(2.0), 255);
    }

    #[test]
    fn test_frequency_readout_is_smoothed() {
        let source = QueueSource::default();
        let feed = source.clone();
        let config = AnalyzerConfig {
            fft_size: 64,
            smoothing: 0.88,
        };
        let mut binding = AnalyzerBinding::new(config);
        binding.attach(move || Ok(Box::new(source))).unwrap();

        // A tone centred on bin 8
        let tone: Vec<f32> = (0..64)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / 64.0).sin())
            .collect();
        feed.push(&tone);
        binding.read().unwrap();
        let first = binding.read_frequency().unwrap().to_vec();
        let second = binding.read_frequency().unwrap().to_vec();

        assert_eq!(first.len(), 32);
        // The peak bin rises as the smoothed magnitude converges
        assert!(second[8] > first[8]);
        assert!(first[8] > first[20]);
    }
}
