//! Playback transport.
//!
//! Audio is played by an external player process (ffplay, or mpv as a
//! fallback). The transport owns that process, a playback clock and the
//! currently selected source. Pausing and seeking stop the process and
//! restart it from the new position.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use super::locate::{find_binary, install_hint};
use super::source::{AudioSource, Location};

/// Seek step for the arrow keys.
pub const SEEK_STEP: Duration = Duration::from_secs(5);

/// Snapshot of what the transport is doing, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub source: Option<AudioSource>,
    pub is_playing: bool,
    pub current_time: Duration,
    pub duration: Option<Duration>,
}

/// Position tracker that advances with wall time while running.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    /// Position accumulated up to the last start/pause
    base: Duration,
    /// When the clock was last started, if running
    started_at: Option<Instant>,
}

impl PlaybackClock {
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn position(&self) -> Duration {
        self.position_at(Instant::now())
    }

    pub fn position_at(&self, now: Instant) -> Duration {
        self.base
            + self
                .started_at
                .map(|start| now.saturating_duration_since(start))
                .unwrap_or_default()
    }

    pub fn start_at(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn pause_at(&mut self, now: Instant) {
        self.base = self.position_at(now);
        self.started_at = None;
    }

    /// Jumps to `position`, keeping the running state.
    pub fn set_at(&mut self, position: Duration, now: Instant) {
        self.base = position;
        if self.started_at.is_some() {
            self.started_at = Some(now);
        }
    }
}

/// External program used for audio output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerBackend {
    Ffplay(PathBuf),
    Mpv(PathBuf),
}

impl PlayerBackend {
    /// Locates ffplay, falling back to mpv.
    ///
    /// # Errors
    /// - If neither player is installed
    pub fn detect() -> Result<Self> {
        if let Ok(path) = find_binary("ffplay") {
            return Ok(Self::Ffplay(path));
        }
        if let Ok(path) = find_binary("mpv") {
            return Ok(Self::Mpv(path));
        }
        Err(anyhow!(install_hint()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ffplay(_) => "ffplay",
            Self::Mpv(_) => "mpv",
        }
    }

    /// Builds the command that plays `location` starting at `start`.
    pub fn command(&self, location: &Location, start: Duration) -> Command {
        let start = format!("{:.3}", start.as_secs_f64());
        let mut cmd = match self {
            Self::Ffplay(path) => {
                let mut cmd = Command::new(path);
                cmd.args(["-nodisp", "-autoexit", "-loglevel", "error", "-ss"])
                    .arg(&start);
                cmd
            }
            Self::Mpv(path) => {
                let mut cmd = Command::new(path);
                cmd.args(["--no-video", "--really-quiet"])
                    .arg(format!("--start={start}"));
                cmd
            }
        };
        cmd.arg(location.as_arg())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

/// Play/pause/seek control over one external player process.
pub struct Transport {
    backend: PlayerBackend,
    source: Option<AudioSource>,
    child: Option<Child>,
    clock: PlaybackClock,
    duration: Option<Duration>,
}

impl Transport {
    pub fn new(backend: PlayerBackend) -> Self {
        Self {
            backend,
            source: None,
            child: None,
            clock: PlaybackClock::default(),
            duration: None,
        }
    }

    pub fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.child.is_some()
    }

    /// Replaces the current source. Playback stops and the position resets.
    pub fn select(&mut self, source: AudioSource) {
        self.stop_process();
        tracing::info!("Selected source: {} ({})", source.label, source.location);
        self.source = Some(source);
        self.clock = PlaybackClock::default();
        self.duration = None;
    }

    /// Records the probed duration of the current source.
    pub fn set_duration(&mut self, duration: Option<Duration>) {
        self.duration = duration;
    }

    /// Starts or resumes playback from the current position.
    ///
    /// Playback that reached the end restarts from the beginning.
    ///
    /// # Errors
    /// - If no source is selected
    /// - If the player process cannot be spawned
    pub fn play(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| anyhow!("No source selected"))?;

        let now = Instant::now();
        if self
            .duration
            .is_some_and(|duration| self.clock.position_at(now) >= duration)
        {
            self.clock.set_at(Duration::ZERO, now);
        }

        let position = self.clock.position_at(now);
        let child = self
            .backend
            .command(&source.location, position)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.backend.name()))?;

        tracing::debug!(
            "Started {} (pid {}) at {:.1}s",
            self.backend.name(),
            child.id(),
            position.as_secs_f64()
        );
        self.child = Some(child);
        self.clock.start_at(now);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.child.is_some() {
            self.stop_process();
            tracing::debug!("Paused at {:.1}s", self.clock.position().as_secs_f64());
        }
    }

    /// Plays if paused, pauses if playing.
    ///
    /// # Errors
    /// - If playback cannot be started
    pub fn toggle(&mut self) -> Result<()> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Moves the position by `delta` seconds, clamped to the known duration.
    ///
    /// # Errors
    /// - If playback was running and cannot be restarted at the new position
    pub fn seek_by(&mut self, delta: f64) -> Result<()> {
        let now = Instant::now();
        let current = self.clock.position_at(now).as_secs_f64();
        let mut target = (current + delta).max(0.0);
        if let Some(duration) = self.duration {
            target = target.min(duration.as_secs_f64());
        }
        let target = Duration::from_secs_f64(target);

        let was_playing = self.is_playing();
        if was_playing {
            self.stop_process();
        }
        self.clock.set_at(target, now);
        tracing::debug!("Seek to {:.1}s", target.as_secs_f64());

        if was_playing {
            self.play()?;
        }
        Ok(())
    }

    /// Detects a player process that exited on its own.
    ///
    /// Returns true if playback ended since the last poll.
    pub fn poll(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    tracing::warn!("{} exited with {}", self.backend.name(), status);
                }
                self.child = None;
                let now = Instant::now();
                self.clock.pause_at(now);
                if let Some(duration) = self.duration {
                    if status.success() {
                        self.clock.set_at(duration, now);
                    }
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to poll player process: {}", e);
                false
            }
        }
    }

    pub fn state(&self) -> PlaybackState {
        let mut current_time = self.clock.position();
        if let Some(duration) = self.duration {
            current_time = current_time.min(duration);
        }
        PlaybackState {
            source: self.source.clone(),
            is_playing: self.is_playing(),
            current_time,
            duration: self.duration,
        }
    }

    fn stop_process(&mut self) {
        self.clock.pause_at(Instant::now());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop_process();
    }
}

/// Asks ffprobe for the duration of `location`.
///
/// Returns `None` when ffprobe is unavailable or the duration is unknown
/// (live streams).
pub fn probe_duration(ffprobe: &Path, location: &Location) -> Option<Duration> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(location.as_arg())
        .stdin(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            parse_probe_output(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            tracing::debug!("ffprobe failed for {}: {}", location, output.status);
            None
        }
        Err(e) => {
            tracing::debug!("Could not run ffprobe: {}", e);
            None
        }
    }
}

fn parse_probe_output(stdout: &str) -> Option<Duration> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Formats a position as `m:ss`.
pub fn format_time(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        Transport::new(PlayerBackend::Ffplay(PathBuf::from("/nonexistent/ffplay")))
    }

    fn source() -> AudioSource {
        AudioSource {
            label: "Science Hour".to_string(),
            location: Location::Url("https://example.com/science.mp3".to_string()),
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Duration::ZERO), "0:00");
        assert_eq!(format_time(Duration::from_secs_f64(5.9)), "0:05");
        assert_eq!(format_time(Duration::from_secs(65)), "1:05");
        assert_eq!(format_time(Duration::from_secs(3600)), "60:00");
    }

    #[test]
    fn test_clock_advances_only_while_running() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::default();
        assert_eq!(clock.position_at(t0 + Duration::from_secs(3)), Duration::ZERO);

        clock.start_at(t0);
        assert_eq!(clock.position_at(t0 + Duration::from_secs(3)), Duration::from_secs(3));

        clock.pause_at(t0 + Duration::from_secs(3));
        assert!(!clock.is_running());
        assert_eq!(clock.position_at(t0 + Duration::from_secs(10)), Duration::from_secs(3));

        clock.start_at(t0 + Duration::from_secs(10));
        assert_eq!(clock.position_at(t0 + Duration::from_secs(12)), Duration::from_secs(5));
    }

    #[test]
    fn test_clock_set_keeps_running_state() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::default();
        clock.start_at(t0);
        clock.set_at(Duration::from_secs(30), t0 + Duration::from_secs(1));

        assert!(clock.is_running());
        assert_eq!(clock.position_at(t0 + Duration::from_secs(3)), Duration::from_secs(32));
    }

    #[test]
    fn test_play_without_source_fails() {
        let mut transport = transport();
        assert!(transport.play().is_err());
        assert!(!transport.is_playing());
    }

    #[test]
    fn test_play_with_missing_binary_fails() {
        let mut transport = transport();
        transport.select(source());
        assert!(transport.play().is_err());
        assert!(!transport.state().is_playing);
    }

    #[test]
    fn test_paused_seek_is_clamped() {
        let mut transport = transport();
        transport.select(source());
        transport.set_duration(Some(Duration::from_secs(12)));

        transport.seek_by(-5.0).unwrap();
        assert_eq!(transport.state().current_time, Duration::ZERO);

        transport.seek_by(10.0).unwrap();
        assert_eq!(transport.state().current_time, Duration::from_secs(10));

        transport.seek_by(5.0).unwrap();
        assert_eq!(transport.state().current_time, Duration::from_secs(12));
    }

    #[test]
    fn test_select_resets_position() {
        let mut transport = transport();
        transport.select(source());
        transport.seek_by(20.0).unwrap();
        transport.select(source());

        let state = transport.state();
        assert_eq!(state.current_time, Duration::ZERO);
        assert_eq!(state.duration, None);
        assert_eq!(state.source.map(|s| s.label), Some("Science Hour".to_string()));
    }

    #[test]
    fn test_parse_probe_output() {
        assert_eq!(parse_probe_output("52.209000\n"), Some(Duration::from_secs_f64(52.209)));
        assert_eq!(parse_probe_output("N/A\n"), None);
        assert_eq!(parse_probe_output(""), None);
    }

    #[test]
    fn test_backend_command_args() {
        let location = Location::File(PathBuf::from("/tmp/a.mp3"));
        let cmd = PlayerBackend::Mpv(PathBuf::from("mpv")).command(&location, Duration::from_secs(5));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args, ["--no-video", "--really-quiet", "--start=5.000", "/tmp/a.mp3"]);

        let cmd = PlayerBackend::Ffplay(PathBuf::from("ffplay")).command(&location, Duration::ZERO);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(
            args,
            ["-nodisp", "-autoexit", "-loglevel", "error", "-ss", "0.000", "/tmp/a.mp3"]
        );
    }
}
