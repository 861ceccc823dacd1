//! Configuration file management for aura.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory and created with
//! defaults on first run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable that overrides `news.api_key`.
pub const NEWS_API_KEY_ENV: &str = "AURA_NEWS_API_KEY";

/// What the visualizer draws each frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationMode {
    /// Smoothed time-domain waveform over an intensity glow
    #[default]
    Waveform,
    /// Frequency bars over an intensity glow
    Spectrum,
}

impl std::fmt::Display for VisualizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waveform => write!(f, "waveform"),
            Self::Spectrum => write!(f, "spectrum"),
        }
    }
}

/// Capture configuration for the analysis tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture device the analysis tap listens on. Options:
    /// - "default" for a monitor of the playback output, or the system
    ///   default input if the host has no monitor
    /// - numeric index (0, 1, 2, etc.) from `aura list-devices`
    /// - device name from `aura list-devices` (a monitor of the output device
    ///   lets the tap see what the player is playing)
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
        }
    }
}

fn default_device() -> String {
    "default".to_string()
}

/// Visualization engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    /// "waveform" (default) or "spectrum"
    #[serde(default)]
    pub mode: VisualizationMode,
    /// Analysis window in samples (power of two)
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Temporal smoothing of the spectral readout (0.0 - 1.0)
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    /// Number of points the waveform is reduced to
    #[serde(default = "default_segments")]
    pub segments: usize,
    /// Animation frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Backing buffer density multiplier on top of the terminal's native density
    #[serde(default = "default_supersample")]
    pub supersample: u32,
    /// Waveform stroke width in logical pixels
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    /// Background glow growth per unit of intensity
    #[serde(default = "default_glow_gain")]
    pub glow_gain: f32,
}

fn default_fft_size() -> usize {
    2048
}

fn default_smoothing() -> f32 {
    0.88
}

fn default_segments() -> usize {
    80
}

fn default_frame_rate() -> u32 {
    60
}

fn default_supersample() -> u32 {
    2
}

fn default_line_width() -> f32 {
    6.0
}

fn default_glow_gain() -> f32 {
    2.5
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            mode: VisualizationMode::default(),
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            segments: default_segments(),
            frame_rate: default_frame_rate(),
            supersample: default_supersample(),
            line_width: default_line_width(),
            glow_gain: default_glow_gain(),
        }
    }
}

impl VisualizerConfig {
    /// Checks values the engine cannot work with.
    ///
    /// # Errors
    /// - If the window is not a power of two or smaller than the segment count
    /// - If smoothing is outside 0.0 - 1.0
    /// - If the frame rate or supersample factor is zero
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            anyhow::bail!("visualizer.fft_size must be a power of two >= 32 (got {})", self.fft_size);
        }
        if self.segments == 0 || self.segments > self.fft_size {
            anyhow::bail!(
                "visualizer.segments must be between 1 and fft_size ({}), got {}",
                self.fft_size,
                self.segments
            );
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            anyhow::bail!("visualizer.smoothing must be between 0.0 and 1.0 (got {})", self.smoothing);
        }
        if self.frame_rate == 0 {
            anyhow::bail!("visualizer.frame_rate must be greater than zero");
        }
        if self.supersample == 0 {
            anyhow::bail!("visualizer.supersample must be greater than zero");
        }
        Ok(())
    }
}

/// One selectable entry of the source catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
}

fn default_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            name: "Tech Weekly".to_string(),
            url: "https://github.com/abh1hi/aura-player/raw/refs/heads/main/media-file/Daily-Insights.m4a"
                .to_string(),
        },
        CatalogEntry {
            name: "Daily Insights".to_string(),
            url: "https://storage.googleapis.com/media-session/sintel/sintel-short.mp3".to_string(),
        },
        CatalogEntry {
            name: "Science Hour".to_string(),
            url: "https://storage.googleapis.com/media-session/sintel/sintel-short.mp3".to_string(),
        },
    ]
}

/// Headline feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Top-headlines endpoint
    #[serde(default = "default_news_endpoint")]
    pub endpoint: String,
    /// Two-letter country code passed to the feed
    #[serde(default = "default_news_country")]
    pub country: String,
    /// Feed API key (can also be set with AURA_NEWS_API_KEY)
    #[serde(default)]
    pub api_key: String,
}

fn default_news_endpoint() -> String {
    "https://newsapi.org/v2/top-headlines".to_string()
}

fn default_news_country() -> String {
    "us".to_string()
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_news_endpoint(),
            country: default_news_country(),
            api_key: String::new(),
        }
    }
}

impl NewsConfig {
    /// API key from the environment, falling back to the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(NEWS_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| Some(self.api_key.clone()).filter(|key| !key.trim().is_empty()))
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuraConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default = "default_catalog")]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub news: NewsConfig,
}

impl Default for AuraConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            visualizer: VisualizerConfig::default(),
            catalog: default_catalog(),
            news: NewsConfig::default(),
        }
    }
}

impl AuraConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// Writes a default config file first if none exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read or created
    /// - If the TOML is malformed or holds invalid values
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            tracing::info!("No config file found, writing defaults to {}", config_path.display());
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config = Self::from_toml(&config_content)?;
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// - If the TOML is malformed
    /// - If visualizer values are out of range
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: AuraConfig = toml::from_str(content)?;
        config.visualizer.validate()?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Retrieves the path to the config file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("aura");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("aura.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AuraConfig::from_toml("").unwrap();

        assert_eq!(config.audio.device, "default");
        assert_eq!(config.visualizer.fft_size, 2048);
        assert_eq!(config.visualizer.smoothing, 0.88);
        assert_eq!(config.visualizer.segments, 80);
        assert_eq!(config.visualizer.mode, VisualizationMode::Waveform);
        assert_eq!(config.catalog.len(), 3);
        assert_eq!(config.catalog[0].name, "Tech Weekly");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AuraConfig::from_toml(
            r#"
            [visualizer]
            mode = "spectrum"
            segments = 64

            [[catalog]]
            name = "Local Radio"
            url = "http://radio.example/stream"
            "#,
        )
        .unwrap();

        assert_eq!(config.visualizer.mode, VisualizationMode::Spectrum);
        assert_eq!(config.visualizer.segments, 64);
        assert_eq!(config.visualizer.frame_rate, 60);
        assert_eq!(config.catalog.len(), 1);
        assert_eq!(config.news.country, "us");
    }

    #[test]
    fn test_invalid_visualizer_values_are_rejected() {
        assert!(AuraConfig::from_toml("[visualizer]\nfft_size = 1000").is_err());
        assert!(AuraConfig::from_toml("[visualizer]\nsegments = 0").is_err());
        assert!(AuraConfig::from_toml("[visualizer]\nfft_size = 64\nsegments = 65").is_err());
        assert!(AuraConfig::from_toml("[visualizer]\nsmoothing = 1.5").is_err());
        assert!(AuraConfig::from_toml("[visualizer]\nframe_rate = 0").is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(VisualizationMode::Waveform.to_string(), "waveform");
        assert_eq!(VisualizationMode::Spectrum.to_string(), "spectrum");
    }
}
