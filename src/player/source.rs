//! Playable sources: the configured catalog and ad-hoc files or URLs.

use anyhow::{anyhow, Result};
use std::fmt;
use std::path::PathBuf;

use crate::config::CatalogEntry;

/// Where a source's audio is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    File(PathBuf),
}

impl Location {
    /// Argument handed to the external player.
    pub fn as_arg(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_arg())
    }
}

/// A named, playable audio source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub label: String,
    pub location: Location,
}

impl AudioSource {
    /// Resolves a command-line argument to a source.
    ///
    /// `http://` and `https://` arguments are streamed as-is; anything else
    /// must be an existing file.
    ///
    /// # Errors
    /// - If a file argument does not exist
    pub fn from_arg(arg: &str) -> Result<Self> {
        if is_url(arg) {
            return Ok(Self {
                label: url_label(arg),
                location: Location::Url(arg.to_string()),
            });
        }

        let path = PathBuf::from(arg);
        if !path.is_file() {
            return Err(anyhow!("Audio file not found: {}", path.display()));
        }

        let label = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| arg.to_string());

        Ok(Self {
            label,
            location: Location::File(path),
        })
    }
}

impl From<&CatalogEntry> for AudioSource {
    fn from(entry: &CatalogEntry) -> Self {
        let location = if is_url(&entry.url) {
            Location::Url(entry.url.clone())
        } else {
            Location::File(PathBuf::from(&entry.url))
        };
        Self {
            label: entry.name.clone(),
            location,
        }
    }
}

/// Builds the selectable source list, with an explicit source first.
pub fn build_catalog(entries: &[CatalogEntry], explicit: Option<AudioSource>) -> Vec<AudioSource> {
    explicit
        .into_iter()
        .chain(entries.iter().map(AudioSource::from))
        .collect()
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Last path segment of a URL without its extension, or the URL itself.
fn url_label(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);

    after_scheme
        .split_once('/')
        .and_then(|(_, path)| path.trim_end_matches('/').rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .rsplit_once('.')
                .map_or(segment, |(stem, _)| stem)
                .to_string()
        })
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_argument() {
        let source = AudioSource::from_arg("https://example.com/media/Daily-Insights.m4a?x=1").unwrap();
        assert_eq!(source.label, "Daily-Insights");
        assert_eq!(
            source.location,
            Location::Url("https://example.com/media/Daily-Insights.m4a?x=1".to_string())
        );
    }

    #[test]
    fn test_bare_host_url_keeps_full_label() {
        let source = AudioSource::from_arg("https://example.com/").unwrap();
        assert_eq!(source.label, "https://example.com/");
    }

    #[test]
    fn test_missing_file_argument() {
        assert!(AudioSource::from_arg("/definitely/not/here.mp3").is_err());
    }

    #[test]
    fn test_file_argument() {
        let path = std::env::temp_dir().join(format!("aura-source-{}.mp3", std::process::id()));
        std::fs::write(&path, b"").unwrap();

        let source = AudioSource::from_arg(path.to_str().unwrap()).unwrap();
        assert_eq!(source.location, Location::File(path.clone()));
        assert!(source.label.starts_with("aura-source-"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_catalog_puts_explicit_source_first() {
        let entries = vec![CatalogEntry {
            name: "Science Hour".to_string(),
            url: "https://example.com/science.mp3".to_string(),
        }];
        let explicit = AudioSource::from_arg("https://example.com/other.mp3").unwrap();

        let catalog = build_catalog(&entries, Some(explicit));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].label, "other");
        assert_eq!(catalog[1].label, "Science Hour");
    }
}
