//! Media tool locator.
//!
//! Finds the external player and probe binaries. Standard installation
//! directories are checked before falling back to a PATH search, so the tools
//! are found even when aura is launched with a minimal PATH.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Directories checked before PATH, per platform.
fn standard_dirs() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/usr/bin"),
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            PathBuf::from("/usr/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/snap/bin"),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin"),
            PathBuf::from("C:\\Program Files\\mpv"),
        ]
    } else {
        vec![]
    }
}

fn executable_name(binary_name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{binary_name}.exe")
    } else {
        binary_name.to_string()
    }
}

/// Locates `binary_name` in `dirs`, then in PATH.
///
/// # Errors
/// - If the binary is in none of the directories and not in PATH
pub fn find_binary_in(binary_name: &str, dirs: &[PathBuf]) -> Result<PathBuf> {
    let file_name = executable_name(binary_name);

    if let Some(path) = dirs
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|path| path.exists())
    {
        tracing::debug!("Found {} at: {}", binary_name, path.display());
        return Ok(path);
    }

    let path = find_in_path(binary_name)?;
    tracing::debug!("Found {} in PATH at: {}", binary_name, path.display());
    Ok(path)
}

/// Locates `binary_name` in the platform's standard locations, then in PATH.
///
/// # Errors
/// - If the binary cannot be found
pub fn find_binary(binary_name: &str) -> Result<PathBuf> {
    find_binary_in(binary_name, &standard_dirs())
}

/// Searches for a binary in the system PATH.
///
/// Uses `which` on Unix systems and `where` on Windows.
fn find_in_path(binary_name: &str) -> Result<PathBuf> {
    let search_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let output = std::process::Command::new(search_cmd)
        .arg(binary_name)
        .output()
        .map_err(|e| anyhow!("Failed to search PATH for {binary_name}: {e}"))?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        if let Some(first) = path_str.lines().next() {
            let path = Path::new(first.trim());
            if !path.as_os_str().is_empty() {
                return Ok(path.to_path_buf());
            }
        }
    }

    Err(anyhow!("{binary_name} not found in PATH"))
}

/// Installation hint shown when no player binary is available.
pub fn install_hint() -> &'static str {
    "No audio player found. Please install ffmpeg (for ffplay) or mpv:\n\
     macOS: brew install ffmpeg\n\
     Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
     Windows: Download from https://ffmpeg.org/download.html"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_binary_in_given_dir() {
        let dir = std::env::temp_dir().join(format!("aura-locate-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let name = "aura-fake-player";
        std::fs::write(dir.join(executable_name(name)), b"").unwrap();

        let found = find_binary_in(name, &[dir.clone()]).unwrap();
        assert_eq!(found, dir.join(executable_name(name)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_binary_is_error() {
        let result = find_binary_in("aura-no-such-binary-xyz", &[]);
        assert!(result.is_err());
    }
}
