//! List audio devices the analysis tap can capture from.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::visualizer::capture::suppress_alsa_warnings;

/// Lists all capture devices with their index and default configuration.
///
/// To visualize what the player is playing, pick a monitor of the output
/// device and set it as `audio.device` in aura.toml.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (host, devices) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let devices: Vec<cpal::Device> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?
            .filter(|d| d.name().is_ok())
            .collect();
        Ok((host, devices))
    })?;

    if devices.is_empty() {
        println!("No audio capture devices found on this system.");
        return Ok(());
    }

    let default_device = host.default_input_device().and_then(|d| d.name().ok());

    println!();
    println!(" Aura Player");
    println!();
    println!("Available capture devices:");
    println!();

    for (index, device) in devices.iter().enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let default_indicator = if default_device.as_deref() == Some(name.as_str()) {
            " [DEFAULT]"
        } else {
            ""
        };
        let monitor_indicator = if name.to_lowercase().contains("monitor") {
            " [MONITOR]"
        } else {
            ""
        };

        let config_info = match device.default_input_config() {
            Ok(config) => format!(
                " ({}Hz, {} channels, {:?})",
                config.sample_rate().0,
                config.channels(),
                config.sample_format()
            ),
            Err(_) => " (configuration unavailable)".to_string(),
        };

        println!("  ID: {index}");
        println!("    Name: {name}{default_indicator}{monitor_indicator}");
        println!("    Config:{config_info}");
        println!();
    }

    println!("Set audio.device in ~/.config/aura/aura.toml to an ID or name.");
    Ok(())
}
