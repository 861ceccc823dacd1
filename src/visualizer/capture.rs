//! Live capture source for the analysis tap.
//!
//! Opens a cpal input stream on the configured device (typically a monitor of
//! the system output, so the tap sees what the player is playing), mixes it
//! down to mono and hands samples to the UI thread through a lock-free
//! single-producer/single-consumer ring buffer.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::analyzer::SignalSource;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Seconds of audio the ring buffer can hold before the producer starts dropping.
const RING_SECONDS: usize = 2;

/// Capture-backed signal source.
pub struct CaptureTap {
    /// Kept alive for as long as the tap exists
    _stream: cpal::Stream,
    consumer: HeapCons<f32>,
    sample_rate: u32,
}

impl CaptureTap {
    /// Opens the capture stream on `device_name`.
    ///
    /// `device_name` is "default", a numeric index, or a device name as shown
    /// by `aura list-devices`.
    ///
    /// # Errors
    /// - If the device is not available
    /// - If the device reports an unsupported sample format
    /// - If the stream cannot be built or started
    pub fn open(device_name: &str) -> Result<Self> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if device_name == "default" {
                default_capture_device(&host)
            } else {
                find_device_by_name(&host, device_name)
            }
        })?;

        let name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", name);

        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        tracing::debug!(
            "Capture configuration: {}Hz, {} channels, {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let rb = HeapRb::<f32>::new((sample_rate as usize).saturating_mul(RING_SECONDS));
        let (mut producer, consumer) = rb.split();

        let err_fn = |err: cpal::StreamError| tracing::error!("Capture stream error: {}", err);

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_mono(data, channels, &mut producer)
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    push_mono(data, channels, &mut producer)
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    push_mono(data, channels, &mut producer)
                },
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("Unsupported capture sample format: {fmt:?}")),
        };

        stream.play().context("start capture stream")?;
        tracing::debug!("Capture stream started");

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
        })
    }
}

impl SignalSource for CaptureTap {
    fn pull(&mut self, out: &mut Vec<f32>) {
        out.reserve(self.consumer.occupied_len());
        while let Some(sample) = self.consumer.try_pop() {
            out.push(sample);
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Mixes interleaved frames down to mono and pushes them without blocking.
///
/// Samples that do not fit are dropped; the reader only ever wants the most
/// recent window.
fn push_mono<T>(data: &[T], channels: usize, producer: &mut HeapProd<f32>)
where
    T: Sample<Float = f32> + Copy,
{
    let channels = channels.max(1);
    for frame in data.chunks_exact(channels) {
        let sum: f32 = frame.iter().map(|&s| s.to_float_sample()).sum();
        let _ = producer.try_push(sum / channels as f32);
    }
}

/// Resolves the "default" device: a monitor of the playback output when the
/// host exposes one, otherwise the default input.
fn default_capture_device(host: &cpal::Host) -> Result<cpal::Device> {
    let devices: Vec<cpal::Device> = match host.input_devices() {
        Ok(devices) => devices.collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate input devices: {}", e);
            Vec::new()
        }
    };
    let names: Vec<String> = devices
        .iter()
        .map(|device| device.name().unwrap_or_default())
        .collect();
    let output = host.default_output_device().and_then(|device| device.name().ok());

    if let Some(index) = select_monitor(names.as_slice(), output.as_deref()) {
        if let Some(device) = devices.into_iter().nth(index) {
            tracing::info!("Tapping output monitor '{}'", names[index]);
            return Ok(device);
        }
    }

    tracing::warn!("No output monitor found, tapping the default input instead");
    host.default_input_device()
        .ok_or_else(|| anyhow!("No audio input device available"))
}

/// Index of the input that monitors the playback output.
///
/// A monitor of `default_output` wins over any other monitor.
fn select_monitor<S: AsRef<str>>(names: &[S], default_output: Option<&str>) -> Option<usize> {
    let is_monitor = |name: &str| name.to_lowercase().contains("monitor");

    default_output
        .filter(|output| !output.is_empty())
        .and_then(|output| {
            names
                .iter()
                .position(|name| is_monitor(name.as_ref()) && name.as_ref().contains(output))
        })
        .or_else(|| names.iter().position(|name| is_monitor(name.as_ref())))
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
pub fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'aura list-devices' to see available devices."
            )
        })
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
