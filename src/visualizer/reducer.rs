//! Block-average reduction of a sample snapshot.
//!
//! Turns a long time-domain snapshot into a short sequence of representative
//! points plus one scalar describing how far the whole snapshot sits from silence.

use thiserror::Error;

use super::analyzer::SILENCE_MIDPOINT;

/// Reasons a snapshot cannot be reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// The snapshot holds fewer samples than the requested number of segments.
    #[error("insufficient samples: {available} available, {requested} segments requested")]
    InsufficientSamples { available: usize, requested: usize },
}

/// Reduced form of one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedWaveform {
    /// Block means, still in raw sample units (0-255, 128 = silence).
    pub points: Vec<f32>,
    /// Mean absolute deviation of every sample from the silence midpoint.
    pub intensity: f32,
}

/// Reduces `snapshot` to `segment_count` block means and an intensity value.
///
/// Blocks are `floor(len / segment_count)` samples wide; tail samples that do
/// not fill a whole block are left out of the points but still count towards
/// the intensity.
///
/// # Errors
/// - `InsufficientSamples` if the snapshot is shorter than `segment_count`
///   (a zero segment count is treated the same way)
pub fn reduce(snapshot: &[u8], segment_count: usize) -> Result<ReducedWaveform, ReduceError> {
    if segment_count == 0 || snapshot.len() < segment_count {
        return Err(ReduceError::InsufficientSamples {
            available: snapshot.len(),
            requested: segment_count,
        });
    }

    let block_len = snapshot.len() / segment_count;
    let covered = block_len * segment_count;

    let mut points = Vec::with_capacity(segment_count);
    let mut block_sum = 0u64;
    let mut deviation_sum = 0u64;

    for (i, &sample) in snapshot.iter().enumerate() {
        deviation_sum += u64::from(sample.abs_diff(SILENCE_MIDPOINT));

        if i < covered {
            block_sum += u64::from(sample);
            if (i + 1) % block_len == 0 {
                points.push(block_sum as f32 / block_len as f32);
                block_sum = 0;
            }
        }
    }

    Ok(ReducedWaveform {
        points,
        intensity: deviation_sum as f32 / snapshot.len() as f32,
    })
}
