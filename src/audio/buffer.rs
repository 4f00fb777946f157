//! In-memory PCM sample buffer

use ndarray::{Array2, ArrayView1, Axis};
use crate::error::{SlowReverbError, Result};

/// Upper bound on channel count accepted anywhere in the pipeline
pub const MAX_CHANNELS: usize = 8;

/// Decoded audio, stored planar as `(channels, frames)`.
///
/// Keeping channels as rows of one `Array2` makes the equal-length
/// invariant structural rather than something to re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    samples: Array2<f32>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, samples: Array2<f32>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SlowReverbError::invalid_parameter("Sample rate must be greater than 0"));
        }
        let channels = samples.nrows();
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(SlowReverbError::invalid_parameter(format!(
                "Channel count must be between 1 and {}, got {}", MAX_CHANNELS, channels
            )));
        }
        Ok(Self { sample_rate, samples })
    }

    pub fn from_mono(sample_rate: u32, data: Vec<f32>) -> Result<Self> {
        let frames = data.len();
        let samples = Array2::from_shape_vec((1, frames), data)
            .map_err(|e| SlowReverbError::invalid_parameter(format!("Bad mono shape: {}", e)))?;
        Self::new(sample_rate, samples)
    }

    pub fn silence(sample_rate: u32, channels: usize, frames: usize) -> Result<Self> {
        Self::new(sample_rate, Array2::zeros((channels, frames)))
    }

    /// Build from frame-interleaved samples (`L R L R ...`). A trailing
    /// partial frame is dropped.
    pub fn from_interleaved(sample_rate: u32, channels: usize, interleaved: &[f32]) -> Result<Self> {
        if channels == 0 {
            return Err(SlowReverbError::invalid_parameter("Channel count must be greater than 0"));
        }
        let frames = interleaved.len() / channels;
        let mut samples = Array2::zeros((channels, frames));
        for (frame, chunk) in interleaved.chunks_exact(channels).enumerate() {
            for (ch, &sample) in chunk.iter().enumerate() {
                samples[[ch, frame]] = sample;
            }
        }
        Self::new(sample_rate, samples)
    }

    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.samples.len());
        for frame in self.samples.axis_iter(Axis(1)) {
            out.extend(frame.iter().copied());
        }
        out
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.samples.nrows()
    }

    pub fn frames(&self) -> usize {
        self.samples.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn samples(&self) -> &Array2<f32> {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut Array2<f32> {
        &mut self.samples
    }

    pub fn channel(&self, index: usize) -> ArrayView1<'_, f32> {
        self.samples.row(index)
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |p, &x| p.max(x.abs()))
    }

    /// Swap in new sample data with the same channel count
    pub fn with_samples(&self, samples: Array2<f32>) -> Result<Self> {
        if samples.nrows() != self.channels() {
            return Err(SlowReverbError::invalid_parameter(format!(
                "Channel count mismatch: expected {}, got {}", self.channels(), samples.nrows()
            )));
        }
        Self::new(self.sample_rate, samples)
    }
}
