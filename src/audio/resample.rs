//! Speed change by linear-interpolation resampling

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use crate::audio::AudioBuffer;
use crate::error::{SlowReverbError, Result};

pub const MIN_SPEED_FACTOR: f32 = 0.5;
pub const MAX_SPEED_FACTOR: f32 = 1.5;

pub fn validate_speed_factor(speed_factor: f32) -> Result<()> {
    if !speed_factor.is_finite() || speed_factor <= 0.0 {
        return Err(SlowReverbError::invalid_parameter(format!(
            "Speed factor must be a positive number, got {}", speed_factor
        )));
    }
    if !(MIN_SPEED_FACTOR..=MAX_SPEED_FACTOR).contains(&speed_factor) {
        return Err(SlowReverbError::invalid_parameter(format!(
            "Speed factor must be in range [{}, {}], got {}",
            MIN_SPEED_FACTOR, MAX_SPEED_FACTOR, speed_factor
        )));
    }
    Ok(())
}

/// Play `buffer` back at `speed_factor` times its original speed.
///
/// The sample rate is kept, so the result lasts `duration / speed_factor`
/// and its pitch shifts with the speed, like a turntable.
pub fn change_speed(buffer: &AudioBuffer, speed_factor: f32) -> Result<AudioBuffer> {
    validate_speed_factor(speed_factor)?;

    if speed_factor == 1.0 || buffer.is_empty() {
        return Ok(buffer.clone());
    }

    let step = speed_factor as f64;
    let new_length = (buffer.frames() as f64 / step).round() as usize;

    let channels: Vec<Array1<f32>> = (0..buffer.channels())
        .into_par_iter()
        .map(|ch| resample_channel(buffer.channel(ch), new_length, step))
        .collect();

    let mut samples = Array2::zeros((buffer.channels(), new_length));
    for (mut row, channel) in samples.axis_iter_mut(Axis(0)).zip(channels.iter()) {
        row.assign(channel);
    }

    buffer.with_samples(samples)
}

fn resample_channel(data: ArrayView1<f32>, new_length: usize, step: f64) -> Array1<f32> {
    let old_length = data.len();
    let last = data[old_length - 1];

    Array1::from_shape_fn(new_length, |i| {
        let old_pos = i as f64 * step;
        let old_index = old_pos.floor() as usize;
        if old_index >= old_length - 1 {
            return last;
        }
        let fraction = (old_pos - old_index as f64) as f32;
        data[old_index] + (data[old_index + 1] - data[old_index]) * fraction
    })
}
