//! Freeverb-style reverb
//!
//! Schroeder topology: a parallel bank of lowpass-feedback comb filters
//! feeding a series chain of all-pass filters. Delay lengths are the classic
//! Freeverb tunings at 44.1 kHz, rescaled to the buffer's sample rate.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::audio::AudioBuffer;
use crate::error::{SlowReverbError, Result};

const TUNING_SAMPLE_RATE: f64 = 44100.0;
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;

const FIXED_GAIN: f32 = 0.015;
const SCALE_ROOM: f32 = 0.28;
const OFFSET_ROOM: f32 = 0.7;
const SCALE_DAMP: f32 = 0.4;
const ALLPASS_FEEDBACK: f32 = 0.5;

/// Reverb controls, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverbSettings {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            room_size: 0.25,
            damping: 0.5,
            wet_level: 0.33,
        }
    }
}

impl ReverbSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("room size", self.room_size),
            ("damping", self.damping),
            ("wet level", self.wet_level),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SlowReverbError::invalid_parameter(format!(
                    "Reverb {} must be in range [0.0, 1.0], got {}", name, value
                )));
            }
        }
        Ok(())
    }

    fn feedback(&self) -> f32 {
        self.room_size * SCALE_ROOM + OFFSET_ROOM
    }

    fn damp(&self) -> f32 {
        self.damping * SCALE_DAMP
    }
}

struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    filter_store: f32,
    feedback: f32,
    damp: f32,
}

impl CombFilter {
    fn new(size: usize, feedback: f32, damp: f32) -> Self {
        Self {
            buffer: vec![0.0; size],
            pos: 0,
            filter_store: 0.0,
            feedback,
            damp,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.pos];
        // one-pole lowpass in the feedback path
        self.filter_store = output * (1.0 - self.damp) + self.filter_store * self.damp;
        self.buffer[self.pos] = input + self.filter_store * self.feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }
}

struct AllPassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllPassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let output = delayed - input;
        self.buffer[self.pos] = input + delayed * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }
}

/// Filter network for one channel
struct ReverbTank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllPassFilter>,
}

impl ReverbTank {
    fn new(settings: &ReverbSettings, sample_rate: u32, channel: usize) -> Self {
        let scale = sample_rate as f64 / TUNING_SAMPLE_RATE;
        let spread = STEREO_SPREAD * channel;
        let length = |tuning: usize| (((tuning + spread) as f64 * scale).round() as usize).max(1);

        Self {
            combs: COMB_TUNINGS
                .iter()
                .map(|&t| CombFilter::new(length(t), settings.feedback(), settings.damp()))
                .collect(),
            allpasses: ALLPASS_TUNINGS.iter().map(|&t| AllPassFilter::new(length(t))).collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let scaled = input * FIXED_GAIN;
        let mut out: f32 = self.combs.iter_mut().map(|c| c.process(scaled)).sum();
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }
}

fn reverb_channel(
    dry: ArrayView1<f32>,
    settings: &ReverbSettings,
    sample_rate: u32,
    channel: usize,
) -> Array1<f32> {
    let wet_gain = settings.wet_level;
    let dry_gain = 1.0 - wet_gain;
    let mut tank = ReverbTank::new(settings, sample_rate, channel);

    dry.iter()
        .map(|&x| {
            let wet = tank.process(x);
            x * dry_gain + wet * wet_gain
        })
        .collect()
}

/// Scale down if the mix peaks above full scale, then hard-limit.
fn normalize(samples: &mut Array2<f32>) {
    let peak = samples
        .iter()
        .filter(|x| x.is_finite())
        .fold(0.0f32, |p, &x| p.max(x.abs()));
    let gain = if peak > 1.0 { 1.0 / peak } else { 1.0 };

    samples.mapv_inplace(|x| if x.is_finite() { (x * gain).clamp(-1.0, 1.0) } else { 0.0 });
}

/// Mix a reverberated copy of `buffer` with the dry signal.
///
/// `out = dry * (1 - wet_level) + wet * wet_level`, same length as the input.
pub fn apply_reverb(buffer: &AudioBuffer, settings: &ReverbSettings) -> Result<AudioBuffer> {
    settings.validate()?;

    if settings.wet_level == 0.0 || buffer.is_empty() {
        return Ok(buffer.clone());
    }

    let sample_rate = buffer.sample_rate();
    let channels: Vec<Array1<f32>> = (0..buffer.channels())
        .into_par_iter()
        .map(|ch| reverb_channel(buffer.channel(ch), settings, sample_rate, ch))
        .collect();

    let mut samples = Array2::zeros((buffer.channels(), buffer.frames()));
    for (mut row, channel) in samples.axis_iter_mut(Axis(0)).zip(channels.iter()) {
        row.assign(channel);
    }
    normalize(&mut samples);

    buffer.with_samples(samples)
}
