//! Effect parameters and the speed/reverb preset tables

use serde::{Deserialize, Serialize};
use crate::audio::resample::validate_speed_factor;
use crate::effects::ReverbSettings;
use crate::error::{SlowReverbError, Result};

/// Speed presets, expressed as the playback rate (Hz) a 44.1 kHz source is
/// slowed to. Lower rate means slower playback.
pub const SPEED_PRESETS_HZ: [u32; 10] = [38000, 39000, 40000, 41000, 42000, 43000, 44000, 45000, 46000, 47000];
/// Reverb presets, expressed as room size
pub const REVERB_PRESETS: [f32; 4] = [0.0, 0.10, 0.25, 0.5];

pub const DEFAULT_SPEED_PRESET: usize = 2;
pub const DEFAULT_REVERB_PRESET: usize = 2;
pub const PRESET_REFERENCE_RATE: u32 = 44100;

pub fn speed_preset(index: usize) -> Result<f32> {
    SPEED_PRESETS_HZ
        .get(index)
        .map(|&hz| hz as f32 / PRESET_REFERENCE_RATE as f32)
        .ok_or_else(|| SlowReverbError::invalid_parameter(format!(
            "Invalid speed value: preset must be between 0 and {}", SPEED_PRESETS_HZ.len() - 1
        )))
}

pub fn reverb_preset(index: usize) -> Result<f32> {
    REVERB_PRESETS
        .get(index)
        .copied()
        .ok_or_else(|| SlowReverbError::invalid_parameter(format!(
            "Invalid reverb value: preset must be between 0 and {}", REVERB_PRESETS.len() - 1
        )))
}

/// User-facing effect settings for one processing run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectParameters {
    pub speed_factor: f32,
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
}

impl Default for EffectParameters {
    fn default() -> Self {
        let reverb = ReverbSettings::default();
        Self {
            speed_factor: SPEED_PRESETS_HZ[DEFAULT_SPEED_PRESET] as f32 / PRESET_REFERENCE_RATE as f32,
            room_size: REVERB_PRESETS[DEFAULT_REVERB_PRESET],
            damping: reverb.damping,
            wet_level: reverb.wet_level,
        }
    }
}

impl EffectParameters {
    pub fn validate(&self) -> Result<()> {
        validate_speed_factor(self.speed_factor)?;
        self.reverb().validate()
    }

    pub fn reverb(&self) -> ReverbSettings {
        ReverbSettings {
            room_size: self.room_size,
            damping: self.damping,
            wet_level: self.wet_level,
        }
    }

    pub fn with_speed_preset(mut self, index: usize) -> Result<Self> {
        self.speed_factor = speed_preset(index)?;
        Ok(self)
    }

    pub fn with_reverb_preset(mut self, index: usize) -> Result<Self> {
        self.room_size = reverb_preset(index)?;
        Ok(self)
    }
}

impl std::fmt::Display for EffectParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "speed={:.3} room={:.2} damping={:.2} wet={:.2}",
            self.speed_factor, self.room_size, self.damping, self.wet_level
        )
    }
}
