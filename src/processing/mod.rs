//! Audio Processing Pipeline

pub mod params;
pub mod pipeline;

pub use params::{EffectParameters, speed_preset, reverb_preset};
pub use pipeline::{process, SlowReverbProcessor, ProcessingOutput, ProcessingResult, PerformanceMetrics};
