//! Slow + reverb processing pipeline
//!
//! decode -> speed change -> reverb -> encode. Every stage is a plain
//! function returning `Result`; the first failure ends the run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use log::{debug, info};
use crate::audio::{self, AudioBuffer, AudioFormat};
use crate::config::Config;
use crate::effects::apply_reverb;
use crate::error::{SlowReverbError, Result};
use super::EffectParameters;

pub const DEFAULT_MAX_DURATION_SECS: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceMetrics {
    pub input_duration_seconds: f64,
    pub output_duration_seconds: f64,
    pub processing_time_seconds: f64,
    pub real_time_factor: f64,
    pub sample_rate: u32,
    pub channels: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessingOutput {
    pub bytes: Vec<u8>,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub processing_time: Duration,
    pub performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone)]
pub struct SlowReverbProcessor {
    max_duration_secs: f64,
    output_format: AudioFormat,
}

impl Default for SlowReverbProcessor {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            output_format: AudioFormat::Int16,
        }
    }
}

impl SlowReverbProcessor {
    pub fn new(max_duration_secs: f64, output_format: AudioFormat) -> Self {
        Self { max_duration_secs, output_format }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.limits.max_duration_secs, config.effects.output_format)
    }

    pub fn max_duration_secs(&self) -> f64 {
        self.max_duration_secs
    }

    pub fn output_format(&self) -> AudioFormat {
        self.output_format
    }

    /// Run the full pipeline on an in-memory WAV file.
    pub fn process(&self, input: &[u8], params: &EffectParameters) -> Result<ProcessingOutput> {
        params.validate()?;
        self.process_validated(input, params)
    }

    /// Apply speed change then reverb to an already decoded buffer.
    pub fn transform(&self, buffer: &AudioBuffer, params: &EffectParameters) -> Result<AudioBuffer> {
        params.validate()?;
        self.run_stages(buffer, params)
    }

    pub fn process_file(&self, input_path: &Path, output_path: &Path, params: &EffectParameters) -> Result<ProcessingResult> {
        let start_time = Instant::now();
        params.validate()?;

        let input = std::fs::read(input_path).map_err(|e| {
            SlowReverbError::io(format!("Cannot open audio file {}: {}", input_path.display(), e))
        })?;
        let output = self.process_validated(&input, params)?;

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output_path, &output.bytes).map_err(|e| {
            SlowReverbError::io(format!("Cannot write output file {}: {}", output_path.display(), e))
        })?;
        info!("Saved: {}", output_path.display());

        Ok(ProcessingResult {
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            processing_time: start_time.elapsed(),
            performance_metrics: output.performance_metrics,
        })
    }

    // `params` must already have passed `validate`
    fn process_validated(&self, input: &[u8], params: &EffectParameters) -> Result<ProcessingOutput> {
        let start_time = Instant::now();

        let decoded = audio::decode(input)?;
        debug!(
            "Decoded: {:.2}s, {}Hz, {}ch",
            decoded.duration_secs(), decoded.sample_rate(), decoded.channels()
        );

        let output = self.run_stages(&decoded, params)?;
        let bytes = audio::encode_as(&output, self.output_format)?;
        debug!("Encoded {} bytes as {}", bytes.len(), self.output_format.name());

        let performance_metrics = Self::calculate_performance_metrics(&decoded, &output, start_time.elapsed());
        info!(
            "Processed {:.2}s -> {:.2}s ({}) in {:.2}s, RTF {:.3}",
            performance_metrics.input_duration_seconds,
            performance_metrics.output_duration_seconds,
            params,
            performance_metrics.processing_time_seconds,
            performance_metrics.real_time_factor
        );

        Ok(ProcessingOutput { bytes, performance_metrics })
    }

    fn run_stages(&self, buffer: &AudioBuffer, params: &EffectParameters) -> Result<AudioBuffer> {
        self.check_duration(buffer)?;

        let slowed = audio::change_speed(buffer, params.speed_factor)?;
        debug!("Speed x{:.3}: {} -> {} frames", params.speed_factor, buffer.frames(), slowed.frames());

        let reverbed = apply_reverb(&slowed, &params.reverb())?;
        debug!("Reverb applied, peak {:.3}", reverbed.peak());

        Ok(reverbed)
    }

    fn check_duration(&self, buffer: &AudioBuffer) -> Result<()> {
        if buffer.duration_secs() > self.max_duration_secs {
            return Err(SlowReverbError::duration_exceeded(format!(
                "Audio file too long. Maximum duration is {} minutes.",
                self.max_duration_secs / 60.0
            )));
        }
        Ok(())
    }

    fn calculate_performance_metrics(input: &AudioBuffer, output: &AudioBuffer, elapsed: Duration) -> PerformanceMetrics {
        let input_duration_seconds = input.duration_secs();
        let processing_time_seconds = elapsed.as_secs_f64();
        let real_time_factor = if input_duration_seconds > 0.0 {
            processing_time_seconds / input_duration_seconds
        } else {
            0.0
        };

        PerformanceMetrics {
            input_duration_seconds,
            output_duration_seconds: output.duration_secs(),
            processing_time_seconds,
            real_time_factor,
            sample_rate: output.sample_rate(),
            channels: output.channels(),
        }
    }
}

/// Process with default limits and 16-bit output.
pub fn process(input: &[u8], params: &EffectParameters) -> Result<Vec<u8>> {
    SlowReverbProcessor::default().process(input, params).map(|out| out.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(speed_factor: f32, wet_level: f32) -> EffectParameters {
        EffectParameters { speed_factor, wet_level, ..EffectParameters::default() }
    }

    #[test]
    fn test_transform_silent_second() {
        let silent = AudioBuffer::silence(44100, 1, 44100).unwrap();
        let out = SlowReverbProcessor::default().transform(&silent, &params(0.5, 0.3)).unwrap();

        assert_eq!(out.sample_rate(), 44100);
        assert!((out.duration_secs() - 2.0).abs() < 1e-3);
        assert!(out.samples().iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[test]
    fn test_duration_limit() {
        let processor = SlowReverbProcessor::new(0.5, AudioFormat::Int16);
        let long = AudioBuffer::silence(8000, 1, 8000).unwrap();
        let err = processor.transform(&long, &params(1.0, 0.0)).unwrap_err();
        assert!(matches!(err, SlowReverbError::DurationExceeded { .. }));
    }

    #[test]
    fn test_invalid_parameters_short_circuit_decode() {
        // Garbage input would be UnsupportedFormat if decoding were reached
        let err = process(b"not audio", &params(-1.0, 0.3)).unwrap_err();
        assert!(matches!(err, SlowReverbError::InvalidParameter { .. }));

        let err = process(b"not audio", &params(1.0, 2.0)).unwrap_err();
        assert!(matches!(err, SlowReverbError::InvalidParameter { .. }));
    }

    #[test]
    fn test_process_file_validates_before_reading() {
        // a missing input would surface as Io if the file were opened first
        let dir = tempfile::tempdir().unwrap();
        let err = SlowReverbProcessor::default()
            .process_file(&dir.path().join("missing.wav"), &dir.path().join("out.wav"), &params(5.0, 0.3))
            .unwrap_err();
        assert!(matches!(err, SlowReverbError::InvalidParameter { .. }));
        assert!(!dir.path().join("out.wav").exists());
    }

    #[test]
    fn test_transform_validates_parameters() {
        let silent = AudioBuffer::silence(8000, 1, 800).unwrap();
        let err = SlowReverbProcessor::default().transform(&silent, &params(1.0, -0.5)).unwrap_err();
        assert!(matches!(err, SlowReverbError::InvalidParameter { .. }));
    }

    #[test]
    fn test_undecodable_input() {
        let err = process(b"RIFF....WAVEjunk", &EffectParameters::default()).unwrap_err();
        assert!(matches!(err, SlowReverbError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_metrics_reported() {
        let input = audio::encode(&AudioBuffer::silence(8000, 2, 8000).unwrap()).unwrap();
        let out = SlowReverbProcessor::new(10.0, AudioFormat::Float32)
            .process(&input, &params(0.5, 0.5))
            .unwrap();

        let m = out.performance_metrics;
        assert_eq!(m.channels, 2);
        assert_eq!(m.sample_rate, 8000);
        assert!((m.input_duration_seconds - 1.0).abs() < 1e-9);
        assert!((m.output_duration_seconds - 2.0).abs() < 1e-9);
        assert!(m.real_time_factor >= 0.0);
    }
}
