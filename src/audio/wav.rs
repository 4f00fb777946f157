//! WAV decoding and encoding over in-memory byte streams

use std::io::Cursor;
use std::path::Path;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use crate::audio::buffer::{AudioBuffer, MAX_CHANNELS};
use crate::error::{SlowReverbError, Result};

/// Sample encoding used when writing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Int16,
    Float32,
}

impl AudioFormat {
    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Int16 => "int16",
            AudioFormat::Float32 => "float32",
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            AudioFormat::Int16 => 16,
            AudioFormat::Float32 => 32,
        }
    }

    pub fn to_sample_format(self) -> SampleFormat {
        match self {
            AudioFormat::Int16 => SampleFormat::Int,
            AudioFormat::Float32 => SampleFormat::Float,
        }
    }
}

/// Decode a RIFF/WAVE byte stream into a planar buffer.
///
/// Integer PCM of 8, 16, 24 or 32 bits and 32-bit float are accepted.
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| SlowReverbError::unsupported_format(format!("Cannot read WAV data: {}", e)))?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(SlowReverbError::unsupported_format("Invalid sample rate"));
    }
    let channels = spec.channels as usize;
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(SlowReverbError::unsupported_format(format!(
            "Unsupported channel count: {}", spec.channels
        )));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map_err(read_error))
            .collect::<Result<_>>()?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v as f64 * scale) as f32).map_err(read_error))
                .collect::<Result<_>>()?
        }
        (format, bits) => {
            return Err(SlowReverbError::unsupported_format(format!(
                "Unsupported sample format: {:?} {}-bit", format, bits
            )));
        }
    };

    if interleaved.len() < channels {
        return Err(SlowReverbError::unsupported_format("WAV data contains no audio frames"));
    }

    AudioBuffer::from_interleaved(spec.sample_rate, channels, &interleaved)
        .map_err(|e| SlowReverbError::unsupported_format(e.to_string()))
}

fn read_error(e: hound::Error) -> SlowReverbError {
    SlowReverbError::unsupported_format(format!("Failed to read sample: {}", e))
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn write_error(e: hound::Error) -> SlowReverbError {
    SlowReverbError::encoding(format!("Failed to write sample: {}", e))
}

/// Encode as 16-bit PCM WAV.
///
/// Int16 samples use the same 32768 scale as `decode`, rounded to nearest and
/// saturated at `i16::MAX`, so every value `decode` produces re-encodes exactly.
pub fn encode(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    encode_as(buffer, AudioFormat::Int16)
}

pub fn encode_as(buffer: &AudioBuffer, format: AudioFormat) -> Result<Vec<u8>> {
    let channels = u16::try_from(buffer.channels())
        .map_err(|_| SlowReverbError::encoding("Too many channels for WAV"))?;
    let spec = WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: format.bits_per_sample(),
        sample_format: format.to_sample_format(),
    };

    let mut cursor = Cursor::new(Vec::with_capacity(
        44 + buffer.frames() * buffer.channels() * (format.bits_per_sample() as usize / 8),
    ));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| SlowReverbError::encoding(format!("Cannot create WAV writer: {}", e)))?;

        for sample in buffer.to_interleaved() {
            let clamped = if sample.is_finite() { sample.clamp(-1.0, 1.0) } else { 0.0 };
            match format {
                AudioFormat::Float32 => writer.write_sample(clamped).map_err(write_error)?,
                AudioFormat::Int16 => writer
                    .write_sample(to_i16(clamped))
                    .map_err(write_error)?,
            }
        }

        writer.finalize()
            .map_err(|e| SlowReverbError::encoding(format!("Failed to finalize WAV writing: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        SlowReverbError::io(format!("Cannot open audio file {}: {}", path.display(), e))
    })?;
    decode(&bytes)
}

pub fn write_file<P: AsRef<Path>>(path: P, buffer: &AudioBuffer, format: AudioFormat) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_as(buffer, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| SlowReverbError::io(format!("Cannot create output directory: {}", e)))?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| SlowReverbError::io(format!("Cannot write output file {}: {}", path.display(), e)))
}
