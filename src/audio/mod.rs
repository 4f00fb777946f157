//! Audio Module
//!
//! PCM buffers, WAV decode/encode, and the speed-change resampler.

pub mod buffer;
pub mod resample;
pub mod wav;

pub use buffer::AudioBuffer;
pub use resample::change_speed;
pub use wav::{decode, encode, encode_as, AudioFormat};
