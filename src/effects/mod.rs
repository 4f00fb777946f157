//! Audio Effects

pub mod reverb;

pub use reverb::{apply_reverb, ReverbSettings};
