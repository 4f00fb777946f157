//! slowreverb - Slow and Reverb Audio Processor
//!
//! Decodes a WAV file, slows it down, adds reverb, and encodes it again.
//! The same pipeline backs the CLI and the HTTP upload service.

pub mod audio;
pub mod config;
pub mod effects;
pub mod error;
pub mod processing;
pub mod server;

pub use audio::{decode, encode, AudioBuffer};
pub use config::{Config, Args};
pub use error::{SlowReverbError, Result};
pub use processing::{process, EffectParameters, SlowReverbProcessor};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Info by default, debug when verbose. `RUST_LOG` takes precedence.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init()
        .ok();
}

pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} - {}", self.name, self.version, self.description)
    }
}
