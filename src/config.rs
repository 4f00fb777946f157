//! Configuration management for the service and the offline processor

use crate::audio::AudioFormat;
use crate::error::{SlowReverbError, Result};
use crate::processing::pipeline::DEFAULT_MAX_DURATION_SECS;
use crate::processing::EffectParameters;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;

const MAX_REQUEST_TIMEOUT_SECS: f64 = 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub effects: EffectsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub worker_threads: usize,
    pub max_concurrent_jobs: usize,
    pub request_timeout_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub max_duration_secs: f64,
}

/// Defaults applied when a request does not set a parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub speed_factor: f32,
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub output_format: AudioFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            worker_threads: num_cpus::get(),
            max_concurrent_jobs: 4,
            request_timeout_secs: 300.0,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        let params = EffectParameters::default();
        Self {
            speed_factor: params.speed_factor,
            room_size: params.room_size,
            damping: params.damping,
            wet_level: params.wet_level,
            output_format: AudioFormat::Int16,
        }
    }
}

impl EffectsConfig {
    pub fn parameters(&self) -> EffectParameters {
        EffectParameters {
            speed_factor: self.speed_factor,
            room_size: self.room_size,
            damping: self.damping,
            wet_level: self.wet_level,
        }
    }
}

impl Config {
    /// Bind address as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Per-request processing deadline; fractional seconds are honoured
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.server.request_timeout_secs)
    }

    /// Worker threads to start, capped at 2x logical CPU cores so a config
    /// written on a bigger host still runs here
    pub fn effective_worker_threads(&self) -> usize {
        self.server.worker_threads.min(num_cpus::get() * 2)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SlowReverbError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SlowReverbError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SlowReverbError::config("Port must be greater than 0"));
        }

        if self.server.worker_threads == 0 {
            return Err(SlowReverbError::config("Worker thread count must be greater than 0"));
        }

        if self.server.max_concurrent_jobs == 0 {
            return Err(SlowReverbError::config("Max concurrent jobs must be greater than 0"));
        }
        if self.server.max_concurrent_jobs > Semaphore::MAX_PERMITS {
            return Err(SlowReverbError::config(format!(
                "Max concurrent jobs cannot exceed {}", Semaphore::MAX_PERMITS
            )));
        }

        let timeout = self.server.request_timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 || timeout > MAX_REQUEST_TIMEOUT_SECS {
            return Err(SlowReverbError::config(format!(
                "Request timeout must be in range (0, {}] seconds", MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(SlowReverbError::config("Max upload size must be greater than 0"));
        }

        if !(self.limits.max_duration_secs > 0.0) {
            return Err(SlowReverbError::config("Max duration must be greater than 0"));
        }

        self.effects
            .parameters()
            .validate()
            .map_err(|e| SlowReverbError::config(format!("Invalid default effects: {}", e)))
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SlowReverbError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SlowReverbError::config(format!("Failed to write config file: {}", e)))
    }

    /// Create default config file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}

#[derive(Debug, Parser)]
#[command(name = "slowreverb", about = "Slow and reverb audio processor", version, author)]
pub struct Args {
    #[arg(short = 'c', long = "config", global = true, help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", global = true, help = "Enable verbose output mode")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP upload service
    Serve {
        #[arg(long = "host", help = "Address to bind")]
        host: Option<String>,

        #[arg(short = 'p', long = "port", env = "PORT", help = "Port to listen on")]
        port: Option<u16>,
    },
    /// Process a WAV file on disk
    Process(ProcessArgs),
    /// Write the default configuration to a file
    InitConfig {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ProcessArgs {
    #[arg(short = 'i', long = "input", help = "Input audio file path (WAV format)")]
    pub input: PathBuf,

    #[arg(short = 'o', long = "output", default_value = "output.wav", help = "Output audio file path")]
    pub output: PathBuf,

    #[arg(long = "speed-factor", allow_negative_numbers = true, conflicts_with = "speed_preset", help = "Playback speed (0.5 - 1.5, below 1 slows down)")]
    pub speed_factor: Option<f32>,

    #[arg(long = "speed-preset", help = "Speed preset index (0 - 9)")]
    pub speed_preset: Option<usize>,

    #[arg(long = "room-size", conflicts_with = "reverb_preset", help = "Reverb room size (0.0 - 1.0)")]
    pub room_size: Option<f32>,

    #[arg(long = "reverb-preset", help = "Reverb preset index (0 - 3)")]
    pub reverb_preset: Option<usize>,

    #[arg(long = "damping", help = "Reverb damping (0.0 - 1.0)")]
    pub damping: Option<f32>,

    #[arg(long = "wet-level", help = "Reverb wet level (0.0 - 1.0)")]
    pub wet_level: Option<f32>,

    #[arg(long = "float-output", help = "Write 32-bit float samples instead of 16-bit PCM")]
    pub float_output: bool,
}

impl ProcessArgs {
    /// Resolve parameters: config defaults, then presets, then explicit values
    pub fn effect_parameters(&self, defaults: EffectParameters) -> Result<EffectParameters> {
        let mut params = defaults;
        if let Some(index) = self.speed_preset {
            params = params.with_speed_preset(index)?;
        }
        if let Some(index) = self.reverb_preset {
            params = params.with_reverb_preset(index)?;
        }
        if let Some(v) = self.speed_factor { params.speed_factor = v; }
        if let Some(v) = self.room_size { params.room_size = v; }
        if let Some(v) = self.damping { params.damping = v; }
        if let Some(v) = self.wet_level { params.wet_level = v; }
        params.validate()?;
        Ok(params)
    }
}

impl Config {
    /// Apply `serve` overrides from the command line
    pub fn with_server_overrides(mut self, host: Option<String>, port: Option<u16>) -> Result<Self> {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self.validate()?;
        Ok(self)
    }
}
