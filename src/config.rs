//! Process-global configuration.
//!
//! All tunables are read once at startup into an immutable `Config` held by
//! the pipelines. Per-participant metadata is layered on top when a track is
//! subscribed (see [`ParticipantHints`]).

use crate::defaults;
use crate::error::{Result, RoomscribeError};
use crate::stt::language::normalize_language;
use crate::transport::ParticipantMeta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub agc: AgcConfig,
    pub vad: VadConfig,
    pub sentence: SentenceConfig,
    pub hints: HintsConfig,
    pub correction: CorrectionConfig,
    pub room: RoomConfig,
}

/// Audio normalization and windowing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub window_ms: u32,
    pub stride_ms: u32,
}

/// Speech-to-text service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub language: Option<String>,
}

/// Automatic gain control configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgcConfig {
    pub target_rms: f32,
    pub min_gain: f32,
    pub max_gain: f32,
    pub smoothing: f32,
}

/// Voice-activity-detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    pub window_ms: u32,
    pub sensitivity: f32,
    pub silence_rms_threshold: f32,
}

/// Sentence-release configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentenceConfig {
    pub confidence_threshold: f32,
}

/// Default prompt hints, merged with per-participant metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct HintsConfig {
    pub domain_hint: Option<String>,
    pub terminology: Vec<String>,
    pub prompt: Option<String>,
}

/// Correction service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CorrectionConfig {
    pub endpoint: Option<String>,
    pub enabled: bool,
}

/// Media room configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoomConfig {
    pub name: String,
    pub topic: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            window_ms: defaults::WINDOW_MS,
            stride_ms: defaults::STRIDE_MS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/v1".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            temperature: defaults::STT_TEMPERATURE,
            language: None,
        }
    }
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            target_rms: defaults::AGC_TARGET_RMS,
            min_gain: defaults::AGC_MIN_GAIN,
            max_gain: defaults::AGC_MAX_GAIN,
            smoothing: defaults::AGC_SMOOTHING,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            window_ms: defaults::VAD_WINDOW_MS,
            sensitivity: defaults::VAD_SENSITIVITY,
            silence_rms_threshold: defaults::SILENCE_RMS_THRESHOLD,
        }
    }
}

impl Default for SentenceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            topic: defaults::DATA_TOPIC.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - ROOMSCRIBE_STT_ENDPOINT → stt.endpoint
    /// - ROOMSCRIBE_STT_API_KEY → stt.api_key
    /// - ROOMSCRIBE_MODEL → stt.model
    /// - ROOMSCRIBE_LANGUAGE → stt.language
    /// - ROOMSCRIBE_ROOM → room.name
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("ROOMSCRIBE_STT_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.stt.endpoint = endpoint;
        }

        if let Ok(key) = std::env::var("ROOMSCRIBE_STT_API_KEY")
            && !key.is_empty()
        {
            self.stt.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("ROOMSCRIBE_MODEL")
            && !model.is_empty()
        {
            self.stt.model = model;
        }

        if let Ok(language) = std::env::var("ROOMSCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = Some(language);
        }

        if let Ok(room) = std::env::var("ROOMSCRIBE_ROOM")
            && !room.is_empty()
        {
            self.room.name = room;
        }

        self
    }

    /// Validate window geometry and loop coefficients.
    ///
    /// Called once at startup; a failure here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(RoomscribeError::InvalidConfig {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.window_ms == 0 {
            return Err(RoomscribeError::InvalidConfig {
                key: "audio.window_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.stride_ms == 0 {
            return Err(RoomscribeError::InvalidConfig {
                key: "audio.stride_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.channels != 1 {
            return Err(RoomscribeError::InvalidConfig {
                key: "audio.channels".to_string(),
                message: "the canonical stream is mono".to_string(),
            });
        }
        let capacity = self.audio.sample_rate as u64 * self.audio.window_ms as u64 / 1000;
        if capacity == 0 {
            return Err(RoomscribeError::InvalidConfig {
                key: "audio.window_ms".to_string(),
                message: "window shorter than one sample".to_string(),
            });
        }
        if self.agc.min_gain > self.agc.max_gain {
            return Err(RoomscribeError::InvalidConfig {
                key: "agc.min_gain".to_string(),
                message: "min_gain exceeds max_gain".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.agc.smoothing) {
            return Err(RoomscribeError::InvalidConfig {
                key: "agc.smoothing".to_string(),
                message: "must be within [0, 1]".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/roomscribe/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("roomscribe")
            .join("config.toml")
    }
}

/// Resolved per-participant hints: global defaults with the participant's
/// metadata layered on top.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticipantHints {
    /// Normalized language code, or None when unset or unsupported.
    pub language: Option<String>,
    pub domain_hint: Option<String>,
    pub terminology: Vec<String>,
    pub prompt: Option<String>,
}

impl ParticipantHints {
    /// Layer participant metadata over the configured defaults.
    ///
    /// The locale is normalized against the supported set; terminology lists
    /// are concatenated (defaults first) rather than replaced.
    pub fn resolve(config: &Config, meta: Option<&ParticipantMeta>) -> Self {
        let mut hints = Self {
            language: config
                .stt
                .language
                .as_deref()
                .and_then(normalize_language)
                .map(str::to_string),
            domain_hint: config.hints.domain_hint.clone(),
            terminology: config.hints.terminology.clone(),
            prompt: config.hints.prompt.clone(),
        };

        if let Some(meta) = meta {
            if let Some(language) = meta.locale.as_deref().and_then(normalize_language) {
                hints.language = Some(language.to_string());
            }
            if let Some(domain) = &meta.domain_hint {
                hints.domain_hint = Some(domain.clone());
            }
            if !meta.terminology.is_empty() {
                hints.terminology.extend(meta.terminology.iter().cloned());
            }
        }

        hints
    }
}
