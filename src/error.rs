//! Error types for roomscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoomscribeError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio ingestion errors
    #[error("Unsupported channel layout: {channels} channels (only mono and stereo input)")]
    UnsupportedChannelLayout { channels: u16 },

    #[error("Window overflow: tried to place {requested} samples into {available} free slots")]
    WindowOverflow { requested: usize, available: usize },

    // External service errors
    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Correction forward failed: {message}")]
    Correction { message: String },

    // Transport errors
    #[error("Data channel publish failed: {message}")]
    Publish { message: String },

    #[error("Media room transport disconnected")]
    TransportDisconnected,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RoomscribeError>;
