//! Error types for option validation, the codec engine and encoding sessions.

use thiserror::Error;

/// Invalid encoder configuration, reported before any native resource exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("each dimension must be a positive even number, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("constant bit rate encoding requires a max bit rate greater than 0")]
    MissingBitRate,

    #[error("frame rate must be greater than 0")]
    InvalidFrameRate,

    #[error("keyframe interval must be greater than 0")]
    InvalidKeyframeInterval,

    #[error("unknown x264 preset '{0}'")]
    UnknownPreset(String),

    #[error("unknown x264 tune '{0}'")]
    UnknownTune(String),

    #[error("unknown x264 profile '{0}'")]
    UnknownProfile(String),
}

/// Failure reported by the external codec engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("encoder '{0}' is not available")]
    CodecUnavailable(&'static str),

    #[error("picture allocation failed with code {0}")]
    PictureAllocation(i32),

    #[error("failed to open encoder: {0}")]
    Open(String),

    #[error("encode failed with status {0}")]
    Encode(i32),

    #[error("failed to close encoder: {0}")]
    Close(String),
}

impl EngineError {
    /// Native status code, when the engine reported one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::PictureAllocation(code) | Self::Encode(code) => Some(*code),
            _ => None,
        }
    }
}

/// Errors surfaced by [`EncodingSession`](crate::session::EncodingSession).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("invalid encoder options: {0}")]
    Config(#[from] ConfigError),

    #[error("encoder initialization failed: {0}")]
    Initialization(EngineError),

    #[error("input image data has size {actual} but the expected size is {expected} ({width} * {height} * 3)")]
    InvalidInputSize {
        expected: usize,
        actual: usize,
        width: u32,
        height: u32,
    },

    /// The encoder state is undefined after this; dispose the session and open a new one.
    #[error("encoding failed with status {code}")]
    EncodeFailed { code: i32 },

    #[error("the session has been disposed")]
    UseAfterDispose,
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
