//! Managed H.264 encoding sessions.
//!
//! An [`EncodingSession`] takes interleaved RGB24 frames, converts them to
//! planar YUV 4:2:0, runs them through an x264 encoder and returns the
//! resulting Annex-B NAL units in caller-owned buffers. The `ffmpeg` feature
//! enables the libx264 backend ([`X264Session`]).

#[macro_use]
mod builder;

pub mod convert;
pub mod encoders;
pub mod error;
pub mod nal;
pub mod options;
pub mod params;
pub mod session;

pub use error::{ConfigError, EngineError, SessionError};
pub use nal::{EncodedOutput, Packaging};
pub use options::{EncoderOptions, Preset, Profile, Tune};
pub use session::{EncodingSession, SessionState};

#[cfg(feature = "ffmpeg")]
pub use rsmpeg::ffi;
#[cfg(feature = "ffmpeg")]
pub use session::X264Session;
