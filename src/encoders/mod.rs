//! The boundary to the native H.264 encoder.
//!
//! A [`CodecEngine`] allocates picture buffers and opens encoders. An opened
//! [`EncoderHandle`] encodes one picture at a time and hands back the NAL
//! units it produced. The session owns both and never lets them escape.

use crate::{convert::PlanesMut, error::EngineError, nal::Nal, params::{Colorspace, X264Params}};

#[cfg(feature = "ffmpeg")]
pub mod x264;

pub trait CodecEngine {
    type Picture: Picture;
    type Encoder: EncoderHandle<Picture = Self::Picture>;

    /// Allocates an input picture. Dropping it frees the buffer.
    fn allocate_picture(
        &self,
        colorspace: Colorspace,
        width: u32,
        height: u32,
    ) -> Result<Self::Picture, EngineError>;

    fn open_encoder(&self, params: &X264Params) -> Result<Self::Encoder, EngineError>;
}

pub trait EncoderHandle {
    type Picture;

    /// Encodes one picture.
    ///
    /// May return no NAL units while the encoder buffers input. The payloads
    /// point into encoder memory and are only valid until the next call.
    fn encode(&mut self, picture: &mut Self::Picture) -> Result<Vec<Nal<'_>>, EngineError>;

    /// Releases the native encoder. Called at most once.
    fn close(&mut self) -> Result<(), EngineError>;
}

/// An input picture buffer in planar YUV 4:2:0.
pub trait Picture {
    fn set_pts(&mut self, pts: i64);

    fn planes_mut(&mut self) -> Result<PlanesMut<'_>, EngineError>;
}
