//! libx264 through FFmpeg.

use rsmpeg::{
    avcodec::{AVCodec, AVCodecContext},
    error::RsmpegError,
};

use cstr::cstr;

use crate::{
    error::EngineError,
    ffi,
    params::{Colorspace, X264Params},
};

use super::CodecEngine;

mod encoder;
mod picture;

pub use encoder::*;
pub use picture::*;

/// Opens libx264 encoders and allocates `AVFrame` pictures for them.
#[derive(Debug, Default, Clone, Copy)]
pub struct X264Engine;

impl CodecEngine for X264Engine {
    type Picture = X264Picture;
    type Encoder = X264Encoder;

    fn allocate_picture(
        &self,
        colorspace: Colorspace,
        width: u32,
        height: u32,
    ) -> Result<X264Picture, EngineError> {
        X264Picture::alloc(pixel_format(colorspace), width as i32, height as i32)
    }

    fn open_encoder(&self, params: &X264Params) -> Result<X264Encoder, EngineError> {
        let encoder = AVCodec::find_encoder_by_name(cstr!("libx264"))
            .ok_or(EngineError::CodecUnavailable("libx264"))?;

        let mut encode_context = AVCodecContext::new(&encoder);
        encode_context.set_width(params.width as i32);
        encode_context.set_height(params.height as i32);
        encode_context.set_time_base(ffi::AVRational {
            num: params.fps_den as i32,
            den: params.fps_num as i32,
        });
        encode_context.set_framerate(ffi::AVRational {
            num: params.fps_num as i32,
            den: params.fps_den as i32,
        });
        encode_context.set_pix_fmt(pixel_format(params.csp));

        let codec_options = params.to_codec_options();
        log::debug!("libx264 options: {:?}", codec_options);

        let options_dict = codec_options
            .to_av_dict()
            .map_err(|err| EngineError::Open(err.to_string()))?;

        encode_context
            .open(Some(options_dict))
            .map_err(|err| EngineError::Open(err.to_string()))?;

        Ok(X264Encoder::new(encode_context))
    }
}

fn pixel_format(colorspace: Colorspace) -> ffi::AVPixelFormat {
    match colorspace {
        Colorspace::I420 => ffi::AVPixelFormat_AV_PIX_FMT_YUV420P,
    }
}

fn status_code(err: &RsmpegError) -> i32 {
    err.raw_error().unwrap_or(-1)
}
