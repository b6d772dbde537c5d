use bytes::Bytes;
use log::{debug, info, warn};

use crate::{
    convert::PixelConverter,
    encoders::{CodecEngine, EncoderHandle, Picture},
    error::{Result, SessionError},
    nal::{package, EncodedOutput, Packaging},
    options::EncoderOptions,
    params::X264Params,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Disposed,
}

struct Resources<E: CodecEngine> {
    encoder: E::Encoder,
    picture: E::Picture,
}

/// An opened H.264 encoder that turns RGB24 frames into Annex-B NAL units.
///
/// The session exclusively owns the native encoder and its input picture.
/// Both are released by [`dispose`](Self::dispose) or, failing that, on drop.
/// Encoding takes `&mut self`; use one session per concurrent stream.
pub struct EncodingSession<E: CodecEngine> {
    options: EncoderOptions,
    converter: PixelConverter,
    resources: Option<Resources<E>>,
    frame: i64,
}

impl<E: CodecEngine> EncodingSession<E> {
    /// Validates `options`, allocates the input picture and opens the encoder.
    ///
    /// Whatever was allocated before a failing step is released before the
    /// error is returned.
    pub fn open(engine: &E, mut options: EncoderOptions) -> Result<Self> {
        options.validate()?;
        let params = X264Params::from_options(&options);

        let picture = engine
            .allocate_picture(params.csp, params.width, params.height)
            .map_err(SessionError::Initialization)?;

        // On failure `picture` is dropped here, which frees it.
        let encoder = engine
            .open_encoder(&params)
            .map_err(SessionError::Initialization)?;

        info!(
            "Opened {}x{} encoder (preset {}, tune {}, profile {}, {} threads, {:?})",
            params.width, params.height, params.preset, params.tune, params.profile, params.threads, params.rc.method
        );

        Ok(Self {
            converter: PixelConverter::new(options.width as usize, options.height as usize),
            options,
            resources: Some(Resources { encoder, picture }),
            frame: 0,
        })
    }

    /// Effective options, after clamping.
    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn width(&self) -> u32 {
        self.options.width
    }

    pub fn height(&self) -> u32 {
        self.options.height
    }

    pub fn threads(&self) -> u32 {
        self.options.threads
    }

    pub fn state(&self) -> SessionState {
        if self.resources.is_some() {
            SessionState::Open
        } else {
            SessionState::Disposed
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.resources.is_none()
    }

    /// Number of presentation timestamps handed out so far.
    pub fn frames_submitted(&self) -> i64 {
        self.frame
    }

    /// Encodes a frame, returning each NAL unit in its own buffer.
    ///
    /// `rgb` holds `width * height * 3` bytes of row-major R, G, B samples.
    pub fn encode_frame(&mut self, rgb: &[u8]) -> Result<Vec<Bytes>> {
        self.encode_frame_with(rgb, Packaging::PerNalBuffers)
            .map(EncodedOutput::into_units)
    }

    /// Encodes a frame, returning all of its NAL units in one buffer.
    pub fn encode_frame_as_whole_buffer(&mut self, rgb: &[u8]) -> Result<Bytes> {
        self.encode_frame_with(rgb, Packaging::SingleConcatenatedBuffer)
            .map(EncodedOutput::into_bytes)
    }

    pub fn encode_frame_with(&mut self, rgb: &[u8], packaging: Packaging) -> Result<EncodedOutput> {
        let resources = self.resources.as_mut().ok_or(SessionError::UseAfterDispose)?;

        let expected = self.converter.rgb_len();
        if rgb.len() != expected {
            return Err(SessionError::InvalidInputSize {
                expected,
                actual: rgb.len(),
                width: self.options.width,
                height: self.options.height,
            });
        }

        let pts = self.frame;
        self.frame += 1;
        resources.picture.set_pts(pts);

        {
            let mut planes = resources
                .picture
                .planes_mut()
                .map_err(|err| SessionError::EncodeFailed { code: err.code().unwrap_or(-1) })?;
            self.converter.convert(rgb, &mut planes);
        }

        let nals = resources
            .encoder
            .encode(&mut resources.picture)
            .map_err(|err| SessionError::EncodeFailed { code: err.code().unwrap_or(-1) })?;

        let output = package(&nals, packaging);

        debug!("Encoded frame {} into {} NAL units ({} bytes)", pts, nals.len(), output.len());

        Ok(output)
    }

    /// Closes the encoder and frees the picture. Later calls do nothing.
    ///
    /// A failing close is logged and does not stop the picture from being freed.
    pub fn dispose(&mut self) {
        let Some(Resources { mut encoder, picture }) = self.resources.take() else {
            return;
        };

        if let Err(err) = encoder.close() {
            warn!("Ignoring error while closing encoder: {}", err);
        }

        drop(picture);
        drop(encoder);

        info!("Disposed encoder after {} frames", self.frame);
    }
}

impl<E: CodecEngine> Drop for EncodingSession<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(feature = "ffmpeg")]
pub type X264Session = EncodingSession<crate::encoders::x264::X264Engine>;

#[cfg(feature = "ffmpeg")]
impl EncodingSession<crate::encoders::x264::X264Engine> {
    /// Opens a libx264 session with default options and one thread.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_options(EncoderOptions::new(width, height))
    }

    pub fn with_threads(width: u32, height: u32, threads: u32) -> Result<Self> {
        Self::with_options(EncoderOptions::with_threads(width, height, threads))
    }

    pub fn with_options(options: EncoderOptions) -> Result<Self> {
        Self::open(&crate::encoders::x264::X264Engine, options)
    }
}
