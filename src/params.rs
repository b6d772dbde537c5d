//! Native encoder parameters.
//!
//! [`X264Params`] mirrors the subset of libx264's `x264_param_t` that a
//! session configures. Field names follow x264 without the type prefixes
//! (`i_keyint_max` is `keyint_max`, `rc.f_rf_constant` is `rc.rf_constant`).

use std::collections::BTreeMap;

use crate::options::EncoderOptions;

/// Picture colorspace handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorspace {
    /// Planar YUV 4:2:0, one U and one V sample per 2x2 luma block.
    I420,
}

impl Colorspace {
    /// `X264_CSP_*` value.
    pub fn x264_csp(&self) -> i32 {
        match self {
            Colorspace::I420 => 0x0002,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControlMethod {
    /// Constant rate factor (`X264_RC_CRF`).
    Crf,
    /// Average bit rate (`X264_RC_ABR`).
    Abr,
}

/// `x264_param_t::rc`. Rates are in kbit/s as in x264.
#[derive(Debug, Clone, PartialEq)]
pub struct RateControl {
    pub method: RateControlMethod,
    pub rf_constant: Option<f32>,
    pub rf_constant_max: Option<f32>,
    pub bitrate: Option<u32>,
    pub vbv_max_bitrate: Option<u32>,
    pub vbv_buffer_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct X264Params {
    /// Applied first, then `tune`; `profile` is applied last so its limits override both.
    pub preset: &'static str,
    pub tune: &'static str,
    pub profile: &'static str,

    pub csp: Colorspace,
    pub width: u32,
    pub height: u32,
    pub threads: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub keyint_max: u32,
    pub intra_refresh: bool,

    pub rc: RateControl,

    /// SPS/PPS in front of every keyframe so decoders can join mid-stream.
    pub repeat_headers: bool,
    /// Start-code delimited NAL units.
    pub annexb: bool,
}

impl X264Params {
    /// Translates validated options into encoder parameters.
    pub fn from_options(options: &EncoderOptions) -> Self {
        // VBV only makes sense against a real ceiling
        let vbv = options.effective_max_bit_rate().map(|max_bit_rate| {
            let buffer_size = (max_bit_rate as f64 * options.bit_rate_smooth_over_seconds).round();
            (max_bit_rate, (buffer_size as u32).max(1))
        });

        let rc = if options.constant_bit_rate {
            RateControl {
                method: RateControlMethod::Abr,
                rf_constant: None,
                rf_constant_max: None,
                bitrate: options.effective_max_bit_rate(),
                vbv_max_bitrate: vbv.map(|(max, _)| max),
                vbv_buffer_size: vbv.map(|(_, size)| size),
            }
        } else {
            RateControl {
                method: RateControlMethod::Crf,
                rf_constant: Some(options.quality),
                rf_constant_max: options.quality_minimum.filter(|quality| *quality > -1.0),
                bitrate: None,
                vbv_max_bitrate: vbv.map(|(max, _)| max),
                vbv_buffer_size: vbv.map(|(_, size)| size),
            }
        };

        Self {
            preset: options.preset.as_str(),
            tune: options.tune.as_str(),
            profile: options.profile.as_str(),
            csp: Colorspace::I420,
            width: options.width,
            height: options.height,
            threads: options.threads,
            fps_num: options.fps,
            fps_den: 1,
            keyint_max: options.iframe_interval,
            intra_refresh: options.intra_refresh,
            rc,
            repeat_headers: true,
            annexb: true,
        }
    }

    /// Lowers the parameters to libavcodec option names. Rates become bit/s.
    pub fn to_codec_options(&self) -> CodecOptions {
        let mut options = CodecOptions::new()
            .set("preset", self.preset)
            .set("tune", self.tune)
            .set("profile", self.profile)
            .set("threads", &self.threads.to_string())
            .set("g", &self.keyint_max.to_string())
            .set("intra-refresh", flag(self.intra_refresh))
            .set(
                "x264-params",
                &format!(
                    "repeat-headers={}:annexb={}",
                    flag(self.repeat_headers),
                    flag(self.annexb)
                ),
            );

        if let Some(crf) = self.rc.rf_constant {
            options = options.set("crf", &crf.to_string());
        }
        if let Some(crf_max) = self.rc.rf_constant_max {
            options = options.set("crf_max", &crf_max.to_string());
        }
        if let Some(bitrate) = self.rc.bitrate {
            options = options.set("b", &kbps_to_bps(bitrate));
        }
        if let Some(max_rate) = self.rc.vbv_max_bitrate {
            options = options.set("maxrate", &kbps_to_bps(max_rate));
        }
        if let Some(buffer_size) = self.rc.vbv_buffer_size {
            options = options.set("bufsize", &kbps_to_bps(buffer_size));
        }

        options
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn kbps_to_bps(kbps: u32) -> String {
    (kbps as u64 * 1000).to_string()
}

/// Ordered key/value options handed to the codec when it is opened.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CodecOptions {
    pairs: BTreeMap<String, (String, u32)>,
}

impl CodecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.pairs.insert(key.to_string(), (value.to_string(), 0));
        self
    }

    pub fn set_flags(mut self, key: &str, value: &str, flags: u32) -> Self {
        self.pairs.insert(key.to_string(), (value.to_string(), flags));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(|(value, _)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.pairs
            .iter()
            .map(|(key, (value, flags))| (key.as_str(), value.as_str(), *flags))
    }

    #[cfg(feature = "ffmpeg")]
    pub fn to_av_dict(&self) -> Result<rsmpeg::avutil::AVDictionary, std::ffi::NulError> {
        use std::ffi::CString;

        let mut dict = rsmpeg::avutil::AVDictionary::new(cstr::cstr!(""), cstr::cstr!(""), 0);

        for (key, value, flags) in self.iter() {
            dict = dict.set(&CString::new(key)?, &CString::new(value)?, flags);
        }

        Ok(dict)
    }
}
