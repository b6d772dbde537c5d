use std::{fmt, str::FromStr};

use crate::error::ConfigError;

const MIN_SMOOTHING_SECONDS: f64 = 0.001;
const MAX_SMOOTHING_SECONDS: f64 = 10.0;

/// Declares a closed set of x264 identifiers. The variant list and the string
/// table are one declaration, so a new variant cannot ship without its name.
macro_rules! x264_names {
    ($(#[$meta: meta])* $name: ident, $error: ident, { $($variant: ident => $id: literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The identifier libx264 expects for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $id),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($id => Ok($name::$variant),)+
                    _ => Err(ConfigError::$error(s.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

x264_names!(
    /// Speed/compression trade-off, fastest first.
    Preset, UnknownPreset, {
        Ultrafast => "ultrafast",
        Superfast => "superfast",
        Veryfast => "veryfast",
        Faster => "faster",
        Fast => "fast",
        Medium => "medium",
        Slow => "slow",
        Slower => "slower",
        Veryslow => "veryslow",
        Placebo => "placebo",
    }
);

x264_names!(
    /// Content/latency tuning applied on top of the preset.
    Tune, UnknownTune, {
        Film => "film",
        Animation => "animation",
        Grain => "grain",
        StillImage => "stillimage",
        Psnr => "psnr",
        Ssim => "ssim",
        FastDecode => "fastdecode",
        ZeroLatency => "zerolatency",
    }
);

x264_names!(
    /// H.264 profile. Applied after preset and tune, so its constraints win.
    Profile, UnknownProfile, {
        Baseline => "baseline",
        Main => "main",
        High => "high",
        High10 => "high10",
        High422 => "high422",
        High444 => "high444",
    }
);

/// Configuration of an encoding session.
///
/// Owned by the session once opened. Validation clamps `threads` and
/// `bit_rate_smooth_over_seconds` in place, so [`EncodingSession::options`]
/// reports the values actually used.
///
/// [`EncodingSession::options`]: crate::session::EncodingSession::options
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    pub preset: Preset,
    pub tune: Tune,
    pub profile: Profile,

    /// Width of the input frames in pixels. Must be even.
    pub width: u32,
    /// Height of the input frames in pixels. Must be even.
    pub height: u32,
    /// Encoder threads, clamped to `1..=2 * available_parallelism`.
    pub threads: u32,

    /// Maximum bit rate in kbit/s. `None` or `Some(0)` means unset, which is
    /// only allowed in variable bit rate mode.
    pub max_bit_rate: Option<u32>,
    /// Length of the VBV window in seconds, clamped to `[0.001, 10]`.
    pub bit_rate_smooth_over_seconds: f64,
    /// Average bit rate mode at `max_bit_rate` instead of CRF.
    pub constant_bit_rate: bool,

    /// Target CRF in variable bit rate mode. Lower is better.
    pub quality: f32,
    /// Worst-case CRF in variable bit rate mode. `None` leaves it to x264.
    pub quality_minimum: Option<f32>,

    /// Frame rate hint. Fractional rates are not supported.
    pub fps: u32,
    /// Maximum distance between keyframes, in frames.
    pub iframe_interval: u32,
    /// Spread keyframes over several frames instead of emitting one large IDR.
    pub intra_refresh: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            preset: Preset::Superfast,
            tune: Tune::ZeroLatency,
            profile: Profile::High,
            width: 0,
            height: 0,
            threads: 1,
            max_bit_rate: None,
            bit_rate_smooth_over_seconds: 1.0,
            constant_bit_rate: false,
            quality: 25.0,
            quality_minimum: Some(35.0),
            fps: 10,
            iframe_interval: 300,
            intra_refresh: true,
        }
    }
}

impl EncoderOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_threads(width: u32, height: u32, threads: u32) -> Self {
        Self {
            threads,
            ..Self::new(width, height)
        }
    }

    builder_set!(preset, Preset);
    builder_set!(tune, Tune);
    builder_set!(profile, Profile);
    builder_set!(threads, u32);
    builder_set!(max_bit_rate, Option<u32>);
    builder_set!(bit_rate_smooth_over_seconds, f64);
    builder_set!(constant_bit_rate, bool);
    builder_set!(quality, f32);
    builder_set!(quality_minimum, Option<f32>);
    builder_set!(fps, u32);
    builder_set!(iframe_interval, u32);
    builder_set!(intra_refresh, bool);

    /// Max bit rate if one is set to a usable (non-zero) value.
    pub fn effective_max_bit_rate(&self) -> Option<u32> {
        self.max_bit_rate.filter(|rate| *rate > 0)
    }

    /// Size in bytes of one interleaved RGB24 input frame.
    pub fn rgb_frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Checks the options and writes the clamped values back.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        self.threads = self.threads.clamp(1, max_threads());

        // NaN would survive clamp
        if self.bit_rate_smooth_over_seconds.is_nan() {
            self.bit_rate_smooth_over_seconds = MIN_SMOOTHING_SECONDS;
        }
        self.bit_rate_smooth_over_seconds = self
            .bit_rate_smooth_over_seconds
            .clamp(MIN_SMOOTHING_SECONDS, MAX_SMOOTHING_SECONDS);

        if self.constant_bit_rate && self.effective_max_bit_rate().is_none() {
            return Err(ConfigError::MissingBitRate);
        }

        if self.fps == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }

        if self.iframe_interval == 0 {
            return Err(ConfigError::InvalidKeyframeInterval);
        }

        Ok(())
    }
}

/// Upper bound for `threads`: twice the available parallelism.
pub fn max_threads() -> u32 {
    let cores = std::thread::available_parallelism()
        .map(|cores| cores.get() as u32)
        .unwrap_or(1);
    cores.saturating_mul(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = EncoderOptions::new(320, 192);
        assert_eq!(options.preset, Preset::Superfast);
        assert_eq!(options.tune, Tune::ZeroLatency);
        assert_eq!(options.profile, Profile::High);
        assert_eq!(options.threads, 1);
        assert_eq!(options.quality, 25.0);
        assert_eq!(options.quality_minimum, Some(35.0));
        assert_eq!(options.fps, 10);
        assert_eq!(options.iframe_interval, 300);
        assert!(options.intra_refresh);
        assert!(!options.constant_bit_rate);
        assert_eq!(options.max_bit_rate, None);
    }

    #[test]
    fn odd_or_zero_dimensions_are_rejected() {
        for (width, height) in [(0, 16), (16, 0), (15, 16), (16, 17)] {
            let err = EncoderOptions::new(width, height).validate().unwrap_err();
            assert_eq!(err, ConfigError::InvalidDimensions { width, height });
        }
    }

    #[test]
    fn threads_are_clamped_in_place() {
        let mut options = EncoderOptions::with_threads(64, 64, 0);
        options.validate().unwrap();
        assert_eq!(options.threads, 1);

        let mut options = EncoderOptions::with_threads(64, 64, u32::MAX);
        options.validate().unwrap();
        assert_eq!(options.threads, max_threads());
    }

    #[test]
    fn smoothing_window_is_clamped() {
        let mut options = EncoderOptions::new(64, 64).bit_rate_smooth_over_seconds(0.0);
        options.validate().unwrap();
        assert_eq!(options.bit_rate_smooth_over_seconds, 0.001);

        let mut options = EncoderOptions::new(64, 64).bit_rate_smooth_over_seconds(60.0);
        options.validate().unwrap();
        assert_eq!(options.bit_rate_smooth_over_seconds, 10.0);
    }

    #[test]
    fn constant_bit_rate_needs_a_bit_rate() {
        let mut options = EncoderOptions::new(64, 64).constant_bit_rate(true);
        assert_eq!(options.validate(), Err(ConfigError::MissingBitRate));

        let mut options = options.max_bit_rate(0);
        assert_eq!(options.validate(), Err(ConfigError::MissingBitRate));

        let mut options = options.max_bit_rate(4000);
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn zero_rates_are_rejected() {
        let mut options = EncoderOptions::new(64, 64).fps(0);
        assert_eq!(options.validate(), Err(ConfigError::InvalidFrameRate));

        let mut options = EncoderOptions::new(64, 64).iframe_interval(0);
        assert_eq!(options.validate(), Err(ConfigError::InvalidKeyframeInterval));
    }

    #[test]
    fn names_parse_back() {
        for preset in Preset::ALL {
            assert_eq!(preset.as_str().parse::<Preset>(), Ok(*preset));
        }
        for tune in Tune::ALL {
            assert_eq!(tune.to_string().parse::<Tune>(), Ok(*tune));
        }
        assert_eq!(" High444 ".parse::<Profile>(), Ok(Profile::High444));
        assert_eq!(
            "turbo".parse::<Preset>(),
            Err(ConfigError::UnknownPreset("turbo".to_string()))
        );
    }
}
