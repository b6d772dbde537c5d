#![allow(dead_code)]

use std::{
    ops::Range,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use x264_session::{
    convert::{PlanesMut, Yuv420Frame},
    encoders::{CodecEngine, EncoderHandle, Picture},
    error::EngineError,
    nal::Nal,
    params::{Colorspace, X264Params},
};

pub const EINVAL: i32 = -22;

#[derive(Debug, Default)]
pub struct Counters {
    pub pictures_allocated: AtomicUsize,
    pub pictures_freed: AtomicUsize,
    pub encoders_opened: AtomicUsize,
    pub encoders_closed: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory stand-in for libx264. Emits a deterministic SPS, PPS and slice
/// per frame, derived from the picture contents and pts.
#[derive(Default, Clone)]
pub struct FakeEngine {
    pub counters: Arc<Counters>,
    pub pts_log: Arc<Mutex<Vec<i64>>>,
    pub opened_with: Arc<Mutex<Option<X264Params>>>,
    pub fail_allocation: bool,
    pub fail_open: bool,
    pub fail_close: bool,
    pub fail_encode_at: Option<i64>,
    /// Frames swallowed before any output appears.
    pub delay_frames: i64,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> usize {
        Counters::get(&self.counters.pictures_allocated)
    }

    pub fn freed(&self) -> usize {
        Counters::get(&self.counters.pictures_freed)
    }

    pub fn opened(&self) -> usize {
        Counters::get(&self.counters.encoders_opened)
    }

    pub fn closed(&self) -> usize {
        Counters::get(&self.counters.encoders_closed)
    }

    pub fn pts_seen(&self) -> Vec<i64> {
        self.pts_log.lock().unwrap().clone()
    }
}

pub struct FakePicture {
    frame: Yuv420Frame,
    pts: i64,
    counters: Arc<Counters>,
}

impl Picture for FakePicture {
    fn set_pts(&mut self, pts: i64) {
        self.pts = pts;
    }

    fn planes_mut(&mut self) -> Result<PlanesMut<'_>, EngineError> {
        Ok(self.frame.planes_mut())
    }
}

impl Drop for FakePicture {
    fn drop(&mut self) {
        self.counters.pictures_freed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeEncoder {
    engine: FakeEngine,
    output: Vec<u8>,
    ranges: Vec<Range<usize>>,
}

impl FakeEncoder {
    fn push_nal(&mut self, bytes: &[u8]) {
        let start = self.output.len();
        self.output.extend_from_slice(bytes);
        self.ranges.push(start..self.output.len());
    }
}

impl EncoderHandle for FakeEncoder {
    type Picture = FakePicture;

    fn encode(&mut self, picture: &mut FakePicture) -> Result<Vec<Nal<'_>>, EngineError> {
        self.engine.pts_log.lock().unwrap().push(picture.pts);
        self.output.clear();
        self.ranges.clear();

        if self.engine.fail_encode_at == Some(picture.pts) {
            return Err(EngineError::Encode(EINVAL));
        }

        if picture.pts >= self.engine.delay_frames {
            let frame = &picture.frame;
            let checksum = |plane: &[u8]| (plane.iter().map(|&b| b as u32).sum::<u32>() % 251) as u8 + 2;

            self.push_nal(&[0, 0, 0, 1, 0x67, 0x42, frame.width() as u8 | 1]);
            self.push_nal(&[0, 0, 0, 1, 0x68, 0xCE]);
            let mut slice = vec![0, 0, 1, 0x65, picture.pts as u8 | 0x80];
            slice.extend([checksum(frame.y()), checksum(frame.u()), checksum(frame.v())]);
            slice.extend(frame.y().iter().take(8).map(|&b| b | 0x01));
            self.push_nal(&slice);
        }

        Ok(self
            .ranges
            .iter()
            .map(|range| Nal::new(&self.output[range.clone()]))
            .collect())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.engine.counters.encoders_closed.fetch_add(1, Ordering::SeqCst);
        if self.engine.fail_close {
            return Err(EngineError::Close("encoder refused to close".to_string()));
        }
        Ok(())
    }
}

impl CodecEngine for FakeEngine {
    type Picture = FakePicture;
    type Encoder = FakeEncoder;

    fn allocate_picture(
        &self,
        colorspace: Colorspace,
        width: u32,
        height: u32,
    ) -> Result<FakePicture, EngineError> {
        assert_eq!(colorspace, Colorspace::I420);
        if self.fail_allocation {
            return Err(EngineError::PictureAllocation(EINVAL));
        }

        self.counters.pictures_allocated.fetch_add(1, Ordering::SeqCst);
        Ok(FakePicture {
            frame: Yuv420Frame::new(width as usize, height as usize),
            pts: -1,
            counters: self.counters.clone(),
        })
    }

    fn open_encoder(&self, params: &X264Params) -> Result<FakeEncoder, EngineError> {
        if self.fail_open {
            return Err(EngineError::Open("invalid parameters".to_string()));
        }

        self.counters.encoders_opened.fetch_add(1, Ordering::SeqCst);
        *self.opened_with.lock().unwrap() = Some(params.clone());
        Ok(FakeEncoder {
            engine: self.clone(),
            output: Vec::new(),
            ranges: Vec::new(),
        })
    }
}

/// A moving gradient; distinct per `seed`, identical for equal seeds.
pub fn pattern_frame(width: usize, height: usize, seed: usize) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            rgb.push(((x * 4 + seed * 7) % 256) as u8);
            rgb.push(((y * 4 + seed * 3) % 256) as u8);
            rgb.push((((x + y) * 2 + seed * 11) % 256) as u8);
        }
    }
    rgb
}
