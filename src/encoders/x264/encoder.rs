use std::ops::Range;

use log::debug;
use rsmpeg::{avcodec::AVCodecContext, error::RsmpegError};

use crate::{
    encoders::EncoderHandle,
    error::EngineError,
    nal::{split_annexb, Nal},
};

use super::{status_code, X264Picture};

/// An opened libx264 codec context.
///
/// Packets are copied into `output` as they are drained; the NAL units
/// returned by [`encode`](EncoderHandle::encode) borrow that buffer.
pub struct X264Encoder {
    encode_context: Option<AVCodecContext>,
    output: Vec<u8>,
    nal_ranges: Vec<Range<usize>>,
}

// The codec context is only touched through `&mut` by its owning session.
unsafe impl Send for X264Encoder {}

impl X264Encoder {
    pub(super) fn new(encode_context: AVCodecContext) -> Self {
        Self {
            encode_context: Some(encode_context),
            output: Vec::new(),
            nal_ranges: Vec::new(),
        }
    }

    fn receive_encoded_packets(&mut self) -> Result<(), EngineError> {
        let encode_context = self
            .encode_context
            .as_mut()
            .ok_or(EngineError::Encode(-1))?;

        loop {
            let packet = match encode_context.receive_packet() {
                Ok(packet) => packet,
                Err(RsmpegError::EncoderDrainError) => {
                    debug!("Drain error, breaking the loop");
                    break;
                }
                Err(RsmpegError::EncoderFlushedError) => {
                    debug!("Flushed error, breaking the loop");
                    break;
                }
                Err(err) => return Err(EngineError::Encode(status_code(&err))),
            };

            let data = unsafe { std::slice::from_raw_parts(packet.data, packet.size as usize) };

            debug!("Encoded packet: pts {} size {}", packet.pts, packet.size);

            // Units are contiguous and cover the whole packet.
            let mut start = self.output.len();
            for nal in split_annexb(data) {
                self.nal_ranges.push(start..start + nal.payload.len());
                start += nal.payload.len();
            }
            self.output.extend_from_slice(data);
        }

        Ok(())
    }
}

impl EncoderHandle for X264Encoder {
    type Picture = X264Picture;

    fn encode(&mut self, picture: &mut X264Picture) -> Result<Vec<Nal<'_>>, EngineError> {
        self.output.clear();
        self.nal_ranges.clear();

        let encode_context = self
            .encode_context
            .as_mut()
            .ok_or(EngineError::Encode(-1))?;

        encode_context
            .send_frame(Some(&picture.avframe))
            .map_err(|err| EngineError::Encode(status_code(&err)))?;

        self.receive_encoded_packets()?;

        Ok(self
            .nal_ranges
            .iter()
            .map(|range| Nal::new(&self.output[range.clone()]))
            .collect())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        // avcodec_free_context runs on drop
        self.encode_context.take();
        Ok(())
    }
}
