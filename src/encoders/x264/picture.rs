use rsmpeg::avutil::AVFrame;

use crate::{convert::PlanesMut, encoders::Picture, error::EngineError, ffi};

use super::status_code;

/// A YUV420P `AVFrame` that the session fills and feeds to libx264.
pub struct X264Picture {
    pub(super) avframe: AVFrame,
}

// The frame is only touched through `&mut` by its owning session.
unsafe impl Send for X264Picture {}

impl X264Picture {
    pub(super) fn alloc(
        pixel_format: ffi::AVPixelFormat,
        width: i32,
        height: i32,
    ) -> Result<Self, EngineError> {
        let mut avframe = AVFrame::new();
        avframe.set_format(pixel_format);
        avframe.set_width(width);
        avframe.set_height(height);
        avframe
            .alloc_buffer()
            .map_err(|err| EngineError::PictureAllocation(status_code(&err)))?;

        Ok(Self { avframe })
    }
}

impl Picture for X264Picture {
    fn set_pts(&mut self, pts: i64) {
        self.avframe.set_pts(pts);
    }

    fn planes_mut(&mut self) -> Result<PlanesMut<'_>, EngineError> {
        // libavcodec may still hold a reference to the previous frame's buffers.
        let ret = unsafe { ffi::av_frame_make_writable(self.avframe.as_mut_ptr()) };
        if ret < 0 {
            return Err(EngineError::PictureAllocation(ret));
        }

        let linesize = self.avframe.linesize;
        let height = self.avframe.height as usize;

        let y_stride = linesize[0] as usize;
        let u_stride = linesize[1] as usize;
        let v_stride = linesize[2] as usize;

        let y = unsafe { std::slice::from_raw_parts_mut(self.avframe.data[0], height * y_stride) };
        let u = unsafe { std::slice::from_raw_parts_mut(self.avframe.data[1], (height / 2) * u_stride) };
        let v = unsafe { std::slice::from_raw_parts_mut(self.avframe.data[2], (height / 2) * v_stride) };

        Ok(PlanesMut {
            y,
            y_stride,
            u,
            u_stride,
            v,
            v_stride,
        })
    }
}
