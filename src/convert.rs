//! RGB24 to planar YUV 4:2:0 conversion.
//!
//! BT.601 limited range in 8.8 fixed point:
//!
//! ```text
//! Y = ((  66 R + 129 G +  25 B + 128) >> 8) +  16
//! U = (( -38 R -  74 G + 112 B + 128) >> 8) + 128
//! V = (( 112 R -  94 G -  18 B + 128) >> 8) + 128
//! ```
//!
//! Chroma is the mean of the four contributions of each 2x2 block, rounded
//! half up, so a given input always produces the same bytes.

/// Writable views of the three planes of a YUV 4:2:0 picture.
///
/// Strides are in bytes and may be larger than the plane width when the
/// picture buffer pads its rows.
pub struct PlanesMut<'a> {
    pub y: &'a mut [u8],
    pub y_stride: usize,
    pub u: &'a mut [u8],
    pub u_stride: usize,
    pub v: &'a mut [u8],
    pub v_stride: usize,
}

/// Converts interleaved RGB24 frames of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelConverter {
    width: usize,
    height: usize,
}

impl PixelConverter {
    /// `width` and `height` must be even.
    pub fn new(width: usize, height: usize) -> Self {
        debug_assert!(width % 2 == 0 && height % 2 == 0);
        Self { width, height }
    }

    pub fn rgb_len(&self) -> usize {
        self.width * self.height * 3
    }

    /// Writes `rgb` into `planes`. Nothing is allocated.
    ///
    /// # Panics
    ///
    /// If `rgb` is not `width * height * 3` bytes or a plane is too small for
    /// its stride.
    pub fn convert(&self, rgb: &[u8], planes: &mut PlanesMut<'_>) {
        let (width, height) = (self.width, self.height);
        let (chroma_width, chroma_height) = (width / 2, height / 2);

        assert_eq!(rgb.len(), self.rgb_len(), "RGB buffer does not match frame size");
        assert!(planes.y_stride >= width && planes.y.len() >= plane_len(planes.y_stride, width, height));
        assert!(planes.u_stride >= chroma_width && planes.u.len() >= plane_len(planes.u_stride, chroma_width, chroma_height));
        assert!(planes.v_stride >= chroma_width && planes.v.len() >= plane_len(planes.v_stride, chroma_width, chroma_height));

        let rgb_stride = width * 3;

        for cy in 0..chroma_height {
            let top = &rgb[2 * cy * rgb_stride..(2 * cy + 1) * rgb_stride];
            let bottom = &rgb[(2 * cy + 1) * rgb_stride..(2 * cy + 2) * rgb_stride];

            let (y_top, y_bottom) = {
                let rows = &mut planes.y[2 * cy * planes.y_stride..];
                let (top, bottom) = rows.split_at_mut(planes.y_stride);
                (&mut top[..width], &mut bottom[..width])
            };
            let u_row = &mut planes.u[cy * planes.u_stride..cy * planes.u_stride + chroma_width];
            let v_row = &mut planes.v[cy * planes.v_stride..cy * planes.v_stride + chroma_width];

            for cx in 0..chroma_width {
                let mut u_sum = 0;
                let mut v_sum = 0;

                for (rgb_row, y_row) in [(top, &mut *y_top), (bottom, &mut *y_bottom)] {
                    for x in [2 * cx, 2 * cx + 1] {
                        let (r, g, b) = (
                            rgb_row[x * 3] as i32,
                            rgb_row[x * 3 + 1] as i32,
                            rgb_row[x * 3 + 2] as i32,
                        );

                        y_row[x] = luma(r, g, b);
                        u_sum += -38 * r - 74 * g + 112 * b;
                        v_sum += 112 * r - 94 * g - 18 * b;
                    }
                }

                u_row[cx] = chroma_from_sum(u_sum);
                v_row[cx] = chroma_from_sum(v_sum);
            }
        }
    }
}

fn plane_len(stride: usize, width: usize, rows: usize) -> usize {
    if rows == 0 {
        0
    } else {
        stride * (rows - 1) + width
    }
}

#[inline]
fn luma(r: i32, g: i32, b: i32) -> u8 {
    saturate(((66 * r + 129 * g + 25 * b + 128) >> 8) + 16)
}

/// `sum` holds four 8.8 contributions; dividing by 4 and by 256 is one shift.
#[inline]
fn chroma_from_sum(sum: i32) -> u8 {
    saturate(((sum + 512) >> 10) + 128)
}

#[inline]
fn saturate(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// An owned, tightly packed YUV 4:2:0 picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Yuv420Frame {
    width: usize,
    height: usize,
    y: Vec<u8>,
    u: Vec<u8>,
    v: Vec<u8>,
}

impl Yuv420Frame {
    pub fn new(width: usize, height: usize) -> Self {
        let chroma_len = (width / 2) * (height / 2);
        Self {
            width,
            height,
            y: vec![0; width * height],
            u: vec![0; chroma_len],
            v: vec![0; chroma_len],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub fn u(&self) -> &[u8] {
        &self.u
    }

    pub fn v(&self) -> &[u8] {
        &self.v
    }

    pub fn planes_mut(&mut self) -> PlanesMut<'_> {
        let chroma_width = self.width / 2;
        PlanesMut {
            y: &mut self.y,
            y_stride: self.width,
            u: &mut self.u,
            u_stride: chroma_width,
            v: &mut self.v,
            v_stride: chroma_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(rgb: &[u8], width: usize, height: usize) -> Yuv420Frame {
        let mut frame = Yuv420Frame::new(width, height);
        PixelConverter::new(width, height).convert(rgb, &mut frame.planes_mut());
        frame
    }

    #[test]
    fn primaries_match_bt601() {
        let cases = [
            ([0u8, 0, 0], (16u8, 128u8, 128u8)),
            ([255, 255, 255], (235, 128, 128)),
            ([255, 0, 0], (82, 90, 240)),
            ([0, 255, 0], (144, 54, 34)),
            ([0, 0, 255], (41, 240, 110)),
        ];

        for (pixel, (y, u, v)) in cases {
            let rgb: Vec<u8> = pixel.iter().copied().cycle().take(2 * 2 * 3).collect();
            let frame = convert(&rgb, 2, 2);
            assert_eq!(frame.y(), &[y; 4], "luma of {:?}", pixel);
            assert_eq!((frame.u()[0], frame.v()[0]), (u, v), "chroma of {:?}", pixel);
        }
    }

    #[test]
    fn gray_128_is_uniform() {
        let frame = convert(&vec![128; 4 * 4 * 3], 4, 4);
        assert!(frame.y().iter().all(|&y| y == 126));
        assert!(frame.u().iter().all(|&u| u == 128));
        assert!(frame.v().iter().all(|&v| v == 128));
    }

    #[test]
    fn chroma_averages_each_block() {
        // Left block: two red and two blue pixels. Right block: black.
        #[rustfmt::skip]
        let rgb = [
            255, 0, 0,   0, 0, 255,   0, 0, 0,   0, 0, 0,
            0, 0, 255,   255, 0, 0,   0, 0, 0,   0, 0, 0,
        ];
        let frame = convert(&rgb, 4, 2);

        // U sum: 2 * (-38 * 255) + 2 * (112 * 255) = 37740 -> 37 + 128
        assert_eq!(frame.u(), &[165, 128]);
        // V sum: 2 * (112 * 255) + 2 * (-18 * 255) = 47940 -> 47 + 128
        assert_eq!(frame.v(), &[175, 128]);
        assert_eq!(&frame.y()[..2], &[82, 41]);
    }

    #[test]
    fn padded_strides_leave_padding_untouched() {
        let (width, height) = (4, 2);
        let rgb = vec![200; width * height * 3];
        let mut y = vec![0xAA; 8 * height];
        let mut u = vec![0xAA; 4];
        let mut v = vec![0xAA; 4];

        let mut planes = PlanesMut {
            y: &mut y,
            y_stride: 8,
            u: &mut u,
            u_stride: 4,
            v: &mut v,
            v_stride: 4,
        };
        PixelConverter::new(width, height).convert(&rgb, &mut planes);

        assert_eq!(&y[4..8], &[0xAA; 4]);
        assert_eq!(&y[12..16], &[0xAA; 4]);
        assert!(y[..4].iter().chain(&y[8..12]).all(|&luma| luma == y[0]));
        assert_eq!(&u[2..], &[0xAA; 2]);
    }

    #[test]
    #[should_panic(expected = "RGB buffer does not match frame size")]
    fn wrong_input_size_panics() {
        convert(&[0; 5], 2, 2);
    }
}
