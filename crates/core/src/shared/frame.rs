use ndarray::ArrayView3;

use crate::shared::region::Region;

/// Number of color channels in a frame (blue, green, red).
pub const CHANNELS: usize = 3;

/// A single camera frame: contiguous BGR bytes in row-major order.
///
/// Frames are owned by the caller for the duration of one detection call
/// and are never mutated by analysis; stages that need altered pixels work
/// on copies or on derived grayscale buffers.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// A frame filled with a single BGR color.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * CHANNELS);
        for _ in 0..(width as usize) * (height as usize) {
            data.extend_from_slice(&bgr);
        }
        Self::new(data, width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// BGR triple at `(x, y)`. Caller must stay in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Overwrite the BGR triple at `(x, y)`. Caller must stay in bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        let i = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        self.data[i..i + 3].copy_from_slice(&bgr);
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Convert a decoded image into a BGR frame. Format conversion happens
    /// at I/O boundaries only; the pipeline only ever sees `Frame`s.
    pub fn from_image(image: &image::DynamicImage) -> Frame {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * CHANNELS);
        for px in rgb.pixels() {
            data.extend_from_slice(&[px.0[2], px.0[1], px.0[0]]);
        }
        Frame::new(data, width, height)
    }

    /// Bilinear resample to the target dimensions.
    pub fn resize(&self, target_w: u32, target_h: u32) -> Frame {
        let (tw, th) = (target_w as usize, target_h as usize);
        let (w, h) = (self.width as usize, self.height as usize);
        let mut out = vec![0u8; tw * th * CHANNELS];
        for y in 0..th {
            for x in 0..tw {
                let src_x = x as f32 * (w as f32 - 1.0) / (tw as f32 - 1.0).max(1.0);
                let src_y = y as f32 * (h as f32 - 1.0) / (th as f32 - 1.0).max(1.0);

                let x0 = (src_x.floor() as usize).min(w - 1);
                let x1 = (x0 + 1).min(w - 1);
                let y0 = (src_y.floor() as usize).min(h - 1);
                let y1 = (y0 + 1).min(h - 1);

                let fx = src_x - x0 as f32;
                let fy = src_y - y0 as f32;

                for c in 0..CHANNELS {
                    let v00 = self.data[(y0 * w + x0) * CHANNELS + c] as f32;
                    let v10 = self.data[(y0 * w + x1) * CHANNELS + c] as f32;
                    let v01 = self.data[(y1 * w + x0) * CHANNELS + c] as f32;
                    let v11 = self.data[(y1 * w + x1) * CHANNELS + c] as f32;
                    let val = v00 * (1.0 - fx) * (1.0 - fy)
                        + v10 * fx * (1.0 - fy)
                        + v01 * (1.0 - fx) * fy
                        + v11 * fx * fy;
                    out[(y * tw + x) * CHANNELS + c] = val.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        Frame::new(out, target_w, target_h)
    }

    /// Mean of the per-channel standard deviations, a cheap colorfulness
    /// measure.
    pub fn channel_stddev_mean(&self) -> f64 {
        let n = (self.width as usize * self.height as usize) as f64;
        if n == 0.0 {
            return 0.0;
        }
        let mut sums = [0f64; 3];
        let mut sq_sums = [0f64; 3];
        for px in self.data.chunks_exact(CHANNELS) {
            for c in 0..CHANNELS {
                let v = px[c] as f64;
                sums[c] += v;
                sq_sums[c] += v * v;
            }
        }
        let mut total = 0f64;
        for c in 0..CHANNELS {
            let mean = sums[c] / n;
            total += (sq_sums[c] / n - mean * mean).max(0.0).sqrt();
        }
        total / CHANNELS as f64
    }

    /// Bounds-checked crop. Returns `None` when the region is degenerate or
    /// extends past the frame; analysis stages treat that as a zero score,
    /// never as a panic.
    pub fn crop(&self, region: &Region) -> Option<Frame> {
        if !region.is_within(self.width, self.height) {
            return None;
        }
        let (x, y) = (region.x as usize, region.y as usize);
        let (w, h) = (region.width as usize, region.height as usize);
        let mut out = Vec::with_capacity(w * h * CHANNELS);
        for row in 0..h {
            let start = ((y + row) * self.width as usize + x) * CHANNELS;
            out.extend_from_slice(&self.data[start..start + w * CHANNELS]);
        }
        Some(Frame::new(out, w as u32, h as u32))
    }
}
