use serde::Serialize;

use crate::imaging::gray::Gray;
use crate::shared::frame::Frame;

/// HSV planes for a frame, in the 8-bit convention used by the template
/// assets: hue in [0, 180), saturation and value in [0, 255].
#[derive(Clone, Debug)]
pub struct Hsv {
    pub width: usize,
    pub height: usize,
    pub h: Vec<u8>,
    pub s: Vec<u8>,
    pub v: Vec<u8>,
}

/// Inclusive per-channel bounds for mask construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HsvRange {
    pub h_lo: u8,
    pub h_hi: u8,
    pub s_lo: u8,
    pub s_hi: u8,
    pub v_lo: u8,
    pub v_hi: u8,
}

impl HsvRange {
    pub fn new(h: (u8, u8), s: (u8, u8), v: (u8, u8)) -> Self {
        Self {
            h_lo: h.0,
            h_hi: h.1,
            s_lo: s.0,
            s_hi: s.1,
            v_lo: v.0,
            v_hi: v.1,
        }
    }

    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        h >= self.h_lo
            && h <= self.h_hi
            && s >= self.s_lo
            && s <= self.s_hi
            && v >= self.v_lo
            && v <= self.v_hi
    }
}

pub fn bgr_to_hsv(frame: &Frame) -> Hsv {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let n = width * height;
    let mut out = Hsv {
        width,
        height,
        h: Vec::with_capacity(n),
        s: Vec::with_capacity(n),
        v: Vec::with_capacity(n),
    };
    for px in frame.data().chunks_exact(3) {
        let (h, s, v) = pixel_to_hsv(px[0], px[1], px[2]);
        out.h.push(h);
        out.s.push(s);
        out.v.push(v);
    }
    out
}

fn pixel_to_hsv(b: u8, g: u8, r: u8) -> (u8, u8, u8) {
    let (bf, gf, rf) = (b as f32, g as f32, r as f32);
    let max = bf.max(gf).max(rf);
    let min = bf.min(gf).min(rf);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    (
        (h / 2.0).round().min(179.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    )
}

impl Hsv {
    /// Binary mask of pixels whose channels all fall inside `range`.
    pub fn mask(&self, range: &HsvRange) -> Gray {
        let data = (0..self.h.len())
            .map(|i| {
                if range.contains(self.h[i], self.s[i], self.v[i]) {
                    255
                } else {
                    0
                }
            })
            .collect();
        Gray::from_data(data, self.width, self.height)
    }

    /// Fraction of pixels inside `range`, restricted to a sub-rectangle.
    pub fn ratio_in_rect(
        &self,
        range: &HsvRange,
        x: usize,
        y: usize,
        w: usize,
        h: usize,
    ) -> f64 {
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return 0.0;
        }
        let mut hits = 0usize;
        for row in y..y + h {
            for col in x..x + w {
                let i = row * self.width + col;
                if range.contains(self.h[i], self.s[i], self.v[i]) {
                    hits += 1;
                }
            }
        }
        hits as f64 / (w * h) as f64
    }
}
