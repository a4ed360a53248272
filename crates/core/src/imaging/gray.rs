use crate::shared::frame::Frame;

/// Single-channel byte image. Also used for binary masks, where set
/// pixels are 255 and clear pixels are 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Gray {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Gray {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn from_data(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }

    pub fn variance(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.data
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / self.data.len() as f64
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Fraction of set pixels; meaningful on masks.
    pub fn fill_ratio(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|&&v| v > 0).count() as f64 / self.data.len() as f64
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|&v| v as f64).collect()
    }

    /// Copy out a sub-rectangle. Caller must stay in bounds.
    pub fn view(&self, x: usize, y: usize, w: usize, h: usize) -> Gray {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let mut out = Vec::with_capacity(w * h);
        for row in 0..h {
            let start = (y + row) * self.width + x;
            out.extend_from_slice(&self.data[start..start + w]);
        }
        Gray::from_data(out, w, h)
    }

    /// Bilinear resample to the target dimensions.
    pub fn resize(&self, target_w: usize, target_h: usize) -> Gray {
        if target_w == 0 || target_h == 0 || self.is_empty() {
            return Gray::new(target_w, target_h);
        }
        let mut out = vec![0u8; target_w * target_h];
        for y in 0..target_h {
            for x in 0..target_w {
                let src_x =
                    x as f32 * (self.width as f32 - 1.0) / (target_w as f32 - 1.0).max(1.0);
                let src_y =
                    y as f32 * (self.height as f32 - 1.0) / (target_h as f32 - 1.0).max(1.0);

                let x0 = (src_x.floor() as usize).min(self.width - 1);
                let x1 = (x0 + 1).min(self.width - 1);
                let y0 = (src_y.floor() as usize).min(self.height - 1);
                let y1 = (y0 + 1).min(self.height - 1);

                let fx = src_x - x0 as f32;
                let fy = src_y - y0 as f32;

                let v00 = self.at(x0, y0) as f32;
                let v10 = self.at(x1, y0) as f32;
                let v01 = self.at(x0, y1) as f32;
                let v11 = self.at(x1, y1) as f32;

                let val = v00 * (1.0 - fx) * (1.0 - fy)
                    + v10 * fx * (1.0 - fy)
                    + v01 * (1.0 - fx) * fy
                    + v11 * fx * fy;
                out[y * target_w + x] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
        Gray::from_data(out, target_w, target_h)
    }
}

/// Luma conversion from BGR bytes (Rec. 601 weights).
pub fn grayscale(frame: &Frame) -> Gray {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let mut data = Vec::with_capacity(w * h);
    for px in frame.data().chunks_exact(3) {
        let (b, g, r) = (px[0] as f32, px[1] as f32, px[2] as f32);
        data.push((0.114 * b + 0.587 * g + 0.299 * r).round().clamp(0.0, 255.0) as u8);
    }
    Gray::from_data(data, w, h)
}

/// 256-bin intensity histogram.
pub fn histogram(image: &Gray) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in &image.data {
        hist[v as usize] += 1;
    }
    hist
}

/// Shannon entropy of the intensity distribution over `bins` buckets.
pub fn histogram_entropy(image: &Gray, bins: usize) -> f64 {
    if image.data.is_empty() || bins == 0 {
        return 0.0;
    }
    let mut hist = vec![0f64; bins];
    for &v in &image.data {
        hist[(v as usize * bins) / 256] += 1.0;
    }
    let total = image.data.len() as f64;
    hist.iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

/// Global histogram equalization, stretching the cumulative distribution
/// over the full intensity range.
pub fn equalize_hist(image: &Gray) -> Gray {
    let total = image.data.len();
    if total == 0 {
        return image.clone();
    }
    let hist = histogram(image);

    let mut cdf = [0u32; 256];
    let mut running = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    let denom = (total as u32).saturating_sub(cdf_min).max(1) as f64;

    let lut: Vec<u8> = cdf
        .iter()
        .map(|&c| {
            let scaled = (c.saturating_sub(cdf_min)) as f64 * 255.0 / denom;
            scaled.round().clamp(0.0, 255.0) as u8
        })
        .collect();

    let data = image.data.iter().map(|&v| lut[v as usize]).collect();
    Gray::from_data(data, image.width, image.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grayscale_of_pure_channels() {
        // Pure blue, green, red pixels in BGR order.
        let frame = Frame::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1);
        let gray = grayscale(&frame);
        assert_eq!(gray.at(0, 0), 29); // 0.114 * 255
        assert_eq!(gray.at(1, 0), 150); // 0.587 * 255
        assert_eq!(gray.at(2, 0), 76); // 0.299 * 255
    }

    #[test]
    fn test_mean_and_stddev_uniform() {
        let gray = Gray::from_data(vec![128; 16], 4, 4);
        assert_relative_eq!(gray.mean(), 128.0);
        assert_relative_eq!(gray.stddev(), 0.0);
    }

    #[test]
    fn test_variance_two_level() {
        let gray = Gray::from_data(vec![0, 0, 200, 200], 2, 2);
        assert_relative_eq!(gray.mean(), 100.0);
        assert_relative_eq!(gray.variance(), 10000.0);
    }

    #[test]
    fn test_fill_ratio_on_mask() {
        let mask = Gray::from_data(vec![0, 255, 255, 0], 2, 2);
        assert_relative_eq!(mask.fill_ratio(), 0.5);
    }

    #[test]
    fn test_view_extracts_subrect() {
        let mut g = Gray::new(4, 4);
        g.set(2, 1, 50);
        let v = g.view(1, 1, 3, 2);
        assert_eq!(v.width, 3);
        assert_eq!(v.height, 2);
        assert_eq!(v.at(1, 0), 50);
    }

    #[test]
    fn test_resize_uniform_stays_uniform() {
        let g = Gray::from_data(vec![80; 64], 8, 8);
        let r = g.resize(5, 3);
        assert!(r.data.iter().all(|&v| (v as i32 - 80).abs() <= 1));
    }

    #[test]
    fn test_resize_identity_dimensions() {
        let g = Gray::from_data((0..16).map(|v| v as u8 * 10).collect(), 4, 4);
        let r = g.resize(4, 4);
        assert_eq!(r, g);
    }

    #[test]
    fn test_equalize_hist_stretches_contrast() {
        // Low-contrast ramp occupying [100, 115].
        let data: Vec<u8> = (0..64).map(|i| 100 + (i % 16) as u8).collect();
        let g = Gray::from_data(data, 8, 8);
        let eq = equalize_hist(&g);
        let min = *eq.data.iter().min().unwrap();
        let max = *eq.data.iter().max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn test_equalize_hist_uniform_input() {
        let g = Gray::from_data(vec![42; 25], 5, 5);
        let eq = equalize_hist(&g);
        // A single-level image maps to a single level; no panic, no spread.
        assert!(eq.data.iter().all(|&v| v == eq.data[0]));
    }

    #[test]
    fn test_histogram_counts() {
        let g = Gray::from_data(vec![0, 0, 7, 255], 2, 2);
        let h = histogram(&g);
        assert_eq!(h[0], 2);
        assert_eq!(h[7], 1);
        assert_eq!(h[255], 1);
    }

    #[test]
    fn test_entropy_bounds() {
        let flat = Gray::from_data(vec![9; 64], 8, 8);
        assert_relative_eq!(histogram_entropy(&flat, 16), 0.0);

        // Evenly spread over 16 buckets -> entropy == 4 bits.
        let spread: Vec<u8> = (0..64).map(|i| ((i % 16) * 16) as u8).collect();
        let g = Gray::from_data(spread, 8, 8);
        assert_relative_eq!(histogram_entropy(&g, 16), 4.0, epsilon = 1e-9);
    }
}
