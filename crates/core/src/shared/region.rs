use serde::Serialize;

/// An axis-aligned bounding box in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        (self.width.max(0) as f64) * (self.height.max(0) as f64)
    }

    /// Width over height; 0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0 {
            self.width as f64 / self.height as f64
        } else {
            0.0
        }
    }

    /// True when the box is non-degenerate and lies fully inside a
    /// `frame_width` x `frame_height` frame.
    pub fn is_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && (self.x + self.width) as i64 <= frame_width as i64
            && (self.y + self.height) as i64 <= frame_height as i64
    }

    pub fn iou(&self, other: &Region) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - inter;
        inter / union
    }
}

/// A proposed document region together with the color evidence that
/// produced it. `color_ratio` is the fraction of header-colored pixels
/// inside the box; shape-fallback proposals carry a small sentinel ratio.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Candidate {
    pub region: Region,
    pub area: f64,
    pub color_ratio: f64,
}

impl Candidate {
    pub fn new(region: Region, area: f64, color_ratio: f64) -> Self {
        Self {
            region,
            area,
            color_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(x, y, w, h)
    }

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical_regions() {
        let a = region(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = region(0, 0, 50, 50);
        let b = region(100, 100, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // a: [0,0]-[100,100], b: [50,0]-[150,100]
        // intersection: [50,0]-[100,100] = 50*100 = 5000
        // union: 10000 + 10000 - 5000 = 15000
        let a = region(0, 0, 100, 100);
        let b = region(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_contained() {
        let a = region(0, 0, 100, 100);
        let b = region(25, 25, 50, 50);
        assert_relative_eq!(a.iou(&b), 2500.0 / 10000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = region(0, 0, 50, 50);
        let b = region(50, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[rstest]
    #[case::zero_width(region(0, 0, 0, 100), region(0, 0, 50, 50), 0.0)]
    #[case::zero_height(region(0, 0, 100, 0), region(0, 0, 50, 50), 0.0)]
    fn test_iou_degenerate(#[case] a: Region, #[case] b: Region, #[case] expected: f64) {
        assert_relative_eq!(a.iou(&b), expected);
    }

    // ── Geometry ─────────────────────────────────────────────────────

    #[test]
    fn test_aspect_ratio() {
        assert_relative_eq!(region(0, 0, 160, 100).aspect_ratio(), 1.6);
        assert_relative_eq!(region(0, 0, 160, 0).aspect_ratio(), 0.0);
    }

    #[test]
    fn test_area_clamps_negative_dimensions() {
        assert_relative_eq!(region(0, 0, -5, 10).area(), 0.0);
        assert_relative_eq!(region(0, 0, 20, 10).area(), 200.0);
    }

    #[rstest]
    #[case::inside(region(0, 0, 640, 480), true)]
    #[case::exact_fit(region(50, 50, 590, 430), true)]
    #[case::past_right(region(600, 0, 100, 100), false)]
    #[case::past_bottom(region(0, 400, 100, 100), false)]
    #[case::negative_origin(region(-1, 0, 100, 100), false)]
    #[case::zero_width(region(0, 0, 0, 100), false)]
    fn test_is_within(#[case] r: Region, #[case] expected: bool) {
        assert_eq!(r.is_within(640, 480), expected);
    }
}
