use log::debug;

use crate::imaging::blur::gaussian_blur;
use crate::imaging::contours::{approx_polygon, arc_length, find_external_contours};
use crate::imaging::edges::canny;
use crate::imaging::gray::grayscale;
use crate::imaging::hsv::{bgr_to_hsv, HsvRange};
use crate::imaging::morphology::{close, open};
use crate::shared::frame::Frame;
use crate::shared::region::Candidate;

/// Tuning for the color-cue candidate proposal stage.
///
/// Two shipped presets: the tolerant default accepts a wide hue window and
/// loose geometry for varied capture angles; [`LocatorConfig::strict`]
/// narrows everything down for the latency-sensitive path.
#[derive(Clone, Debug)]
pub struct LocatorConfig {
    pub header_range: HsvRange,
    /// Minimum contour area as a fraction of the frame area.
    pub min_area_fraction: f64,
    pub aspect_ratio: (f64, f64),
    /// Minimum fraction of header-colored pixels inside the bounding box.
    pub min_color_ratio: f64,
    pub morph_kernel: usize,
    /// Cap on returned candidates, best color ratio first.
    pub max_candidates: usize,
    pub fallback: FallbackConfig,
}

/// Tuning for the shape-only fallback that runs when color cues fail.
#[derive(Clone, Debug)]
pub struct FallbackConfig {
    pub min_area_fraction: f64,
    pub aspect_ratio: (f64, f64),
    /// Contour area over bounding-box area; rejects fragmented outlines.
    pub min_fill_ratio: f64,
    pub vertex_range: (usize, usize),
    pub canny_thresholds: (f64, f64),
    /// Polygon approximation epsilon as a fraction of the perimeter.
    pub approx_epsilon: f64,
    /// Color ratio recorded on shape-only candidates, marking them for the
    /// tolerant acceptance branch downstream.
    pub sentinel_color_ratio: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            header_range: HsvRange::new((90, 140), (40, 255), (40, 255)),
            min_area_fraction: 0.008,
            aspect_ratio: (1.2, 2.8),
            min_color_ratio: 0.15,
            morph_kernel: 3,
            max_candidates: 2,
            fallback: FallbackConfig::default(),
        }
    }
}

impl LocatorConfig {
    /// Narrow preset for the real-time path: specific hue band, card-exact
    /// aspect window, high fill requirement.
    pub fn strict() -> Self {
        Self {
            header_range: HsvRange::new((105, 120), (80, 255), (80, 255)),
            min_area_fraction: 0.008,
            aspect_ratio: (1.55, 1.85),
            min_color_ratio: 0.6,
            ..Self::default()
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.005,
            aspect_ratio: (1.0, 3.0),
            min_fill_ratio: 0.7,
            vertex_range: (4, 8),
            canny_thresholds: (50.0, 150.0),
            approx_epsilon: 0.02,
            sentinel_color_ratio: 0.1,
        }
    }
}

/// Proposes rectangular document candidates from color and shape cues.
pub struct CandidateLocator {
    config: LocatorConfig,
}

impl CandidateLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Ordered candidate proposals, possibly empty. Every returned region
    /// lies fully inside the frame.
    pub fn locate(&self, frame: &Frame) -> Vec<Candidate> {
        let mut candidates = self.locate_by_color(frame);
        if candidates.is_empty() {
            debug!("no color candidates, trying shape fallback");
            candidates = self.locate_by_shape(frame);
        }

        candidates.sort_by(|a, b| b.color_ratio.partial_cmp(&a.color_ratio).unwrap());
        candidates.truncate(self.config.max_candidates);
        candidates
    }

    fn locate_by_color(&self, frame: &Frame) -> Vec<Candidate> {
        let cfg = &self.config;
        let frame_area = (frame.width() as f64) * (frame.height() as f64);

        let hsv = bgr_to_hsv(frame);
        let mask = hsv.mask(&cfg.header_range);
        let mask = open(&close(&mask, cfg.morph_kernel), cfg.morph_kernel);

        let mut candidates = Vec::new();
        for contour in find_external_contours(&mask) {
            let area = contour.polygon_area();
            if area <= cfg.min_area_fraction * frame_area {
                continue;
            }
            let bbox = contour.bounding_box();
            let aspect = bbox.aspect_ratio();
            if aspect <= cfg.aspect_ratio.0 || aspect >= cfg.aspect_ratio.1 {
                debug!("rejected candidate: aspect {aspect:.2} outside window");
                continue;
            }
            let roi = mask.view(
                bbox.x as usize,
                bbox.y as usize,
                bbox.width as usize,
                bbox.height as usize,
            );
            let color_ratio = roi.fill_ratio();
            if color_ratio < cfg.min_color_ratio {
                debug!("rejected candidate: color ratio {color_ratio:.2} too low");
                continue;
            }
            candidates.push(Candidate::new(bbox, area, color_ratio));
        }
        candidates
    }

    fn locate_by_shape(&self, frame: &Frame) -> Vec<Candidate> {
        let cfg = &self.config.fallback;
        let frame_area = (frame.width() as f64) * (frame.height() as f64);

        let gray = grayscale(frame);
        let blurred = gaussian_blur(&gray, 5);
        let edges = canny(&blurred, cfg.canny_thresholds.0, cfg.canny_thresholds.1);
        let closed = close(&edges, 3);

        let mut candidates = Vec::new();
        for contour in find_external_contours(&closed) {
            let area = contour.polygon_area();
            if area <= cfg.min_area_fraction * frame_area {
                continue;
            }

            let boundary: Vec<(f64, f64)> = contour
                .boundary
                .iter()
                .map(|&(x, y)| (x as f64, y as f64))
                .collect();
            let epsilon = cfg.approx_epsilon * arc_length(&boundary, true);
            let vertices = approx_polygon(&boundary, epsilon).len();
            if vertices < cfg.vertex_range.0 || vertices > cfg.vertex_range.1 {
                continue;
            }

            let bbox = contour.bounding_box();
            let aspect = bbox.aspect_ratio();
            if aspect <= cfg.aspect_ratio.0 || aspect >= cfg.aspect_ratio.1 {
                continue;
            }

            let fill_ratio = area / bbox.area().max(1.0);
            if fill_ratio < cfg.min_fill_ratio {
                continue;
            }

            debug!(
                "shape fallback candidate {}x{} ({vertices} vertices, fill {fill_ratio:.2})",
                bbox.width, bbox.height
            );
            candidates.push(Candidate::new(bbox, area, cfg.sentinel_color_ratio));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::Region;
    use crate::testutil::frame_with_blue_rect;

    #[test]
    fn test_solid_header_rect_is_located() {
        let rect = Region::new(50, 50, 300, 180);
        let frame = frame_with_blue_rect(640, 480, rect);
        let candidates = CandidateLocator::new(LocatorConfig::default()).locate(&frame);

        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert!((best.region.x - rect.x).abs() <= 3);
        assert!((best.region.y - rect.y).abs() <= 3);
        assert!((best.region.width - rect.width).abs() <= 3);
        assert!((best.region.height - rect.height).abs() <= 3);
        assert!(best.color_ratio > 0.9);
    }

    #[test]
    fn test_all_black_frame_yields_nothing() {
        let frame = Frame::filled(640, 480, [0, 0, 0]);
        let candidates = CandidateLocator::new(LocatorConfig::default()).locate(&frame);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_candidates_stay_inside_frame() {
        let frame = frame_with_blue_rect(320, 240, Region::new(10, 10, 200, 120));
        for c in CandidateLocator::new(LocatorConfig::default()).locate(&frame) {
            assert!(c.region.is_within(320, 240));
            assert!((0.0..=1.0).contains(&c.color_ratio));
        }
    }

    #[test]
    fn test_square_region_rejected_by_aspect() {
        let frame = frame_with_blue_rect(640, 480, Region::new(100, 100, 150, 150));
        let candidates = CandidateLocator::new(LocatorConfig::default()).locate(&frame);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_tiny_region_rejected_by_area() {
        // 24x15 = 360 px against a 0.8% floor of 2458 px.
        let frame = frame_with_blue_rect(640, 480, Region::new(100, 100, 24, 15));
        let candidates = CandidateLocator::new(LocatorConfig::default()).locate(&frame);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_output_sorted_by_color_ratio_and_truncated() {
        let mut frame = frame_with_blue_rect(640, 480, Region::new(20, 20, 160, 100));
        // L-shaped second region: same bbox aspect, but only ~55% of the
        // box is header-colored.
        for y in 160..260 {
            for x in 300..420 {
                frame.set_pixel(x, y, crate::testutil::HEADER_BLUE);
            }
        }
        for y in 250..260 {
            for x in 420..540 {
                frame.set_pixel(x, y, crate::testutil::HEADER_BLUE);
            }
        }

        let locator = CandidateLocator::new(LocatorConfig::default());
        let both = locator.locate(&frame);
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].region.x, 20);
        assert!(both[0].color_ratio > both[1].color_ratio);

        let capped = CandidateLocator::new(LocatorConfig {
            max_candidates: 1,
            ..LocatorConfig::default()
        })
        .locate(&frame);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].region.x, 20);
    }

    #[test]
    fn test_strict_preset_rejects_diluted_color() {
        // Candidate where only ~half the box is header-colored.
        let mut frame = Frame::filled(640, 480, [30, 30, 30]);
        for y in 100..220 {
            for x in 100..300 {
                if x < 200 {
                    frame.set_pixel(x, y, crate::testutil::HEADER_BLUE);
                } else {
                    frame.set_pixel(x, y, [30, 30, 30]);
                }
            }
        }
        let strict = CandidateLocator::new(LocatorConfig::strict()).locate(&frame);
        assert!(strict.is_empty());
    }

    #[test]
    fn test_shape_fallback_finds_plain_rectangle() {
        // Light rectangle, no header color anywhere: only the shape path
        // can propose it.
        let mut frame = Frame::filled(320, 240, [30, 30, 30]);
        for y in 60..160 {
            for x in 60..260 {
                frame.set_pixel(x, y, [180, 180, 180]);
            }
        }
        let candidates = CandidateLocator::new(LocatorConfig::default()).locate(&frame);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert!((c.color_ratio - 0.1).abs() < 1e-9, "sentinel ratio expected");
        assert!((c.region.width - 200).abs() <= 6);
        assert!((c.region.height - 100).abs() <= 6);
    }
}
