//! Keypoint detection and descriptor extraction.
//!
//! Two descriptor families back the feature verification path: a fast
//! binary family (segment-test corners with randomized intensity-pair
//! descriptors, matched by Hamming distance) and a richer scale-invariant
//! family (multi-octave gradient-orientation histograms, matched by
//! Euclidean distance).

use std::sync::OnceLock;

use rand::prelude::*;

use crate::imaging::blur::gaussian_blur;
use crate::imaging::gray::Gray;

/// Circle offsets for the 16-point segment test, radius 3.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const SEGMENT_ARC: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub score: f64,
}

/// Segment-test corner detection with 3x3 non-maximum suppression.
///
/// A pixel is a corner when at least 9 contiguous circle pixels are all
/// brighter or all darker than the center by `threshold`. Returns the
/// strongest `max_features` corners.
pub fn detect_corners(image: &Gray, threshold: u8, max_features: usize) -> Vec<Keypoint> {
    let (w, h) = (image.width, image.height);
    if w < 7 || h < 7 {
        return Vec::new();
    }

    let mut scores = vec![0f64; w * h];
    for y in 3..h - 3 {
        for x in 3..w - 3 {
            if let Some(score) = corner_score(image, x, y, threshold) {
                scores[y * w + x] = score;
            }
        }
    }

    let mut corners = Vec::new();
    for y in 3..h - 3 {
        for x in 3..w - 3 {
            let s = scores[y * w + x];
            if s == 0.0 {
                continue;
            }
            let mut is_max = true;
            'nms: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = scores[(y as i32 + dy) as usize * w + (x as i32 + dx) as usize];
                    if n > s || (n == s && (dy < 0 || (dy == 0 && dx < 0))) {
                        is_max = false;
                        break 'nms;
                    }
                }
            }
            if is_max {
                corners.push(Keypoint {
                    x: x as f64,
                    y: y as f64,
                    score: s,
                });
            }
        }
    }

    corners.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    corners.truncate(max_features);
    corners
}

fn corner_score(image: &Gray, x: usize, y: usize, threshold: u8) -> Option<f64> {
    let center = image.at(x, y) as i32;
    let t = threshold as i32;

    let mut brighter = [false; 16];
    let mut darker = [false; 16];
    for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
        let v = image.at((x as i32 + dx) as usize, (y as i32 + dy) as usize) as i32;
        brighter[i] = v > center + t;
        darker[i] = v < center - t;
    }

    if !has_contiguous_arc(&brighter) && !has_contiguous_arc(&darker) {
        return None;
    }

    // Corner strength: total circle deviation beyond the threshold.
    let mut score = 0f64;
    for &(dx, dy) in &CIRCLE {
        let v = image.at((x as i32 + dx) as usize, (y as i32 + dy) as usize) as i32;
        let d = (v - center).abs() - t;
        if d > 0 {
            score += d as f64;
        }
    }
    Some(score)
}

fn has_contiguous_arc(flags: &[bool; 16]) -> bool {
    let mut run = 0usize;
    // Wrap around so arcs crossing index 0 still count.
    for i in 0..32 {
        if flags[i % 16] {
            run += 1;
            if run >= SEGMENT_ARC {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

// ── Binary descriptors ───────────────────────────────────────────────

pub const BINARY_DESCRIPTOR_BITS: usize = 256;
const PATCH_RADIUS: i32 = 15;
const PATTERN_SEED: u64 = 0x5ca1ab1e;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryDescriptor(pub [u32; 8]);

impl BinaryDescriptor {
    pub fn hamming(&self, other: &BinaryDescriptor) -> u32 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

fn sampling_pattern() -> &'static Vec<(i32, i32, i32, i32)> {
    static PATTERN: OnceLock<Vec<(i32, i32, i32, i32)>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        (0..BINARY_DESCRIPTOR_BITS)
            .map(|_| {
                (
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                )
            })
            .collect()
    })
}

/// Binary descriptors over smoothed intensity comparisons.
///
/// Keypoints too close to the border for a full patch are dropped.
pub fn compute_binary_descriptors(
    image: &Gray,
    keypoints: &[Keypoint],
) -> Vec<(Keypoint, BinaryDescriptor)> {
    let smoothed = gaussian_blur(image, 5);
    let (w, h) = (smoothed.width as i32, smoothed.height as i32);
    let pattern = sampling_pattern();

    let mut out = Vec::new();
    for &kp in keypoints {
        let (cx, cy) = (kp.x.round() as i32, kp.y.round() as i32);
        if cx - PATCH_RADIUS - 1 < 0
            || cy - PATCH_RADIUS - 1 < 0
            || cx + PATCH_RADIUS + 1 >= w
            || cy + PATCH_RADIUS + 1 >= h
        {
            continue;
        }
        let mut words = [0u32; 8];
        for (bit, &(x1, y1, x2, y2)) in pattern.iter().enumerate() {
            let a = smoothed.at((cx + x1) as usize, (cy + y1) as usize);
            let b = smoothed.at((cx + x2) as usize, (cy + y2) as usize);
            if a < b {
                words[bit / 32] |= 1 << (bit % 32);
            }
        }
        out.push((kp, BinaryDescriptor(words)));
    }
    out
}

// ── Gradient-histogram descriptors ───────────────────────────────────

const GRID: usize = 4;
const ORIENTATION_BINS: usize = 8;
pub const PATCH_DESCRIPTOR_LEN: usize = GRID * GRID * ORIENTATION_BINS;
const PATCH_SPAN: i32 = 8; // half-width of the 16x16 sampling window

#[derive(Clone, Debug, PartialEq)]
pub struct PatchDescriptor {
    /// Position in base-image coordinates.
    pub x: f64,
    pub y: f64,
    pub values: [f32; PATCH_DESCRIPTOR_LEN],
}

impl PatchDescriptor {
    pub fn distance(&self, other: &PatchDescriptor) -> f32 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

/// Scale-invariant descriptors: corners detected per pyramid octave, each
/// described by a grid of gradient-orientation histograms and mapped back
/// to base coordinates.
pub fn compute_patch_descriptors(
    image: &Gray,
    threshold: u8,
    max_features: usize,
) -> Vec<PatchDescriptor> {
    let mut out = Vec::new();
    let mut level = image.clone();
    let mut scale = 1.0f64;
    for _ in 0..3 {
        if level.width < 24 || level.height < 24 {
            break;
        }
        let per_level = max_features / 2;
        for kp in detect_corners(&level, threshold, per_level.max(8)) {
            if let Some(values) = describe_patch(&level, kp.x as i32, kp.y as i32) {
                out.push(PatchDescriptor {
                    x: kp.x * scale,
                    y: kp.y * scale,
                    values,
                });
            }
        }
        level = level.resize(level.width / 2, level.height / 2);
        scale *= 2.0;
    }
    out
}

fn describe_patch(image: &Gray, cx: i32, cy: i32) -> Option<[f32; PATCH_DESCRIPTOR_LEN]> {
    let (w, h) = (image.width as i32, image.height as i32);
    if cx - PATCH_SPAN < 1 || cy - PATCH_SPAN < 1 || cx + PATCH_SPAN >= w - 1 || cy + PATCH_SPAN >= h - 1 {
        return None;
    }

    let mut hist = [0f32; PATCH_DESCRIPTOR_LEN];
    for dy in -PATCH_SPAN..PATCH_SPAN {
        for dx in -PATCH_SPAN..PATCH_SPAN {
            let (px, py) = (cx + dx, cy + dy);
            let gx = image.at((px + 1) as usize, py as usize) as f32
                - image.at((px - 1) as usize, py as usize) as f32;
            let gy = image.at(px as usize, (py + 1) as usize) as f32
                - image.at(px as usize, (py - 1) as usize) as f32;
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let angle = gy.atan2(gx).rem_euclid(std::f32::consts::TAU);
            let bin = ((angle / std::f32::consts::TAU) * ORIENTATION_BINS as f32) as usize
                % ORIENTATION_BINS;

            let cell_x = ((dx + PATCH_SPAN) as usize) / (2 * PATCH_SPAN as usize / GRID);
            let cell_y = ((dy + PATCH_SPAN) as usize) / (2 * PATCH_SPAN as usize / GRID);
            hist[(cell_y * GRID + cell_x) * ORIENTATION_BINS + bin] += magnitude;
        }
    }

    // Normalize, clamp dominant gradients, renormalize.
    normalize(&mut hist);
    for v in &mut hist {
        *v = v.min(0.2);
    }
    normalize(&mut hist);
    Some(hist)
}

fn normalize(values: &mut [f32; PATCH_DESCRIPTOR_LEN]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}
