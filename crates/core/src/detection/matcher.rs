use log::debug;

use crate::detection::result::{
    DetectionResult, Evidence, MatchMetric, Verifier, VerifierOutcome,
};
use crate::imaging::blur::gaussian_blur;
use crate::imaging::gray::{equalize_hist, grayscale, Gray};
use crate::shared::frame::Frame;
use crate::shared::region::{Candidate, Region};
use crate::templates::catalog::TemplateCatalog;
use crate::templates::selector;
use crate::templates::template::Template;

/// Tuning for multi-scale template correlation.
#[derive(Clone, Debug)]
pub struct MatcherConfig {
    /// Template scale factors tried against the frame.
    pub scales: Vec<f64>,
    /// Minimum best-metric score for a scale to produce a detection.
    pub min_confidence: f64,
    /// Overlap above which a lower-ranked detection is suppressed.
    pub nms_iou: f64,
    pub max_detections: usize,
    /// Also evaluate the squared-difference metric (inverted polarity).
    pub use_sqdiff: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            scales: (3..=12).map(|s| s as f64 / 10.0).collect(),
            min_confidence: 0.6,
            nms_iou: 0.5,
            max_detections: 3,
            use_sqdiff: true,
        }
    }
}

/// Multi-scale normalized correlation of a reference template against a
/// frame.
pub struct TemplateMatcher {
    config: MatcherConfig,
}

/// Blur + histogram equalization applied to both sides before correlation.
pub(crate) fn preprocess_for_matching(gray: &Gray) -> Gray {
    equalize_hist(&gaussian_blur(gray, 3))
}

impl TemplateMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Raw detections surviving the per-scale confidence floor and the
    /// overlap suppression, best first, at most `max_detections`.
    pub fn match_template(&self, frame: &Frame, template: &Template) -> Vec<DetectionResult> {
        let frame_gray = preprocess_for_matching(&grayscale(frame));
        let (fw, fh) = (frame_gray.width, frame_gray.height);

        let mut detections = Vec::new();
        for &scale in &self.config.scales {
            let tw = ((template.width() as f64) * scale).round() as usize;
            let th = ((template.height() as f64) * scale).round() as usize;
            if tw < 8 || th < 8 || tw > fw || th > fh {
                continue;
            }
            let scaled = preprocess_for_matching(&template.gray.resize(tw, th));

            let Some(best) = best_match(&frame_gray, &scaled, self.config.use_sqdiff) else {
                continue;
            };
            if best.score < self.config.min_confidence {
                continue;
            }
            debug!(
                "scale {scale:.1}: {:?} score {:.3} at ({}, {})",
                best.metric, best.score, best.x, best.y
            );
            detections.push(DetectionResult::new(
                Region::new(best.x as i32, best.y as i32, tw as i32, th as i32),
                best.score,
                scale,
                best.metric,
                template.kind,
            ));
        }

        suppress_overlaps(detections, self.config.nms_iou, self.config.max_detections)
    }
}

/// Greedy non-maximum suppression: keep a detection only when its IoU with
/// every higher-confidence kept detection stays at or below the threshold.
pub fn suppress_overlaps(
    mut detections: Vec<DetectionResult>,
    iou_threshold: f64,
    max_keep: usize,
) -> Vec<DetectionResult> {
    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
    let mut kept: Vec<DetectionResult> = Vec::new();
    for det in detections {
        let overlaps = kept
            .iter()
            .any(|k| k.region.iou(&det.region) > iou_threshold);
        if !overlaps {
            kept.push(det);
        }
        if kept.len() == max_keep {
            break;
        }
    }
    kept
}

/// Template-correlation verification of a single proposed region: the
/// crop is scored directly against the selected reference at matched
/// dimensions.
pub struct TemplateVerifier<'a> {
    catalog: &'a TemplateCatalog,
    min_confidence: f64,
}

impl<'a> TemplateVerifier<'a> {
    pub fn new(catalog: &'a TemplateCatalog, min_confidence: f64) -> Self {
        Self {
            catalog,
            min_confidence,
        }
    }
}

impl Verifier for TemplateVerifier<'_> {
    fn verify(&self, frame: &Frame, candidate: &Candidate) -> VerifierOutcome {
        let Some(crop) = frame.crop(&candidate.region) else {
            return VerifierOutcome::rejected();
        };
        let Ok(template) = selector::select(self.catalog, frame) else {
            return VerifierOutcome::rejected();
        };

        let gray = grayscale(&crop);
        let scored = preprocess_for_matching(&gray);
        let reference =
            preprocess_for_matching(&template.gray.resize(gray.width, gray.height));
        let confidence = same_size_correlation(&scored, &reference).clamp(0.0, 1.0);
        if confidence < self.min_confidence {
            return VerifierOutcome::rejected();
        }
        VerifierOutcome::accepted(
            confidence,
            Evidence {
                template_confidence: Some(confidence),
                ..Evidence::default()
            },
        )
    }
}

struct BestMatch {
    x: usize,
    y: usize,
    score: f64,
    metric: MatchMetric,
}

/// Slide `template` over `image`, scoring every position under the
/// enabled correlation metrics, and return the single best hit.
fn best_match(image: &Gray, template: &Gray, use_sqdiff: bool) -> Option<BestMatch> {
    let (iw, ih) = (image.width, image.height);
    let (tw, th) = (template.width, template.height);
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let n = (tw * th) as f64;
    let t: Vec<f64> = template.to_f64();
    let sum_t: f64 = t.iter().sum();
    let sum_t2: f64 = t.iter().map(|&v| v * v).sum();
    let mean_t = sum_t / n;
    let var_t = sum_t2 - n * mean_t * mean_t;

    // Integral images give per-window sums of f and f^2 in O(1).
    let (integral, integral_sq) = integrals(image);
    let window_sum = |x: usize, y: usize, integral: &[f64]| -> f64 {
        let w1 = iw + 1;
        integral[(y + th) * w1 + (x + tw)] + integral[y * w1 + x]
            - integral[y * w1 + (x + tw)]
            - integral[(y + th) * w1 + x]
    };

    let mut best: Option<BestMatch> = None;
    let mut consider = |x: usize, y: usize, score: f64, metric: MatchMetric| {
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(BestMatch {
                x,
                y,
                score,
                metric,
            });
        }
    };

    for y in 0..=(ih - th) {
        for x in 0..=(iw - tw) {
            let mut cross = 0.0;
            for row in 0..th {
                let img_off = (y + row) * iw + x;
                let tpl_off = row * tw;
                for col in 0..tw {
                    cross += image.data[img_off + col] as f64 * t[tpl_off + col];
                }
            }

            let sum_f = window_sum(x, y, &integral);
            let sum_f2 = window_sum(x, y, &integral_sq);
            let mean_f = sum_f / n;
            let var_f = sum_f2 - n * mean_f * mean_f;

            let norm = (sum_f2 * sum_t2).sqrt();
            if norm > 0.0 {
                consider(x, y, cross / norm, MatchMetric::CrossCorrNormed);
                if use_sqdiff {
                    let sqdiff = (sum_f2 - 2.0 * cross + sum_t2) / norm;
                    consider(x, y, 1.0 - sqdiff, MatchMetric::SqDiffNormed);
                }
            }

            let coeff_norm = (var_f * var_t).sqrt();
            if coeff_norm > 0.0 {
                let coeff = (cross - n * mean_f * mean_t) / coeff_norm;
                consider(x, y, coeff, MatchMetric::CorrCoeffNormed);
            }
        }
    }
    best
}

fn integrals(image: &Gray) -> (Vec<f64>, Vec<f64>) {
    let (w, h) = (image.width, image.height);
    let w1 = w + 1;
    let mut integral = vec![0f64; w1 * (h + 1)];
    let mut integral_sq = vec![0f64; w1 * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0.0;
        let mut row_sum_sq = 0.0;
        for x in 0..w {
            let v = image.data[y * w + x] as f64;
            row_sum += v;
            row_sum_sq += v * v;
            integral[(y + 1) * w1 + (x + 1)] = integral[y * w1 + (x + 1)] + row_sum;
            integral_sq[(y + 1) * w1 + (x + 1)] = integral_sq[y * w1 + (x + 1)] + row_sum_sq;
        }
    }
    (integral, integral_sq)
}

/// Same-size correlation used for direct region-against-template scoring:
/// the higher of the zero-mean and plain normalized correlations.
pub(crate) fn same_size_correlation(a: &Gray, b: &Gray) -> f64 {
    debug_assert_eq!((a.width, a.height), (b.width, b.height));
    if a.is_empty() {
        return 0.0;
    }
    let n = a.data.len() as f64;
    let af: Vec<f64> = a.to_f64();
    let bf: Vec<f64> = b.to_f64();

    let (mut sum_a, mut sum_b, mut sum_a2, mut sum_b2, mut cross) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for i in 0..af.len() {
        sum_a += af[i];
        sum_b += bf[i];
        sum_a2 += af[i] * af[i];
        sum_b2 += bf[i] * bf[i];
        cross += af[i] * bf[i];
    }

    let mut best: f64 = 0.0;
    let norm = (sum_a2 * sum_b2).sqrt();
    if norm > 0.0 {
        best = best.max(cross / norm);
    }
    let var_a = sum_a2 - sum_a * sum_a / n;
    let var_b = sum_b2 - sum_b * sum_b / n;
    let coeff_norm = (var_a * var_b).sqrt();
    if coeff_norm > 0.0 {
        best = best.max((cross - sum_a * sum_b / n) / coeff_norm);
    }
    best
}
