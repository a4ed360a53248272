use log::debug;

use crate::detection::matcher::{preprocess_for_matching, same_size_correlation};
use crate::detection::result::{Evidence, ScoreComponent, Verifier, VerifierOutcome};
use crate::imaging::blur::gaussian_blur;
use crate::imaging::edges::{canny, mean_gradient_magnitude};
use crate::imaging::fourier::{fft2_log_magnitude, ring_mean};
use crate::imaging::gray::{equalize_hist, grayscale, Gray};
use crate::imaging::hsv::{bgr_to_hsv, Hsv, HsvRange};
use crate::imaging::morphology::dilate_iter;
use crate::imaging::contours::find_external_contours;
use crate::shared::constants::HEADER_BAND_FRACTION;
use crate::shared::frame::Frame;
use crate::shared::region::Candidate;
use crate::templates::catalog::TemplateCatalog;
use crate::templates::selector;
use crate::templates::template::Template;

/// Tuning for the heuristic pattern verification stage.
///
/// The acceptance thresholds mirror the shipped defaults; all are
/// provisional pending tuning against a labeled capture set.
#[derive(Clone, Debug)]
pub struct PatternConfig {
    /// Header hue window for the primary header check.
    pub header_range: HsvRange,
    /// Secondary window catching faded or heavily shadowed headers.
    pub faded_header_range: HsvRange,
    /// Weight of the pattern confidence in the final blend.
    pub pattern_weight: f64,
    /// Weight of the direct template correlation in the final blend.
    pub template_weight: f64,

    pub min_pattern_score: f64,
    pub min_combined_score: f64,
    pub strong_template_score: f64,
    pub good_combined_score: f64,
    /// Candidates at or below this color ratio are shape-fallback
    /// proposals and get the tolerant acceptance branch.
    pub fallback_color_ratio: f64,
    pub fallback_pattern_score: f64,

    pub critical_pattern_score: f64,
    pub critical_template_score: f64,
    pub critical_combined_score: f64,
    pub critical_strong_pattern: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            header_range: HsvRange::new((90, 140), (30, 255), (30, 255)),
            faded_header_range: HsvRange::new((0, 180), (0, 100), (40, 120)),
            pattern_weight: 0.7,
            template_weight: 0.3,
            min_pattern_score: 0.35,
            min_combined_score: 0.40,
            strong_template_score: 0.50,
            good_combined_score: 0.45,
            fallback_color_ratio: 0.15,
            fallback_pattern_score: 0.25,
            critical_pattern_score: 0.30,
            critical_template_score: 0.45,
            critical_combined_score: 0.35,
            critical_strong_pattern: 0.40,
        }
    }
}

/// One entry of the check table: a scoring function plus the two
/// thresholds converting its [0, 1] score into 1 / 0.5 / 0 credit.
struct PatternCheck {
    name: &'static str,
    full_threshold: f64,
    partial_threshold: f64,
    run: fn(&PatternConfig, &CheckInput<'_>) -> f64,
}

struct CheckInput<'a> {
    crop: &'a Frame,
    gray: &'a Gray,
    hsv: &'a Hsv,
}

const CHECKS: [PatternCheck; 7] = [
    PatternCheck {
        name: "header_color",
        full_threshold: 0.6,
        partial_threshold: 0.4,
        run: check_header_color,
    },
    PatternCheck {
        name: "text_regions",
        full_threshold: 0.5,
        partial_threshold: 0.3,
        run: check_text_regions,
    },
    PatternCheck {
        name: "photo_area",
        full_threshold: 0.4,
        partial_threshold: 0.25,
        run: check_photo_area,
    },
    PatternCheck {
        name: "background_gradient",
        full_threshold: 0.5,
        partial_threshold: 0.3,
        run: check_background_gradient,
    },
    PatternCheck {
        name: "edge_density",
        full_threshold: 0.4,
        partial_threshold: 0.25,
        run: check_edge_density,
    },
    PatternCheck {
        name: "color_distribution",
        full_threshold: 0.5,
        partial_threshold: 0.3,
        run: check_color_distribution,
    },
    PatternCheck {
        name: "watermark",
        full_threshold: 0.4,
        partial_threshold: 0.25,
        run: check_watermark,
    },
];

/// Seven independent heuristic checks over a candidate crop, blended with
/// a direct template correlation into one confidence.
pub struct PatternVerifier<'a> {
    catalog: &'a TemplateCatalog,
    config: PatternConfig,
}

impl<'a> PatternVerifier<'a> {
    pub fn new(catalog: &'a TemplateCatalog) -> Self {
        Self::with_config(catalog, PatternConfig::default())
    }

    pub fn with_config(catalog: &'a TemplateCatalog, config: PatternConfig) -> Self {
        Self { catalog, config }
    }

    /// Direct normalized correlation between the crop and the selected
    /// template, both equalized and at matched dimensions.
    fn template_confidence(&self, crop_gray: &Gray, template: &Template) -> f64 {
        if crop_gray.is_empty() {
            return 0.0;
        }
        let candidate = preprocess_for_matching(crop_gray);
        let reference = preprocess_for_matching(
            &template.gray.resize(crop_gray.width, crop_gray.height),
        );
        same_size_correlation(&candidate, &reference).clamp(0.0, 1.0)
    }
}

fn header_rows(height: usize) -> usize {
    ((height as f64) * HEADER_BAND_FRACTION) as usize
}

// ── Check 1: header color presence ───────────────────────────────

fn check_header_color(config: &PatternConfig, input: &CheckInput<'_>) -> f64 {
    let rows = header_rows(input.hsv.height);
    if rows == 0 {
        return 0.0;
    }
    let header_ratio =
        input
            .hsv
            .ratio_in_rect(&config.header_range, 0, 0, input.hsv.width, rows);
    let faded_ratio =
        input
            .hsv
            .ratio_in_rect(&config.faded_header_range, 0, 0, input.hsv.width, rows);

    // Colored header dominates; the faded window is a weaker fallback.
    (header_ratio * 2.0).max(faded_ratio * 1.2).min(1.0)
}

// ── Check 2: text-region structure ───────────────────────────────

fn check_text_regions(_config: &PatternConfig, input: &CheckInput<'_>) -> f64 {
    let edges = canny(input.gray, 50.0, 150.0);
    let grouped = dilate_iter(&edges, 3, 2);

    let mut text_area = 0f64;
    for contour in find_external_contours(&grouped) {
        let bbox = contour.bounding_box();
        let aspect = bbox.aspect_ratio();
        if (1.5..=15.0).contains(&aspect) && contour.pixel_count > 100 {
            text_area += contour.pixel_count as f64;
        }
    }

    let total = (input.gray.width * input.gray.height) as f64;
    if total == 0.0 {
        return 0.0;
    }
    (text_area / total * 10.0).min(1.0)
}

// ── Check 3: photo-area presence ─────────────────────────────────

fn check_photo_area(_config: &PatternConfig, input: &CheckInput<'_>) -> f64 {
    let (w, h) = (input.gray.width, input.gray.height);
    let photo_w = w / 4;
    let photo_h = h / 2;
    let photo_y = h / 4;
    if photo_w < 10 || photo_h < 10 {
        return 0.0;
    }

    let photo = input.gray.view(0, photo_y, photo_w, photo_h);
    let variance_score = (photo.variance() / 1500.0).min(1.0);

    let edges = canny(&photo, 50.0, 150.0);
    let edge_score = (edges.fill_ratio() * 15.0).min(1.0);

    let photo_rect = crate::shared::region::Region::new(
        0,
        photo_y as i32,
        photo_w as i32,
        photo_h as i32,
    );
    let color_std = input
        .crop
        .crop(&photo_rect)
        .map_or(0.0, |p| p.channel_stddev_mean());
    let color_score = (color_std / 255.0 * 8.0).min(1.0);

    let score = (variance_score + edge_score + color_score) / 3.0;
    // A region that only weakly resembles a photo contributes nothing.
    if score >= 0.4 {
        score
    } else {
        0.0
    }
}

// ── Check 4: background-gradient smoothness ──────────────────────

fn check_background_gradient(_config: &PatternConfig, input: &CheckInput<'_>) -> f64 {
    let (w, h) = (input.gray.width, input.gray.height);
    let bg_x = (w as f64 * 0.3) as usize;
    if bg_x >= w || h == 0 {
        return 0.0;
    }
    let bg = input.gray.view(bg_x, 0, w - bg_x, h);

    let magnitude = mean_gradient_magnitude(&bg);
    let smoothness: f64 = if (15.0..=50.0).contains(&magnitude) {
        1.0
    } else if (10.0..=60.0).contains(&magnitude) {
        0.7
    } else {
        0.3
    };

    let std_dev = bg.stddev();
    let uniformity: f64 = if std_dev <= 25.0 {
        1.0
    } else if std_dev <= 35.0 {
        0.7
    } else {
        0.4
    };

    let score = smoothness.max(uniformity) * 0.7 + smoothness.min(uniformity) * 0.3;
    // Floor keeps this check from flapping on imperfect backgrounds.
    score.max(0.3)
}

// ── Check 5: edge density ────────────────────────────────────────

fn check_edge_density(_config: &PatternConfig, input: &CheckInput<'_>) -> f64 {
    let (w, h) = (input.gray.width, input.gray.height);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let density = canny(input.gray, 30.0, 100.0).fill_ratio();
    let mut score = if (0.04..=0.20).contains(&density) {
        1.0
    } else if (0.02..=0.25).contains(&density) {
        0.7
    } else if (0.01..=0.30).contains(&density) {
        0.5
    } else {
        0.3
    };

    // Bonus for text-like density on the non-photo side.
    if w > 50 {
        let text_x = (w as f64 * 0.3) as usize;
        let text = input.gray.view(text_x, 0, w - text_x, h);
        let text_density = canny(&text, 25.0, 80.0).fill_ratio();
        if text_density >= 0.05 {
            score = (score + 0.2f64).min(1.0);
        }
    }
    score
}

// ── Check 6: color-distribution authenticity ─────────────────────

fn check_color_distribution(_config: &PatternConfig, input: &CheckInput<'_>) -> f64 {
    let hsv = input.hsv;
    let (w, h) = (hsv.width, hsv.height);
    let total = (w * h) as f64;
    if total == 0.0 {
        return 0.0;
    }

    // Header hue dominance over the top band (hue channel alone).
    let header_rows = header_rows(h);
    let header_total = (w * header_rows) as f64;
    let mut header_hits = 0usize;
    for y in 0..header_rows {
        for x in 0..w {
            let hue = hsv.h[y * w + x];
            if (100..=130).contains(&hue) {
                header_hits += 1;
            }
        }
    }
    let header_score = if header_total > 0.0 {
        (header_hits as f64 / header_total * 3.0).min(1.0)
    } else {
        0.0
    };

    let sat_hits = hsv.s.iter().filter(|&&s| (60..=180).contains(&s)).count();
    let sat_score = (sat_hits as f64 / total * 1.5).min(1.0);

    let bright_hits = hsv.v.iter().filter(|&&v| (50..=220).contains(&v)).count();
    let bright_score = (bright_hits as f64 / total * 1.2).min(1.0);

    let variance_score = (input.crop.channel_stddev_mean() / 30.0).min(1.0);

    let extreme_hits = hsv
        .s
        .iter()
        .zip(&hsv.v)
        .filter(|&(&s, &v)| s > 240 || v < 20 || v > 250)
        .count();
    let natural_score = (1.0 - extreme_hits as f64 / total * 10.0).max(0.0);

    let score = header_score * 0.35
        + sat_score * 0.2
        + bright_score * 0.2
        + variance_score * 0.15
        + natural_score * 0.1;
    // Only a confidently card-like distribution counts at all.
    if score >= 0.65 {
        score
    } else {
        0.0
    }
}

// ── Check 7: watermark pattern ───────────────────────────────────

fn check_watermark(_config: &PatternConfig, input: &CheckInput<'_>) -> f64 {
    let (w, h) = (input.gray.width, input.gray.height);
    if w < 4 || h < 4 {
        return 0.0;
    }

    // High-pass sharpening followed by equalization brings the
    // low-opacity repeating pattern above the noise floor.
    let blurred = gaussian_blur(input.gray, 7);
    let mut high_pass = Gray::new(w, h);
    for i in 0..w * h {
        let v = 1.5 * input.gray.data[i] as f64 - 0.5 * blurred.data[i] as f64;
        high_pass.data[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    let enhanced = equalize_hist(&high_pass);
    let edges = canny(&enhanced, 20.0, 60.0);

    // Quadrant edge-density uniformity.
    let (hm, wm) = (h / 2, w / 2);
    let quadrants = [
        edges.view(0, 0, wm, hm),
        edges.view(wm, 0, w - wm, hm),
        edges.view(0, hm, wm, h - hm),
        edges.view(wm, hm, w - wm, h - hm),
    ];
    let densities: Vec<f64> = quadrants.iter().map(|q| q.fill_ratio()).collect();
    let mean = densities.iter().sum::<f64>() / densities.len() as f64;
    let std = (densities.iter().map(|d| (d - mean).powi(2)).sum::<f64>()
        / densities.len() as f64)
        .sqrt();
    let distribution_score = (mean * 15.0).min(1.0) * (1.0 - (std * 10.0).min(1.0));

    // Sampled-region variance as a texture proxy.
    let mut texture_score = 0.0;
    if h > 10 && w > 10 {
        let samples = [
            enhanced.view(w / 4, h / 4, w / 2, h / 2),
            enhanced.view(w / 3, h / 6, w / 3, h / 3 - h / 6),
            enhanced.view(w / 3, 2 * h / 3, w / 3, 5 * h / 6 - 2 * h / 3),
        ];
        let scores: Vec<f64> = samples
            .iter()
            .filter(|s| s.data.len() > 100)
            .map(|s| (s.variance() / 800.0).min(1.0))
            .collect();
        if !scores.is_empty() {
            texture_score = scores.iter().sum::<f64>() / scores.len() as f64;
        }
    }

    // Mid-band spectral energy ratio.
    let spectrum = fft2_log_magnitude(&enhanced.to_f64(), w, h);
    let min_dim = w.min(h) as f64;
    let mid_band = ring_mean(&spectrum, w, h, min_dim / 8.0, min_dim / 3.0);
    let total_mean = spectrum.iter().sum::<f64>() / spectrum.len() as f64;
    let frequency_score = if total_mean > 0.0 {
        (mid_band / total_mean * 2.0).min(1.0)
    } else {
        0.0
    };

    let score = distribution_score * 0.4 + texture_score * 0.4 + frequency_score * 0.2;
    if score >= 0.15 {
        score
    } else {
        0.0
    }
}

impl Verifier for PatternVerifier<'_> {
    fn verify(&self, frame: &Frame, candidate: &Candidate) -> VerifierOutcome {
        let region = &candidate.region;
        let Some(crop) = frame.crop(region) else {
            debug!("pattern verify: candidate region out of bounds, rejecting");
            return VerifierOutcome::rejected();
        };
        let Ok(template) = selector::select(self.catalog, frame) else {
            debug!("pattern verify: no template available, rejecting");
            return VerifierOutcome::rejected();
        };

        let gray = grayscale(&crop);
        let hsv = bgr_to_hsv(&crop);
        let input = CheckInput {
            crop: &crop,
            gray: &gray,
            hsv: &hsv,
        };

        let mut credits = 0f64;
        let mut components = Vec::with_capacity(CHECKS.len());
        for check in &CHECKS {
            let score = (check.run)(&self.config, &input);
            if score >= check.full_threshold {
                credits += 1.0;
            } else if score >= check.partial_threshold {
                credits += 0.5;
            }
            debug!("pattern check {}: {score:.3}", check.name);
            components.push(ScoreComponent {
                name: check.name,
                score,
            });
        }
        let pattern_confidence = credits / CHECKS.len() as f64;

        let template_confidence = self.template_confidence(&gray, template);
        let final_confidence = pattern_confidence * self.config.pattern_weight
            + template_confidence * self.config.template_weight;

        let cfg = &self.config;
        let critical_1 = pattern_confidence >= cfg.critical_pattern_score
            || template_confidence >= cfg.critical_template_score
            || candidate.color_ratio <= cfg.fallback_color_ratio;
        let critical_2 = final_confidence >= cfg.critical_combined_score
            || pattern_confidence >= cfg.critical_strong_pattern;
        let critical_passed = critical_1 as u8 + critical_2 as u8;

        let accepted = (pattern_confidence >= cfg.min_pattern_score
            && final_confidence >= cfg.min_combined_score)
            || (template_confidence >= cfg.strong_template_score && critical_passed >= 1)
            || (final_confidence >= cfg.good_combined_score && critical_passed >= 2)
            || (candidate.color_ratio <= cfg.fallback_color_ratio
                && pattern_confidence >= cfg.fallback_pattern_score);

        debug!(
            "pattern {pattern_confidence:.2} template {template_confidence:.3} \
             combined {final_confidence:.3} critical {critical_passed}/2 -> {}",
            if accepted { "accept" } else { "reject" }
        );

        if !accepted {
            return VerifierOutcome::rejected();
        }
        VerifierOutcome::accepted(
            final_confidence,
            Evidence {
                pattern_confidence: Some(pattern_confidence),
                template_confidence: Some(template_confidence),
                components,
                ..Evidence::default()
            },
        )
    }
}
