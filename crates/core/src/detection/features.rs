use log::debug;

use crate::detection::homography::{fit_ransac, RansacConfig};
use crate::detection::keypoints::{
    compute_binary_descriptors, compute_patch_descriptors, detect_corners, BinaryDescriptor,
    Keypoint, PatchDescriptor,
};
use crate::detection::result::{Evidence, ScoreComponent, Verifier, VerifierOutcome};
use crate::imaging::gray::{grayscale, histogram, histogram_entropy, Gray};
use crate::shared::frame::Frame;
use crate::shared::region::Candidate;
use crate::templates::template::Template;

/// Tuning for keypoint-based verification.
#[derive(Clone, Debug)]
pub struct FeatureConfig {
    pub corner_threshold: u8,
    pub max_binary_features: usize,
    pub max_patch_features: usize,
    /// Hamming cutoff for a good binary match.
    pub binary_match_distance: u32,
    /// Best-to-second-best distance ratio for the rich family.
    pub ratio_test: f32,
    /// Rich matching runs only with at least this many region descriptors.
    pub min_patch_descriptors: usize,
    /// Good rich matches required before geometric verification.
    pub homography_min_matches: usize,
    pub ransac: RansacConfig,
    /// The scale-invariant family can be switched off wholesale.
    pub enable_rich_descriptors: bool,

    // Reduced variant, used only by the real-time path.
    pub fast_match_distance: u32,
    pub fast_top_matches: usize,
    pub fast_acceptance: f64,
    pub fast_min_size: (i32, i32),
    pub fast_size_range: ((i32, i32), (i32, i32)),
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            corner_threshold: 20,
            max_binary_features: 500,
            max_patch_features: 200,
            binary_match_distance: 50,
            ratio_test: 0.7,
            min_patch_descriptors: 4,
            homography_min_matches: 8,
            ransac: RansacConfig::default(),
            enable_rich_descriptors: true,
            fast_match_distance: 70,
            fast_top_matches: 5,
            fast_acceptance: 0.2,
            fast_min_size: (50, 30),
            fast_size_range: ((60, 500), (40, 300)),
        }
    }
}

/// Reference descriptors, extracted once from the primary template.
#[derive(Clone, Debug)]
pub struct ReferenceFeatures {
    binary: Vec<(Keypoint, BinaryDescriptor)>,
    patches: Vec<PatchDescriptor>,
}

impl ReferenceFeatures {
    pub fn extract(template: &Template, config: &FeatureConfig) -> Self {
        let corners = detect_corners(
            &template.gray,
            config.corner_threshold,
            config.max_binary_features,
        );
        let binary = compute_binary_descriptors(&template.gray, &corners);
        let patches = if config.enable_rich_descriptors {
            compute_patch_descriptors(
                &template.gray,
                config.corner_threshold,
                config.max_patch_features,
            )
        } else {
            Vec::new()
        };
        debug!(
            "reference features: {} binary, {} patch descriptors",
            binary.len(),
            patches.len()
        );
        Self { binary, patches }
    }

    pub fn binary_count(&self) -> usize {
        self.binary.len()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }
}

/// Keypoint-descriptor verification of a candidate region against the
/// cached reference features.
pub struct FeatureMatcher {
    reference: ReferenceFeatures,
    config: FeatureConfig,
}

impl FeatureMatcher {
    pub fn new(template: &Template, config: FeatureConfig) -> Self {
        let reference = ReferenceFeatures::extract(template, &config);
        Self { reference, config }
    }

    pub fn reference(&self) -> &ReferenceFeatures {
        &self.reference
    }

    /// Combined feature score of a cropped region in [0, 1].
    pub fn match_region(&self, crop: &Frame) -> f64 {
        let gray = grayscale(crop);
        let binary_score = self.binary_score(&gray);

        if !self.config.enable_rich_descriptors || self.reference.patches.is_empty() {
            return binary_score.clamp(0.0, 1.0);
        }
        let rich_score = self.rich_score(&gray);
        (binary_score * 0.4 + rich_score * 0.6).clamp(0.0, 1.0)
    }

    fn binary_score(&self, gray: &Gray) -> f64 {
        if self.reference.binary.is_empty() {
            return 0.0;
        }
        let corners = detect_corners(gray, self.config.corner_threshold, self.config.max_binary_features);
        let candidates = compute_binary_descriptors(gray, &corners);
        if candidates.len() < 10 {
            debug!("insufficient binary features in candidate: {}", candidates.len());
            return 0.0;
        }

        let good = cross_check_matches(
            &self.reference.binary,
            &candidates,
            self.config.binary_match_distance,
        );
        good as f64 / self.reference.binary.len().max(candidates.len()) as f64
    }

    fn rich_score(&self, gray: &Gray) -> f64 {
        let candidates = compute_patch_descriptors(
            gray,
            self.config.corner_threshold,
            self.config.max_patch_features,
        );
        if candidates.len() < self.config.min_patch_descriptors {
            return 0.0;
        }

        let matches = ratio_test_matches(&self.reference.patches, &candidates, self.config.ratio_test);
        let mut score =
            matches.len() as f64 / self.reference.patches.len().max(candidates.len()) as f64;

        if matches.len() >= self.config.homography_min_matches {
            let src: Vec<[f64; 2]> = matches
                .iter()
                .map(|&(r, _)| [self.reference.patches[r].x, self.reference.patches[r].y])
                .collect();
            let dst: Vec<[f64; 2]> = matches
                .iter()
                .map(|&(_, c)| [candidates[c].x, candidates[c].y])
                .collect();
            match fit_ransac(&src, &dst, &self.config.ransac) {
                Ok(result) => {
                    let inlier_fraction = result.n_inliers as f64 / matches.len() as f64;
                    debug!(
                        "homography inliers {}/{} scale geometric score",
                        result.n_inliers,
                        matches.len()
                    );
                    score *= inlier_fraction;
                }
                Err(e) => debug!("homography fit failed: {e}"),
            }
        }
        score
    }

    /// Reduced verification for the latency-sensitive path: a handful of
    /// loose binary matches, an entropy texture proxy with a flat-histogram
    /// penalty, header-color and size sub-scores, flat-combined against a
    /// low acceptance bar. Never used by the authoritative capture path.
    pub fn verify_fast(&self, frame: &Frame, candidate: &Candidate) -> VerifierOutcome {
        let region = &candidate.region;
        if region.width < self.config.fast_min_size.0 || region.height < self.config.fast_min_size.1
        {
            return VerifierOutcome::rejected();
        }
        let Some(crop) = frame.crop(region) else {
            return VerifierOutcome::rejected();
        };
        let gray = grayscale(&crop);

        let feature_score = self.fast_feature_score(&gray);
        let texture_score = fast_texture_score(&gray);
        let header_score = if candidate.color_ratio >= 0.4 {
            1.0
        } else if candidate.color_ratio >= 0.25 {
            0.5
        } else {
            0.0
        };
        let ((w_lo, w_hi), (h_lo, h_hi)) = self.config.fast_size_range;
        let size_score = if (w_lo..=w_hi).contains(&region.width)
            && (h_lo..=h_hi).contains(&region.height)
        {
            1.0
        } else {
            0.5
        };

        let final_score =
            feature_score * 0.3 + texture_score * 0.3 + header_score * 0.3 + size_score * 0.1;
        debug!(
            "fast verify: feature {feature_score:.3} texture {texture_score:.2} \
             header {header_score:.2} size {size_score:.2} -> {final_score:.3}"
        );
        if final_score < self.config.fast_acceptance {
            return VerifierOutcome::rejected();
        }
        VerifierOutcome::accepted(
            final_score,
            Evidence {
                feature_confidence: Some(feature_score),
                components: vec![
                    ScoreComponent {
                        name: "feature",
                        score: feature_score,
                    },
                    ScoreComponent {
                        name: "texture",
                        score: texture_score,
                    },
                    ScoreComponent {
                        name: "header",
                        score: header_score,
                    },
                    ScoreComponent {
                        name: "size",
                        score: size_score,
                    },
                ],
                ..Evidence::default()
            },
        )
    }

    fn fast_feature_score(&self, gray: &Gray) -> f64 {
        if self.reference.binary.is_empty() {
            return 0.0;
        }
        let corners = detect_corners(gray, self.config.corner_threshold, self.config.max_binary_features);
        let candidates = compute_binary_descriptors(gray, &corners);
        if candidates.len() < 3 {
            return 0.0;
        }

        // Nearest distance per reference descriptor, best few only.
        let mut distances: Vec<u32> = self
            .reference
            .binary
            .iter()
            .filter_map(|(_, rd)| candidates.iter().map(|(_, cd)| rd.hamming(cd)).min())
            .collect();
        distances.sort_unstable();
        distances.truncate(self.config.fast_top_matches);
        let good = distances
            .iter()
            .filter(|&&d| d < self.config.fast_match_distance)
            .count();
        (good as f64 / self.config.fast_top_matches as f64).min(1.0)
    }
}

impl Verifier for FeatureMatcher {
    fn verify(&self, frame: &Frame, candidate: &Candidate) -> VerifierOutcome {
        let Some(crop) = frame.crop(&candidate.region) else {
            return VerifierOutcome::rejected();
        };
        let score = self.match_region(&crop);
        if score <= 0.0 {
            return VerifierOutcome::rejected();
        }
        VerifierOutcome::accepted(
            score,
            Evidence {
                feature_confidence: Some(score),
                ..Evidence::default()
            },
        )
    }
}

/// Mutual-nearest binary matching under a distance cutoff.
fn cross_check_matches(
    reference: &[(Keypoint, BinaryDescriptor)],
    candidates: &[(Keypoint, BinaryDescriptor)],
    max_distance: u32,
) -> usize {
    let nearest = |d: &BinaryDescriptor, pool: &[(Keypoint, BinaryDescriptor)]| -> Option<(usize, u32)> {
        pool.iter()
            .enumerate()
            .map(|(i, (_, pd))| (i, d.hamming(pd)))
            .min_by_key(|&(_, dist)| dist)
    };

    let mut good = 0usize;
    for (ri, (_, rd)) in reference.iter().enumerate() {
        let Some((ci, dist)) = nearest(rd, candidates) else {
            continue;
        };
        if dist >= max_distance {
            continue;
        }
        if let Some((back, _)) = nearest(&candidates[ci].1, reference) {
            if back == ri {
                good += 1;
            }
        }
    }
    good
}

/// Two-nearest-neighbor matching with the classic ratio test. Returns
/// `(reference_index, candidate_index)` pairs.
fn ratio_test_matches(
    reference: &[PatchDescriptor],
    candidates: &[PatchDescriptor],
    ratio: f32,
) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    if candidates.len() < 2 {
        return out;
    }
    for (ri, rd) in reference.iter().enumerate() {
        let mut best = (usize::MAX, f32::MAX);
        let mut second = f32::MAX;
        for (ci, cd) in candidates.iter().enumerate() {
            let d = rd.distance(cd);
            if d < best.1 {
                second = best.1;
                best = (ci, d);
            } else if d < second {
                second = d;
            }
        }
        if best.1 < ratio * second {
            out.push((ri, best.0));
        }
    }
    out
}

/// Entropy-based texture proxy with a penalty for renders that quantize
/// to only a few gray levels.
fn fast_texture_score(gray: &Gray) -> f64 {
    let entropy = histogram_entropy(gray, 16);
    let base = (entropy / 4.0).min(1.0);

    let hist = histogram(gray);
    let max = hist.iter().copied().max().unwrap_or(0) as f64;
    let peaks = hist.iter().filter(|&&c| c as f64 > max * 0.1).count();
    let digital_penalty = if peaks < 10 { 0.3 } else { 0.0 };

    (base - digital_penalty).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::Region;
    use crate::templates::template::{default_header_range, TemplateKind};
    use crate::testutil::{frame_with_card, textured_card};

    fn reference_template() -> Template {
        Template::from_frame(
            TemplateKind::Primary,
            textured_card(160, 100),
            &default_header_range(),
        )
    }

    fn matcher() -> FeatureMatcher {
        FeatureMatcher::new(&reference_template(), FeatureConfig::default())
    }

    #[test]
    fn test_reference_extraction_finds_features() {
        let m = matcher();
        assert!(m.reference().binary_count() > 10);
        assert!(m.reference().patch_count() > 4);
    }

    #[test]
    fn test_identical_region_scores_high() {
        let m = matcher();
        let score = m.match_region(&textured_card(160, 100));
        assert!(score > 0.3, "score {score}");
    }

    #[test]
    fn test_flat_region_scores_zero() {
        let m = matcher();
        let score = m.match_region(&Frame::filled(160, 100, [128, 128, 128]));
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_match_region_is_deterministic() {
        let m = matcher();
        let crop = textured_card(160, 100);
        let a = m.match_region(&crop);
        let b = m.match_region(&crop);
        assert_eq!(a, b);
    }

    #[test]
    fn test_binary_only_mode() {
        let config = FeatureConfig {
            enable_rich_descriptors: false,
            ..FeatureConfig::default()
        };
        let m = FeatureMatcher::new(&reference_template(), config);
        assert_eq!(m.reference().patch_count(), 0);
        let score = m.match_region(&textured_card(160, 100));
        assert!(score > 0.0);
    }

    #[test]
    fn test_verifier_rejects_out_of_bounds_candidate() {
        let m = matcher();
        let frame = frame_with_card(320, 240, Region::new(40, 40, 160, 100));
        let candidate = Candidate::new(Region::new(300, 200, 100, 100), 10000.0, 0.5);
        let outcome = m.verify(&frame, &candidate);
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.evidence.is_none());
    }

    #[test]
    fn test_fast_verify_accepts_card_region() {
        let m = matcher();
        let region = Region::new(40, 40, 160, 100);
        let frame = frame_with_card(320, 240, region);
        let candidate = Candidate::new(region, region.area(), 0.5);
        let outcome = m.verify_fast(&frame, &candidate);
        assert!(outcome.confidence >= 0.2, "confidence {}", outcome.confidence);
        let evidence = outcome.evidence.unwrap();
        assert_eq!(evidence.components.len(), 4);
    }

    #[test]
    fn test_fast_verify_rejects_tiny_region() {
        let m = matcher();
        let frame = frame_with_card(320, 240, Region::new(40, 40, 160, 100));
        let candidate = Candidate::new(Region::new(10, 10, 30, 20), 600.0, 0.5);
        assert_eq!(m.verify_fast(&frame, &candidate).confidence, 0.0);
    }

    #[test]
    fn test_fast_texture_penalizes_flat_histogram() {
        // Two-level image: strong quantization, low entropy.
        let mut g = Gray::new(64, 64);
        for (i, v) in g.data.iter_mut().enumerate() {
            *v = if i % 2 == 0 { 0 } else { 255 };
        }
        let flat = fast_texture_score(&g);

        let noisy = grayscale(&textured_card(64, 64));
        let textured = fast_texture_score(&noisy);
        assert!(textured > flat);
    }
}
