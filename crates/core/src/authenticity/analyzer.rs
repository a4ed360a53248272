use std::time::Instant;

use log::{debug, warn};
use serde::Serialize;

use crate::authenticity::frequency::frequency_authenticity;
use crate::authenticity::glcm::glcm_authenticity;
use crate::authenticity::lbp::lbp_authenticity;
use crate::authenticity::noise::noise_authenticity;
use crate::authenticity::thresholds::AuthenticityThresholds;
use crate::authenticity::{AnalysisMode, ResolvedMode};
use crate::detection::result::DetectionResult;
use crate::imaging::edges::canny;
use crate::imaging::gray::grayscale;
use crate::pipeline::performance::{PerformanceMonitor, Technique};
use crate::shared::frame::Frame;

/// Outcome of one authenticity check: its [0, 1] score, whether it
/// passed, and the credit it contributes (half credit marks a skipped
/// technique).
#[derive(Clone, Debug, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub score: f64,
    pub passed: bool,
    pub credit: f64,
}

/// Full authenticity verdict for one detection.
#[derive(Clone, Debug, Serialize)]
pub struct AuthenticityReport {
    pub mode: ResolvedMode,
    pub checks: Vec<CheckOutcome>,
    /// Earned credit over total checks, in [0, 1].
    pub validation_score: f64,
    pub is_valid: bool,
    pub elapsed_ms: f64,
}

impl AuthenticityReport {
    fn invalid(mode: ResolvedMode) -> Self {
        Self {
            mode,
            checks: Vec::new(),
            validation_score: 0.0,
            is_valid: false,
            elapsed_ms: 0.0,
        }
    }
}

/// Texture/frequency document-authenticity analysis with selectable
/// depth.
#[derive(Debug, Default)]
pub struct AuthenticityAnalyzer {
    thresholds: AuthenticityThresholds,
}

impl AuthenticityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: AuthenticityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AuthenticityThresholds {
        &self.thresholds
    }

    /// Runtime override surface for the four technique base thresholds.
    pub fn thresholds_mut(&mut self) -> &mut AuthenticityThresholds {
        &mut self.thresholds
    }

    /// Decide the depth an adaptive call actually runs at.
    fn resolve_mode(
        &self,
        mode: AnalysisMode,
        detection: &DetectionResult,
        monitor: &mut PerformanceMonitor,
    ) -> ResolvedMode {
        match mode {
            AnalysisMode::Fast => ResolvedMode::Fast,
            AnalysisMode::Thorough => ResolvedMode::Thorough,
            AnalysisMode::Adaptive => {
                let (min_w, min_h) = self.thresholds.frequency_min_size;
                if monitor.should_use_fast_mode(self.thresholds.fast_mode_latency_ms) {
                    monitor.record_fast_mode();
                    ResolvedMode::Fast
                } else if detection.region.width < min_w || detection.region.height < min_h {
                    ResolvedMode::Fast
                } else {
                    ResolvedMode::Thorough
                }
            }
        }
    }

    /// Validate one detection. Fast mode runs the five basic checks plus
    /// the two cheap texture techniques; thorough mode adds sensor-noise
    /// and frequency analysis, each skipped with half credit below its
    /// size floor.
    pub fn validate(
        &self,
        frame: &Frame,
        detection: &DetectionResult,
        mode: AnalysisMode,
        monitor: &mut PerformanceMonitor,
    ) -> AuthenticityReport {
        let start = Instant::now();
        let resolved = self.resolve_mode(mode, detection, monitor);

        let region = detection.region;
        let Some(crop) = frame.crop(&region) else {
            debug!("authenticity: region out of bounds, invalid");
            return AuthenticityReport::invalid(resolved);
        };
        monitor.record_detection();

        let gray = grayscale(&crop);
        let adaptive = self.thresholds.adaptive(region.area(), detection.confidence);
        let mut checks = Vec::with_capacity(9);

        // Geometry and appearance basics, run in every mode.
        let aspect = region.aspect_ratio();
        checks.push(bool_check("aspect_ratio", (1.4..=2.0).contains(&aspect)));

        let frame_area = (frame.width() as f64) * (frame.height() as f64);
        let area_ratio = region.area() / frame_area;
        checks.push(bool_check(
            "relative_size",
            (0.05..=0.8).contains(&area_ratio),
        ));

        let edge_density = canny(&gray, 50.0, 150.0).fill_ratio();
        checks.push(scored_check(
            "edge_density",
            edge_density,
            (0.05..=0.25).contains(&edge_density),
        ));

        let color_std = crop.channel_stddev_mean();
        checks.push(scored_check(
            "color_variance",
            (color_std / 255.0).min(1.0),
            color_std >= 15.0,
        ));

        checks.push(scored_check(
            "template_confidence",
            detection.confidence.clamp(0.0, 1.0),
            detection.confidence >= 0.65,
        ));

        // Cheap texture techniques, part of both depths.
        let lbp = timed(monitor, Technique::TextureLbp, || lbp_authenticity(&gray));
        checks.push(scored_check("texture_lbp", lbp, lbp >= adaptive.texture));

        let glcm = timed(monitor, Technique::TextureGlcm, || glcm_authenticity(&gray));
        checks.push(scored_check(
            "texture_glcm",
            glcm,
            glcm >= adaptive.cooccurrence,
        ));

        if resolved == ResolvedMode::Thorough {
            let (noise_w, noise_h) = self.thresholds.noise_min_size;
            if region.width >= noise_w && region.height >= noise_h {
                let noise = timed(monitor, Technique::SensorNoise, || noise_authenticity(&gray));
                checks.push(scored_check("sensor_noise", noise, noise >= adaptive.noise));
            } else {
                debug!(
                    "sensor-noise analysis skipped: region {}x{} below floor",
                    region.width, region.height
                );
                checks.push(skipped_check("sensor_noise"));
            }

            let (freq_w, freq_h) = self.thresholds.frequency_min_size;
            if region.width >= freq_w && region.height >= freq_h {
                let frequency =
                    timed(monitor, Technique::Frequency, || frequency_authenticity(&gray));
                checks.push(scored_check(
                    "frequency",
                    frequency,
                    frequency >= adaptive.frequency,
                ));
            } else {
                debug!(
                    "frequency analysis skipped: region {}x{} below floor",
                    region.width, region.height
                );
                checks.push(skipped_check("frequency"));
            }
        }

        let earned: f64 = checks.iter().map(|c| c.credit).sum();
        let total = checks.len() as f64;
        let min_checks = match resolved {
            ResolvedMode::Fast => 4.0,
            ResolvedMode::Thorough => 6.0,
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let budget = match resolved {
            ResolvedMode::Fast => self.thresholds.fast_timeout_ms,
            ResolvedMode::Thorough => self.thresholds.thorough_timeout_ms,
        };
        if elapsed_ms > budget {
            warn!("authenticity analysis soft timeout: {elapsed_ms:.1}ms > {budget:.0}ms");
        }
        debug!(
            "authenticity {resolved:?}: {earned:.1}/{total} checks in {elapsed_ms:.1}ms"
        );

        AuthenticityReport {
            mode: resolved,
            validation_score: earned / total,
            is_valid: earned >= min_checks,
            checks,
            elapsed_ms,
        }
    }
}

fn bool_check(name: &'static str, passed: bool) -> CheckOutcome {
    CheckOutcome {
        name,
        score: if passed { 1.0 } else { 0.0 },
        passed,
        credit: if passed { 1.0 } else { 0.0 },
    }
}

fn scored_check(name: &'static str, score: f64, passed: bool) -> CheckOutcome {
    CheckOutcome {
        name,
        score,
        passed,
        credit: if passed { 1.0 } else { 0.0 },
    }
}

fn skipped_check(name: &'static str) -> CheckOutcome {
    CheckOutcome {
        name,
        score: 0.5,
        passed: false,
        credit: 0.5,
    }
}

fn timed(
    monitor: &mut PerformanceMonitor,
    technique: Technique,
    run: impl FnOnce() -> f64,
) -> f64 {
    let start = Instant::now();
    let score = run();
    monitor.record(technique, start.elapsed().as_secs_f64() * 1000.0);
    score
}
