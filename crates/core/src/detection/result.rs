use serde::Serialize;

use crate::authenticity::ResolvedMode;
use crate::shared::frame::Frame;
use crate::shared::region::{Candidate, Region};
use crate::templates::template::TemplateKind;

/// Correlation metric that produced a template-match score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MatchMetric {
    /// Zero-mean normalized cross-correlation.
    CorrCoeffNormed,
    /// Plain normalized cross-correlation.
    CrossCorrNormed,
    /// Normalized squared difference, inverted to match-is-high polarity.
    SqDiffNormed,
}

/// One validated (or pending-validation) document detection.
#[derive(Clone, Debug, Serialize)]
pub struct DetectionResult {
    pub region: Region,
    /// Template-match score from the winning metric.
    pub confidence: f64,
    pub scale: f64,
    pub metric: MatchMetric,
    pub template_kind: TemplateKind,
    pub pattern_score: Option<f64>,
    pub feature_score: Option<f64>,
    pub validation_score: Option<f64>,
    /// Blend of template confidence and validation score; equals
    /// `confidence` until validation runs.
    pub combined_confidence: f64,
    pub analysis_mode: Option<ResolvedMode>,
}

impl DetectionResult {
    pub fn new(
        region: Region,
        confidence: f64,
        scale: f64,
        metric: MatchMetric,
        template_kind: TemplateKind,
    ) -> Self {
        Self {
            region,
            confidence,
            scale,
            metric,
            template_kind,
            pattern_score: None,
            feature_score: None,
            validation_score: None,
            combined_confidence: confidence,
            analysis_mode: None,
        }
    }
}

/// A named sub-score contributing to a verifier decision.
#[derive(Clone, Debug, Serialize)]
pub struct ScoreComponent {
    pub name: &'static str,
    pub score: f64,
}

/// Why a verifier accepted a candidate.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Evidence {
    pub pattern_confidence: Option<f64>,
    pub template_confidence: Option<f64>,
    pub feature_confidence: Option<f64>,
    pub components: Vec<ScoreComponent>,
}

/// Verifier verdict: a confidence in [0, 1], with evidence only on accept.
#[derive(Clone, Debug, Serialize)]
pub struct VerifierOutcome {
    pub confidence: f64,
    pub evidence: Option<Evidence>,
}

impl VerifierOutcome {
    pub fn rejected() -> Self {
        Self {
            confidence: 0.0,
            evidence: None,
        }
    }

    pub fn accepted(confidence: f64, evidence: Evidence) -> Self {
        Self {
            confidence,
            evidence: Some(evidence),
        }
    }
}

/// Common capability of the candidate-verification strategies.
///
/// Implementations score a proposed region against the document model;
/// internal failures degrade to a rejection, never an error.
pub trait Verifier {
    fn verify(&self, frame: &Frame, candidate: &Candidate) -> VerifierOutcome;
}
