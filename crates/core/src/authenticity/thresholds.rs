use serde::Serialize;

/// Base thresholds and floors for the four authenticity techniques.
///
/// All values are provisional defaults pending tuning against a labeled
/// genuine-versus-forged capture set; they are configuration, not
/// constants, and the four bases can be overridden at runtime.
#[derive(Clone, Debug, Serialize)]
pub struct AuthenticityThresholds {
    pub base_texture: f64,
    pub base_cooccurrence: f64,
    pub base_noise: f64,
    pub base_frequency: f64,

    pub floor_texture: f64,
    pub floor_cooccurrence: f64,
    pub floor_noise: f64,
    pub floor_frequency: f64,

    /// Region floor below which sensor-noise analysis is skipped.
    pub noise_min_size: (i32, i32),
    /// Region floor below which frequency analysis is skipped; also the
    /// adaptive mode's "too small for thorough" test.
    pub frequency_min_size: (i32, i32),

    /// Soft per-call budgets, observed and logged only.
    pub fast_timeout_ms: f64,
    pub thorough_timeout_ms: f64,
    /// Running average combined technique latency above which adaptive
    /// mode falls back to fast.
    pub fast_mode_latency_ms: f64,
}

impl Default for AuthenticityThresholds {
    fn default() -> Self {
        Self {
            base_texture: 0.5,
            base_cooccurrence: 0.4,
            base_noise: 0.3,
            base_frequency: 0.4,
            floor_texture: 0.3,
            floor_cooccurrence: 0.25,
            floor_noise: 0.2,
            floor_frequency: 0.3,
            noise_min_size: (80, 50),
            frequency_min_size: (64, 40),
            fast_timeout_ms: 50.0,
            thorough_timeout_ms: 200.0,
            fast_mode_latency_ms: 100.0,
        }
    }
}

/// Per-call thresholds after size and confidence adaptation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdaptiveThresholds {
    pub texture: f64,
    pub cooccurrence: f64,
    pub noise: f64,
    pub frequency: f64,
}

impl AuthenticityThresholds {
    /// Override any subset of the four base thresholds.
    pub fn set_bases(
        &mut self,
        texture: Option<f64>,
        cooccurrence: Option<f64>,
        noise: Option<f64>,
        frequency: Option<f64>,
    ) {
        if let Some(v) = texture {
            self.base_texture = v;
        }
        if let Some(v) = cooccurrence {
            self.base_cooccurrence = v;
        }
        if let Some(v) = noise {
            self.base_noise = v;
        }
        if let Some(v) = frequency {
            self.base_frequency = v;
        }
        log::debug!(
            "authenticity bases now texture={} cooccurrence={} noise={} frequency={}",
            self.base_texture,
            self.base_cooccurrence,
            self.base_noise,
            self.base_frequency
        );
    }

    /// Scale the bases by region size and template confidence, clamped to
    /// the per-technique floors.
    ///
    /// Larger regions support stricter thresholds (`area / 5000` capped at
    /// one); higher template confidence relaxes or tightens by +-20%.
    pub fn adaptive(&self, area: f64, template_confidence: f64) -> AdaptiveThresholds {
        let size_factor = (area / 5000.0).min(1.0);
        let confidence_factor = 0.8 + template_confidence * 0.4;
        let apply = |base: f64, floor: f64| (base * size_factor * confidence_factor).max(floor);
        AdaptiveThresholds {
            texture: apply(self.base_texture, self.floor_texture),
            cooccurrence: apply(self.base_cooccurrence, self.floor_cooccurrence),
            noise: apply(self.base_noise, self.floor_noise),
            frequency: apply(self.base_frequency, self.floor_frequency),
        }
    }
}
