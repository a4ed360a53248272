use std::collections::HashMap;

use serde::Serialize;

/// Authenticity techniques tracked for latency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Technique {
    TextureLbp,
    TextureGlcm,
    SensorNoise,
    Frequency,
}

impl Technique {
    pub const ALL: [Technique; 4] = [
        Technique::TextureLbp,
        Technique::TextureGlcm,
        Technique::SensorNoise,
        Technique::Frequency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Technique::TextureLbp => "texture_lbp",
            Technique::TextureGlcm => "texture_glcm",
            Technique::SensorNoise => "sensor_noise",
            Technique::Frequency => "frequency",
        }
    }
}

/// Running per-technique timings plus mode-usage counters.
///
/// One instance per worker: the monitor is plain mutable state with no
/// internal locking, confined to whoever owns the coordinator.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    timings: HashMap<Technique, Vec<f64>>,
    total_detections: u64,
    fast_mode_used: u64,
}

/// Point-in-time view of the monitor, for operators and logs.
#[derive(Clone, Debug, Serialize)]
pub struct PerformanceStats {
    pub total_detections: u64,
    pub fast_mode_used: u64,
    pub average_ms: Vec<(&'static str, f64)>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, technique: Technique, duration_ms: f64) {
        self.timings.entry(technique).or_default().push(duration_ms);
    }

    pub fn record_detection(&mut self) {
        self.total_detections += 1;
    }

    pub fn record_fast_mode(&mut self) {
        self.fast_mode_used += 1;
    }

    pub fn average_ms(&self, technique: Technique) -> f64 {
        match self.timings.get(&technique) {
            Some(samples) if !samples.is_empty() => {
                samples.iter().sum::<f64>() / samples.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Sum of all per-technique averages: the expected combined cost of a
    /// thorough validation.
    pub fn combined_average_ms(&self) -> f64 {
        Technique::ALL.iter().map(|&t| self.average_ms(t)).sum()
    }

    /// True when the running averages exceed the latency budget and the
    /// adaptive mode should degrade to fast.
    pub fn should_use_fast_mode(&self, budget_ms: f64) -> bool {
        self.combined_average_ms() > budget_ms
    }

    pub fn total_detections(&self) -> u64 {
        self.total_detections
    }

    pub fn fast_mode_used(&self) -> u64 {
        self.fast_mode_used
    }

    pub fn stats(&self) -> PerformanceStats {
        PerformanceStats {
            total_detections: self.total_detections,
            fast_mode_used: self.fast_mode_used,
            average_ms: Technique::ALL
                .iter()
                .map(|&t| (t.as_str(), self.average_ms(t)))
                .collect(),
        }
    }

    /// Operator action: drop all accumulated state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
