pub mod analyzer;
pub mod frequency;
pub mod glcm;
pub mod lbp;
pub mod noise;
pub mod thresholds;

use serde::Serialize;

/// Requested analysis depth for one authenticity call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AnalysisMode {
    /// Basic checks plus the two cheap texture techniques.
    Fast,
    /// Everything, including sensor-noise and frequency analysis.
    Thorough,
    /// Pick fast or thorough from running latency and region size.
    Adaptive,
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(AnalysisMode::Fast),
            "thorough" => Ok(AnalysisMode::Thorough),
            "adaptive" => Ok(AnalysisMode::Adaptive),
            other => Err(format!("unknown analysis mode '{other}'")),
        }
    }
}

/// The depth a call actually ran at, after adaptive resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResolvedMode {
    Fast,
    Thorough,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("fast".parse::<AnalysisMode>().unwrap(), AnalysisMode::Fast);
        assert_eq!(
            "thorough".parse::<AnalysisMode>().unwrap(),
            AnalysisMode::Thorough
        );
        assert_eq!(
            "adaptive".parse::<AnalysisMode>().unwrap(),
            AnalysisMode::Adaptive
        );
        assert!("slow".parse::<AnalysisMode>().is_err());
    }
}
