use serde::{Deserialize, Serialize};

use super::numeric::Numeric;

/// Raw output of the primary tempo estimator
#[derive(Debug, Clone)]
pub struct RhythmOutput {
    pub bpm: f64,
    /// Confidence in whatever shape the backend produced
    pub confidence: Numeric,
    /// Beat positions in seconds (not used in the response)
    pub beats: Vec<f64>,
}

/// Tempo after the primary/fallback strategy has run.
///
/// `confidence` is `None` when the fallback estimator produced the tempo or
/// when the primary confidence was not numeric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    pub bpm: f64,
    pub confidence: Option<f64>,
}

/// Key estimator output
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEstimate {
    /// Pitch class name, e.g. "C", "F#", "Bb"
    pub key: String,
    /// "major" or "minor"
    pub scale: String,
    /// Correlation strength of the winning key profile
    pub strength: f64,
}

/// JSON body returned for a successful analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Basename of the analyzed file, never the full path
    pub file: String,
    pub bpm: f64,
    pub bpm_confidence: Option<f64>,
    pub key: String,
    pub scale: String,
    pub camelot: String,
    pub key_confidence: f64,
}

impl AnalysisResult {
    pub fn new(file: String, tempo: TempoEstimate, key: KeyEstimate, camelot: &str) -> Self {
        Self {
            file,
            bpm: round_to(tempo.bpm, 1),
            bpm_confidence: tempo.confidence.map(|c| round_to(c, 2)),
            key: key.key,
            scale: key.scale,
            camelot: camelot.to_string(),
            key_confidence: round_to(key.strength, 2),
        }
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
