//! Backend seams for the analysis adapter.
//!
//! Each stage of the pipeline sits behind a trait so backends can be swapped
//! (and faked in tests) without touching the adapter. Backends report
//! failures as plain messages; the adapter decides how they surface.

use std::path::Path;

use super::result::{KeyEstimate, RhythmOutput};
use crate::audio::decoder::MonoAudio;

/// Decodes a file into mono samples at a fixed rate
pub trait AudioLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<MonoAudio, String>;
}

/// Primary tempo estimator: tempo plus confidence and beats
pub trait RhythmExtractor: Send + Sync {
    fn extract(&self, audio: &MonoAudio) -> Result<RhythmOutput, String>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Fallback tempo estimator: tempo only
pub trait BpmEstimator: Send + Sync {
    fn estimate(&self, audio: &MonoAudio) -> Result<f64, String>;

    fn name(&self) -> &'static str;
}

/// Musical key estimator
pub trait KeyExtractor: Send + Sync {
    fn extract(&self, audio: &MonoAudio) -> Result<KeyEstimate, String>;

    fn name(&self) -> &'static str;
}
