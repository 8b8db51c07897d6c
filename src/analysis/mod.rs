// Analysis adapter: decoded audio in, response payload out.
//
// Pipeline for one request:
// 1. Load the file as mono samples at 44.1 kHz
// 2. Truncate to the requested number of seconds (seconds <= 0 keeps everything)
// 3. Tempo: primary estimator, falling back once to a simpler estimator on any error
// 4. Key: single estimator, no fallback
// 5. Camelot lookup and response shaping
//
// The adapter holds no per-request state. Backends and the Camelot table are
// injected at construction and only read afterwards.

pub mod camelot;
pub mod numeric;
pub mod result;
pub mod traits;

use tracing::{debug, info, warn};

use crate::audio::bpm::AubioRhythm;
use crate::audio::decoder::{MonoAudio, SymphoniaLoader};
use crate::audio::key::ChromaKeyExtractor;
use crate::audio::onset::OnsetAutocorrelation;
use crate::error::ServiceError;
use crate::guard::ApprovedPath;

use camelot::CamelotTable;
use numeric::to_f64_or_none;
use result::{AnalysisResult, TempoEstimate};
use traits::{AudioLoader, BpmEstimator, KeyExtractor, RhythmExtractor};

/// Sample rate every file is decoded to before analysis.
pub const ANALYSIS_SAMPLE_RATE: u32 = 44100;

/// Default cap on analyzed audio, in seconds.
pub const DEFAULT_SECONDS: i64 = 180;

pub struct Analyzer {
    loader: Box<dyn AudioLoader>,
    rhythm: Box<dyn RhythmExtractor>,
    fallback: Box<dyn BpmEstimator>,
    key: Box<dyn KeyExtractor>,
    camelot: CamelotTable,
}

impl Analyzer {
    /// Analyzer with the default backends: symphonia decoding, aubio tempo,
    /// onset-autocorrelation fallback and chromagram key detection.
    pub fn new(camelot: CamelotTable) -> Self {
        Self {
            loader: Box::new(SymphoniaLoader::new(ANALYSIS_SAMPLE_RATE)),
            rhythm: Box::new(AubioRhythm),
            fallback: Box::new(OnsetAutocorrelation),
            key: Box::new(ChromaKeyExtractor),
            camelot,
        }
    }

    pub fn with_loader(mut self, loader: impl AudioLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_rhythm(mut self, rhythm: impl RhythmExtractor + 'static) -> Self {
        self.rhythm = Box::new(rhythm);
        self
    }

    pub fn with_fallback(mut self, fallback: impl BpmEstimator + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn with_key(mut self, key: impl KeyExtractor + 'static) -> Self {
        self.key = Box::new(key);
        self
    }

    /// Analyze an approved file, considering at most `seconds` of audio.
    ///
    /// The response names the file as requested, not as resolved. Blocking
    /// and CPU-bound; call from a blocking context.
    pub fn analyze(
        &self,
        target: &ApprovedPath,
        seconds: i64,
    ) -> Result<AnalysisResult, ServiceError> {
        let file = target.file_name.clone();

        let mut audio = self
            .loader
            .load(&target.resolved)
            .map_err(ServiceError::analyzer)?;
        let decoded_len = audio.samples.len();
        truncate(&mut audio, seconds);
        debug!(
            "Loaded {}: {} samples, analyzing {}",
            file,
            decoded_len,
            audio.samples.len()
        );

        let tempo = self.estimate_tempo(&audio)?;

        let key = self.key.extract(&audio).map_err(|e| {
            warn!("{} failed on {}: {}", self.key.name(), file, e);
            ServiceError::analyzer(e)
        })?;
        let camelot = self.camelot.lookup(&key.key, &key.scale);

        let result = AnalysisResult::new(file, tempo, key, camelot);
        info!(
            file = %result.file,
            bpm = result.bpm,
            bpm_confidence = ?result.bpm_confidence,
            key = %result.key,
            scale = %result.scale,
            camelot = %result.camelot,
            "Analysis complete"
        );
        Ok(result)
    }

    /// Primary estimator first; on any failure, one substitution with the
    /// fallback, which never reports confidence.
    pub fn estimate_tempo(&self, audio: &MonoAudio) -> Result<TempoEstimate, ServiceError> {
        match self.rhythm.extract(audio) {
            Ok(output) => Ok(TempoEstimate {
                bpm: output.bpm,
                confidence: to_f64_or_none(&output.confidence),
            }),
            Err(primary_err) => {
                warn!(
                    "{} failed ({}), falling back to {}",
                    self.rhythm.name(),
                    primary_err,
                    self.fallback.name()
                );
                let bpm = self
                    .fallback
                    .estimate(audio)
                    .map_err(ServiceError::analyzer)?;
                Ok(TempoEstimate {
                    bpm,
                    confidence: None,
                })
            }
        }
    }
}

/// Keep at most `sample_rate * seconds` samples. `seconds <= 0` keeps all.
pub fn truncate(audio: &mut MonoAudio, seconds: i64) {
    if seconds <= 0 {
        return;
    }
    let max_samples = (audio.sample_rate as u64).saturating_mul(seconds as u64);
    let max_samples = usize::try_from(max_samples).unwrap_or(usize::MAX);
    if audio.samples.len() > max_samples {
        audio.samples.truncate(max_samples);
        audio.duration_ms = (max_samples as u64 * 1000) / audio.sample_rate.max(1) as u64;
    }
}
