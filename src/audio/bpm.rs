// Primary tempo estimator: aubio's beat tracker.
//
// The tracker consumes hop-sized frames, detects onsets by spectral flux and
// locks a beat period from their autocorrelation. Besides the tempo it keeps
// a confidence score and reports each beat as it passes.
//
// aubio says 0 BPM for silence and for signals without a pulse. We turn that
// into an error so the analyzer substitutes the fallback estimator.

use bliss_audio_aubio_rs::{OnsetMode, Tempo};

use super::decoder::MonoAudio;
use crate::analysis::numeric::Numeric;
use crate::analysis::result::RhythmOutput;
use crate::analysis::traits::RhythmExtractor;

/// Analysis window of the onset detector
const WINDOW: usize = 1024;

/// Frame advance; half the window
const HOP: usize = 512;

/// Plausible tracker output; anything else is noise
const TRUSTED_BPM: std::ops::RangeInclusive<f64> = 40.0..=300.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct AubioRhythm;

impl RhythmExtractor for AubioRhythm {
    fn extract(&self, audio: &MonoAudio) -> Result<RhythmOutput, String> {
        detect_rhythm(audio)
    }

    fn name(&self) -> &'static str {
        "aubio-tempo"
    }
}

/// Track beats over the whole buffer and report tempo, confidence and beat
/// times in seconds.
pub fn detect_rhythm(audio: &MonoAudio) -> Result<RhythmOutput, String> {
    if audio.samples.is_empty() {
        return Err("No audio samples to analyze".to_string());
    }

    // SpecFlux copes with dense mixes better than aubio's default HFC
    let mut tracker = Tempo::new(OnsetMode::SpecFlux, WINDOW, HOP, audio.sample_rate)
        .map_err(|e| format!("Failed to create aubio Tempo detector: {:?}", e))?;

    let mut beats = Vec::new();
    for (frame_index, frame) in audio.samples.chunks_exact(HOP).enumerate() {
        let hit = tracker
            .do_result(frame)
            .map_err(|e| format!("aubio tempo failed at frame {}: {:?}", frame_index, e))?;
        if hit > 0.0 {
            beats.push(tracker.get_last_s() as f64);
        }
    }

    if beats.is_empty() {
        return Err("No beats detected".to_string());
    }

    let bpm = tracker.get_bpm() as f64;
    if !TRUSTED_BPM.contains(&bpm) {
        return Err(format!("No stable tempo detected (tracker reported {:.1} BPM)", bpm));
    }

    Ok(RhythmOutput {
        bpm: fold_to_dj_range(bpm),
        confidence: Numeric::Boxed(tracker.get_confidence()),
        beats,
    })
}

/// Fold half- or double-time readings into 80–200 BPM.
///
/// Trackers often lock onto half or twice the felt tempo; nearly all club
/// music sits inside this window.
pub fn fold_to_dj_range(bpm: f64) -> f64 {
    match bpm {
        b if (40.0..80.0).contains(&b) => b * 2.0,
        b if b > 200.0 && b <= 300.0 => b / 2.0,
        b => b,
    }
}
