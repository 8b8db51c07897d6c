// Musical key detection using a chromagram and key-profile correlation.
//
// Algorithm overview:
// 1. Compute chromagram: 12 pitch class energy distribution using FFT
//    - Window the signal with a Hanning window
//    - Map FFT bins to pitch classes (C through B) in the range 65Hz–2000Hz
//    - Sum power per pitch class across all frames
// 2. Pearson-correlate the chromagram with Shaath's major/minor profiles
//    rotated to all 12 roots
// 3. The best of the 24 candidates is the key; its correlation is the strength
//
// Silence yields a flat chromagram: every correlation is 0 and the first
// candidate (C major) wins with strength 0.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

use super::decoder::MonoAudio;
use crate::analysis::result::KeyEstimate;
use crate::analysis::traits::KeyExtractor;

/// FFT window size for chromagram computation.
/// 4096 samples gives ~10Hz resolution at 44100Hz, enough to separate
/// adjacent semitones in the lower octaves (C2=65Hz vs C#2=69Hz).
const FFT_SIZE: usize = 4096;

/// 50% overlap
const HOP_SIZE: usize = 2048;

/// Below ~C2 bass rumble and noise dominate.
const MIN_FREQ: f64 = 65.0;

/// Above ~2000Hz harmonics rather than fundamentals dominate.
const MAX_FREQ: f64 = 2000.0;

/// Shaath's key profiles (libKeyFinder), tuned on popular and electronic
/// music. Index 0 is the tonic.
const SHAATH_MAJOR: [f64; 12] = [
    6.6, 2.0, 3.5, 2.3, 4.6, 4.0, 2.5, 5.2, 2.4, 3.7, 2.3, 3.2,
];

const SHAATH_MINOR: [f64; 12] = [
    6.5, 2.7, 3.5, 5.4, 2.6, 3.5, 2.5, 4.7, 4.0, 2.7, 3.4, 3.2,
];

/// Pitch class names, indexed from C. Same spelling for both scales.
pub const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Chromagram-based key estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromaKeyExtractor;

impl KeyExtractor for ChromaKeyExtractor {
    fn extract(&self, audio: &MonoAudio) -> Result<KeyEstimate, String> {
        detect_key(audio)
    }

    fn name(&self) -> &'static str {
        "chroma-key"
    }
}

/// Detect the key of pre-decoded mono audio.
pub fn detect_key(audio: &MonoAudio) -> Result<KeyEstimate, String> {
    if audio.samples.is_empty() {
        return Err("No audio samples to analyze".to_string());
    }

    if audio.samples.len() < FFT_SIZE {
        return Err(format!(
            "Audio too short for key detection: {} samples (need at least {})",
            audio.samples.len(),
            FFT_SIZE
        ));
    }

    let chromagram = compute_chromagram(&audio.samples, audio.sample_rate);
    let (root, is_minor, correlation) = match_key_profiles(&chromagram);

    Ok(KeyEstimate {
        key: PITCH_NAMES[root].to_string(),
        scale: if is_minor { "minor" } else { "major" }.to_string(),
        strength: if correlation.is_finite() { correlation } else { 0.0 },
    })
}

/// 12-bin pitch class power distribution, normalized to sum to 1.0
/// (all zeros for silence).
fn compute_chromagram(samples: &[f32], sample_rate: u32) -> [f64; 12] {
    let fft = FftPlanner::<f64>::new().plan_fft_forward(FFT_SIZE);
    let hann: Vec<f64> = (0..FFT_SIZE)
        .map(|n| (PI * n as f64 / (FFT_SIZE - 1) as f64).sin().powi(2))
        .collect();

    let bin_hz = sample_rate as f64 / FFT_SIZE as f64;
    let pitched_bins: Vec<(usize, usize)> = (0..=FFT_SIZE / 2)
        .filter_map(|bin| pitch_class(bin as f64 * bin_hz).map(|pc| (bin, pc)))
        .collect();

    let mut chroma = [0.0f64; 12];
    let mut spectrum = vec![Complex::new(0.0, 0.0); FFT_SIZE];
    for frame in samples.windows(FFT_SIZE).step_by(HOP_SIZE) {
        for ((slot, &s), w) in spectrum.iter_mut().zip(frame).zip(&hann) {
            *slot = Complex::new(s as f64 * w, 0.0);
        }
        fft.process(&mut spectrum);

        for &(bin, pc) in &pitched_bins {
            chroma[pc] += spectrum[bin].norm_sqr();
        }
    }

    let energy: f64 = chroma.iter().sum();
    if energy > 0.0 {
        chroma.iter_mut().for_each(|v| *v /= energy);
    }
    chroma
}

/// Nearest 12-TET pitch class (C = 0) for A4 = 440 Hz, or `None` outside the
/// analyzed band.
fn pitch_class(freq: f64) -> Option<usize> {
    if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
        return None;
    }
    let semitones_above_a = (12.0 * (freq / 440.0).log2()).round() as i32;
    Some((semitones_above_a + 9).rem_euclid(12) as usize)
}

/// Best of the 24 (root, scale) candidates.
///
/// Returns (pitch_class_index, is_minor, correlation). Ties keep the earlier
/// candidate, majors before minors at each root.
fn match_key_profiles(chromagram: &[f64; 12]) -> (usize, bool, f64) {
    let mut best = (0, false, f64::NEG_INFINITY);

    for root in 0..12 {
        for (profile, is_minor) in [(&SHAATH_MAJOR, false), (&SHAATH_MINOR, true)] {
            let corr = pearson_correlation(chromagram, profile, root);
            if corr > best.2 {
                best = (root, is_minor, corr);
            }
        }
    }

    best
}

/// Pearson correlation between the chromagram and a profile rotated so its
/// tonic lands on pitch class `root`. 0 when either side is constant.
fn pearson_correlation(chromagram: &[f64; 12], profile: &[f64; 12], root: usize) -> f64 {
    let rotated = |i: usize| chromagram[(root + i) % 12];
    let mean_x = chromagram.iter().sum::<f64>() / 12.0;
    let mean_y = profile.iter().sum::<f64>() / 12.0;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (i, &y) in profile.iter().enumerate() {
        let dx = rotated(i) - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let norm = (var_x * var_y).sqrt();
    if norm < 1e-12 {
        0.0
    } else {
        cov / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::camelot::{CamelotTable, UNKNOWN};
    use crate::audio::test_signals::{rich_chord, silence, tone};

    /// Wheel number of the detected key, e.g. "8" for A minor
    fn wheel_number(result: &KeyEstimate) -> String {
        let code = CamelotTable::standard().lookup(&result.key, &result.scale);
        code.trim_end_matches(['A', 'B']).to_string()
    }

    fn detect(audio: &MonoAudio) -> KeyEstimate {
        ChromaKeyExtractor
            .extract(audio)
            .expect("key detection should succeed")
    }

    #[test]
    fn test_pure_a_is_detected_at_any_rate() {
        for rate in [44100, 48000] {
            let result = detect(&tone(440.0, rate, 10.0));
            assert_eq!(result.key, "A", "440 Hz at {} Hz: {:?}", rate, result);
        }
    }

    #[test]
    fn test_c_major_triad() {
        let result = detect(&rich_chord(&[261.63, 329.63, 392.00], 44100, 10.0));
        let found = (result.key.as_str(), result.scale.as_str());
        assert!(
            matches!(found, ("C", "major") | ("A", "minor") | ("C", "minor")),
            "C major triad landed on {:?}",
            result
        );
        assert!(result.strength > 0.0);
    }

    #[test]
    fn test_a_minor_triad_shares_wheel_with_relative_major() {
        let result = detect(&rich_chord(&[220.0, 261.63, 329.63], 44100, 10.0));
        let number = wheel_number(&result);
        assert!(number == "8" || number == "5", "A minor triad landed on {:?}", result);
    }

    #[test]
    fn test_d_minor_triad() {
        let result = detect(&rich_chord(&[293.66, 349.23, 440.00], 44100, 10.0));
        let number = wheel_number(&result);
        assert!(
            ["7", "8", "10"].contains(&number.as_str()),
            "D minor triad landed on {:?}",
            result
        );
        assert!((-1.0..=1.0).contains(&result.strength));
    }

    #[test]
    fn test_empty_and_short_audio_are_errors() {
        let empty = MonoAudio {
            samples: Vec::new(),
            sample_rate: 44100,
            duration_ms: 0,
        };
        assert!(ChromaKeyExtractor.extract(&empty).is_err());

        let short = MonoAudio {
            samples: vec![0.0; FFT_SIZE - 1],
            sample_rate: 44100,
            duration_ms: 92,
        };
        let err = ChromaKeyExtractor.extract(&short).unwrap_err();
        assert!(err.starts_with("Audio too short"), "got: {}", err);
    }

    #[test]
    fn test_silence_defaults_to_c_major_with_zero_strength() {
        let result = detect(&silence(44100, 10.0));
        assert_eq!((result.key.as_str(), result.scale.as_str()), ("C", "major"));
        assert_eq!(result.strength, 0.0);
    }

    #[test]
    fn test_every_candidate_is_on_the_wheel() {
        let table = CamelotTable::standard();
        for name in PITCH_NAMES {
            for scale in ["major", "minor"] {
                assert_ne!(table.lookup(name, scale), UNKNOWN, "{} {}", name, scale);
            }
        }
    }

    #[test]
    fn test_pitch_class_mapping() {
        assert_eq!(pitch_class(440.0), Some(9));
        assert_eq!(pitch_class(261.63), Some(0));
        assert_eq!(pitch_class(466.16), Some(10));
        assert_eq!(pitch_class(30.0), None);
        assert_eq!(pitch_class(4000.0), None);
    }

    #[test]
    fn test_rotated_profile_correlates_perfectly() {
        let total: f64 = SHAATH_MINOR.iter().sum();
        let mut chroma = [0.0; 12];
        for (i, v) in SHAATH_MINOR.iter().enumerate() {
            chroma[(i + 5) % 12] = v / total;
        }
        let (root, is_minor, corr) = match_key_profiles(&chroma);
        assert_eq!((root, is_minor), (5, true));
        assert!((corr - 1.0).abs() < 1e-9);
    }
}
