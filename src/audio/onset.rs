// Fallback tempo estimator: onset envelope + autocorrelation.
//
// Simpler than the aubio tracker and reports a tempo only, no confidence.
// 1. Onset envelope: log-compressed spectral flux over Hann-windowed frames
// 2. Autocorrelation of the mean-removed envelope via FFT (Wiener-Khinchin)
// 3. Strongest lag between 50 and 210 BPM, refined with a parabola through
//    its neighbours
//
// A flat envelope (silence, drones) has no periodicity and reports 0 BPM.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

use super::bpm::fold_to_dj_range;
use super::decoder::MonoAudio;
use crate::analysis::traits::BpmEstimator;

const FRAME_SIZE: usize = 2048;
const HOP_SIZE: usize = 512;

/// Tempo search range
const MIN_BPM: f64 = 50.0;
const MAX_BPM: f64 = 210.0;

/// Log compression factor for magnitudes: ln(1 + C·|X|)
const COMPRESSION: f32 = 1000.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct OnsetAutocorrelation;

impl BpmEstimator for OnsetAutocorrelation {
    fn estimate(&self, audio: &MonoAudio) -> Result<f64, String> {
        estimate_bpm(audio)
    }

    fn name(&self) -> &'static str {
        "onset-autocorrelation"
    }
}

pub fn estimate_bpm(audio: &MonoAudio) -> Result<f64, String> {
    if audio.samples.len() < FRAME_SIZE {
        return Err(format!(
            "Audio too short for tempo estimation: {} samples (need at least {})",
            audio.samples.len(),
            FRAME_SIZE
        ));
    }

    let envelope = onset_envelope(&audio.samples);
    let envelope_rate = audio.sample_rate as f64 / HOP_SIZE as f64;

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
    let energy: f32 = centered.iter().map(|v| v * v).sum();
    if energy <= f32::EPSILON {
        return Ok(0.0);
    }

    let acf = autocorrelate(&centered);
    if acf.len() < 3 {
        return Ok(0.0);
    }

    let min_lag = ((60.0 * envelope_rate / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((60.0 * envelope_rate / MIN_BPM).floor() as usize).min(acf.len() - 2);
    if min_lag >= max_lag {
        return Ok(0.0);
    }

    let (peak_lag, peak_value) = acf[min_lag..=max_lag]
        .iter()
        .enumerate()
        .map(|(i, &v)| (min_lag + i, v))
        .fold((min_lag, f32::NEG_INFINITY), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });
    if peak_value <= 0.0 {
        return Ok(0.0);
    }

    let lag = peak_lag as f64 + parabolic_offset(acf[peak_lag - 1], peak_value, acf[peak_lag + 1]);
    Ok(fold_to_dj_range(60.0 * envelope_rate / lag))
}

/// Half-wave rectified spectral flux of log-compressed magnitudes, one value
/// per hop.
fn onset_envelope(samples: &[f32]) -> Vec<f32> {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);

    let window: Vec<f32> = (0..FRAME_SIZE)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (FRAME_SIZE - 1) as f32).cos()))
        .collect();

    let num_bins = FRAME_SIZE / 2 + 1;
    let num_frames = (samples.len() - FRAME_SIZE) / HOP_SIZE + 1;
    let mut envelope = Vec::with_capacity(num_frames);
    let mut previous: Option<Vec<f32>> = None;

    for frame in samples.windows(FRAME_SIZE).step_by(HOP_SIZE) {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(window.iter())
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();
        fft.process(&mut buffer);

        let magnitudes: Vec<f32> = buffer[..num_bins]
            .iter()
            .map(|c| (1.0 + COMPRESSION * c.norm()).ln())
            .collect();

        let flux = match &previous {
            Some(prev) => magnitudes
                .iter()
                .zip(prev.iter())
                .map(|(current, prev)| (current - prev).max(0.0))
                .sum(),
            None => 0.0,
        };
        envelope.push(flux);
        previous = Some(magnitudes);
    }

    envelope
}

/// Linear autocorrelation via FFT, lags 0..len.
fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    // Zero-padding avoids circular wrap-around
    let fft_len = (signal.len() * 2).next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&s| Complex::new(s, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_len)
        .collect();

    fft.process(&mut buffer);
    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    ifft.process(&mut buffer);

    let scale = 1.0 / fft_len as f32;
    buffer
        .iter()
        .take(signal.len())
        .map(|c| c.re * scale)
        .collect()
}

/// Vertex offset of the parabola through three equally spaced points, in
/// [-0.5, 0.5].
fn parabolic_offset(left: f32, center: f32, right: f32) -> f64 {
    let denominator = left - 2.0 * center + right;
    if denominator.abs() < 1e-12 {
        return 0.0;
    }
    (0.5 * (left - right) / denominator).clamp(-0.5, 0.5) as f64
}
