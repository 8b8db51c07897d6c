// Synthetic signals shared by the estimator tests.

use std::f32::consts::TAU;

use super::decoder::MonoAudio;

fn wrap(samples: Vec<f32>, sample_rate: u32) -> MonoAudio {
    let duration_ms = samples.len() as u64 * 1000 / sample_rate as u64;
    MonoAudio {
        samples,
        sample_rate,
        duration_ms,
    }
}

/// 5 ms decaying 1 kHz blips, one per beat.
pub fn click_track(bpm: f64, sample_rate: u32, seconds: f64) -> MonoAudio {
    let len = (sample_rate as f64 * seconds) as usize;
    let beat_period = 60.0 / bpm * sample_rate as f64;
    let blip_len = sample_rate as usize / 200;
    let mut samples = vec![0.0f32; len];

    let onsets = (0..)
        .map(|beat| (beat as f64 * beat_period) as usize)
        .take_while(|&onset| onset < len);
    for onset in onsets {
        for (j, sample) in samples[onset..].iter_mut().take(blip_len).enumerate() {
            let t = j as f32 / sample_rate as f32;
            *sample = (TAU * 1000.0 * t).sin() * (-500.0 * t).exp();
        }
    }

    wrap(samples, sample_rate)
}

/// Unit-amplitude sine.
pub fn tone(frequency: f32, sample_rate: u32, seconds: f64) -> MonoAudio {
    let len = (sample_rate as f64 * seconds) as usize;
    let samples = (0..len)
        .map(|i| (TAU * frequency * i as f32 / sample_rate as f32).sin())
        .collect();
    wrap(samples, sample_rate)
}

/// Sum of notes, each with three overtones at halving amplitude, normalized
/// to peak at most 1.0.
pub fn rich_chord(notes: &[f32], sample_rate: u32, seconds: f64) -> MonoAudio {
    const PARTIALS: [(f32, f32); 4] = [(1.0, 1.0), (2.0, 0.5), (3.0, 0.25), (4.0, 0.125)];
    let norm: f32 = notes.len() as f32 * PARTIALS.iter().map(|(_, gain)| gain).sum::<f32>();

    let len = (sample_rate as f64 * seconds) as usize;
    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let sum: f32 = notes
                .iter()
                .flat_map(|&f| PARTIALS.iter().map(move |&(k, gain)| gain * (TAU * f * k * t).sin()))
                .sum();
            sum / norm
        })
        .collect();
    wrap(samples, sample_rate)
}

pub fn silence(sample_rate: u32, seconds: f64) -> MonoAudio {
    wrap(vec![0.0; (sample_rate as f64 * seconds) as usize], sample_rate)
}
