// Whole-file decoding for analysis: symphonia decode, mono downmix, then
// rubato resampling to the analysis rate.

use rubato::{FftFixedInOut, Resampler};
use std::io::ErrorKind;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::analysis::traits::AudioLoader;

/// Decoded mono signal, the input to every estimator.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_ms: u64,
}

/// Loader used by the analyzer: symphonia decode, downmix, resample.
#[derive(Debug, Clone, Copy)]
pub struct SymphoniaLoader {
    sample_rate: u32,
}

impl SymphoniaLoader {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioLoader for SymphoniaLoader {
    fn load(&self, path: &Path) -> Result<MonoAudio, String> {
        load_mono(path, self.sample_rate)
    }
}

/// Decode `path` to mono and resample it to `target_rate`.
pub fn load_mono(path: &Path, target_rate: u32) -> Result<MonoAudio, String> {
    let audio = decode_to_mono(path)?;
    if audio.sample_rate == target_rate {
        return Ok(audio);
    }

    tracing::debug!(
        "Resampling {} Hz -> {} Hz ({} samples)",
        audio.sample_rate,
        target_rate,
        audio.samples.len()
    );
    let samples = resample(&audio.samples, audio.sample_rate, target_rate)?;
    let duration_ms = (samples.len() as u64 * 1000) / target_rate as u64;
    Ok(MonoAudio {
        samples,
        sample_rate: target_rate,
        duration_ms,
    })
}

/// Decode every packet of the default track and downmix to mono.
///
/// Samples stay at the file's native rate; see [`load_mono`] for resampling.
/// Packets the codec rejects as corrupt are skipped.
pub fn decode_to_mono(path: &Path) -> Result<MonoAudio, String> {
    let file =
        std::fs::File::open(path).map_err(|e| format!("Failed to open audio file: {}", e))?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let mut reader = symphonia::default::get_probe()
        .format(&hint, source, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| format!("Failed to probe audio format: {}", e))?
        .format;

    let (track_id, sample_rate, mut decoder) = {
        let track = reader
            .default_track()
            .ok_or_else(|| "No audio tracks found".to_string())?;
        let rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| "Audio track has no sample rate".to_string())?;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| format!("Failed to create decoder: {}", e))?;
        (track.id, rate, decoder)
    };

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(format!("Error reading packet: {}", e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(buffer) => append_mono(&buffer, &mut samples),
            Err(SymphoniaError::DecodeError(msg)) => {
                tracing::warn!("Skipping corrupted packet: {}", msg);
            }
            Err(e) => return Err(format!("Decode error: {}", e)),
        }
    }

    let duration_ms = (samples.len() as u64 * 1000) / sample_rate.max(1) as u64;
    Ok(MonoAudio {
        samples,
        sample_rate,
        duration_ms,
    })
}

/// Append a decoded buffer to `out` as mono f32, averaging channels.
fn append_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => downmix(buf, out),
        AudioBufferRef::U16(buf) => downmix(buf, out),
        AudioBufferRef::U24(buf) => downmix(buf, out),
        AudioBufferRef::U32(buf) => downmix(buf, out),
        AudioBufferRef::S8(buf) => downmix(buf, out),
        AudioBufferRef::S16(buf) => downmix(buf, out),
        AudioBufferRef::S24(buf) => downmix(buf, out),
        AudioBufferRef::S32(buf) => downmix(buf, out),
        AudioBufferRef::F32(buf) => downmix(buf, out),
        AudioBufferRef::F64(buf) => downmix(buf, out),
    }
}

fn downmix<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count();
    let start = out.len();
    if channels == 0 || buf.frames() == 0 {
        return;
    }

    out.extend(buf.chan(0).iter().map(|&s| f32::from_sample(s)));
    if channels == 1 {
        return;
    }

    let mixed = &mut out[start..];
    for ch in 1..channels {
        for (acc, &s) in mixed.iter_mut().zip(buf.chan(ch)) {
            *acc += f32::from_sample(s);
        }
    }
    let scale = 1.0 / channels as f32;
    mixed.iter_mut().for_each(|s| *s *= scale);
}

/// Chunk size fed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// FFT-based resampling of a mono signal with rubato.
///
/// The last chunk is zero-padded; only the output frames that correspond to
/// real input are kept.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, String> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1)
            .map_err(|e| format!("Failed to create resampler: {}", e))?;

    let input_frames = resampler.input_frames_next();
    let output_frames = resampler.output_frames_next();
    let ratio = to_rate as f64 / from_rate as f64;
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected_len + output_frames);

    for chunk in samples.chunks(input_frames) {
        let mut block = chunk.to_vec();
        block.resize(input_frames, 0.0);
        let input = vec![block];

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| format!("Resampling failed: {}", e))?;
        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
    }

    output.truncate(expected_len);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::path::PathBuf;

    /// Write a 16-bit PCM WAV with `channels` interleaved channels.
    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[Vec<f32>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &sample in frame {
                writer
                    .write_sample((sample * i16::MAX as f32) as i16)
                    .unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_decode_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let frames: Vec<Vec<f32>> = sine(440.0, 44100, 1.0).into_iter().map(|s| vec![s]).collect();
        write_wav(&path, 44100, 1, &frames);

        let audio = decode_to_mono(&path).expect("decode should succeed");
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples.len(), 44100);
        assert_eq!(audio.duration_ms, 1000);
    }

    #[test]
    fn test_stereo_is_averaged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Left +0.5, right -0.5 cancels out; left 0.5, right 0.25 averages to 0.375
        let mut frames = vec![vec![0.5, -0.5]; 1000];
        frames.extend(vec![vec![0.5, 0.25]; 1000]);
        write_wav(&path, 44100, 2, &frames);

        let audio = decode_to_mono(&path).expect("decode should succeed");
        assert_eq!(audio.samples.len(), 2000);
        assert!(audio.samples[..1000].iter().all(|s| s.abs() < 1e-3));
        assert!(audio.samples[1000..].iter().all(|s| (s - 0.375).abs() < 1e-3));
    }

    #[test]
    fn test_load_mono_resamples_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone48k.wav");
        let frames: Vec<Vec<f32>> = sine(440.0, 48000, 2.0).into_iter().map(|s| vec![s]).collect();
        write_wav(&path, 48000, 1, &frames);

        let audio = load_mono(&path, 44100).expect("load should succeed");
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples.len(), 88200);
        assert_eq!(audio.duration_ms, 2000);
    }

    #[test]
    fn test_load_mono_same_rate_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let frames: Vec<Vec<f32>> = sine(220.0, 44100, 0.5).into_iter().map(|s| vec![s]).collect();
        write_wav(&path, 44100, 1, &frames);

        let decoded = decode_to_mono(&path).unwrap();
        let loaded = load_mono(&path, 44100).unwrap();
        assert_eq!(decoded.samples, loaded.samples);
    }

    #[test]
    fn test_garbage_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wav");
        std::fs::write(&path, b"this is definitely not audio data").unwrap();

        let result = decode_to_mono(&path);
        assert!(result.is_err(), "Garbage bytes should not decode");
    }

    #[test]
    fn test_missing_file_fails() {
        let result = decode_to_mono(&PathBuf::from("/nonexistent/file.wav"));
        let err = result.unwrap_err();
        assert!(err.starts_with("Failed to open audio file"), "got: {}", err);
    }

    #[test]
    fn test_resample_empty_is_empty() {
        assert!(resample(&[], 48000, 44100).unwrap().is_empty());
    }
}
