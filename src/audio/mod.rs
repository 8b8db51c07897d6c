// Audio processing (DSP)
// Modules: decoder, bpm (aubio tracker), onset (fallback tempo), key

pub mod bpm;
pub mod decoder;
pub mod key;
pub mod onset;

#[cfg(test)]
pub(crate) mod test_signals;
