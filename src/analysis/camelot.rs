//! Camelot wheel lookup for harmonic mixing.
//!
//! - Numbers 1-12 are positions on the wheel; neighbours are a perfect fifth apart
//! - 'B' suffix = major key, 'A' suffix = minor key
//! - Relative major/minor pairs share a number
//!
//! Keys are spelled the way the key estimator reports them
//! (`C C# D Eb E F F# G Ab A Bb B`), joined with the scale by a single space.

use std::collections::HashMap;

/// Returned for any (key, scale) pair not on the wheel
pub const UNKNOWN: &str = "Unknown";

/// The 24 wheel positions, walked by fifths around the wheel.
const CAMELOT_WHEEL: [(&str, &str); 24] = [
    ("B major", "1B"),
    ("Ab minor", "1A"),
    ("F# major", "2B"),
    ("Eb minor", "2A"),
    ("C# major", "3B"),
    ("Bb minor", "3A"),
    ("Ab major", "4B"),
    ("F minor", "4A"),
    ("Eb major", "5B"),
    ("C minor", "5A"),
    ("Bb major", "6B"),
    ("G minor", "6A"),
    ("F major", "7B"),
    ("D minor", "7A"),
    ("C major", "8B"),
    ("A minor", "8A"),
    ("G major", "9B"),
    ("E minor", "9A"),
    ("D major", "10B"),
    ("B minor", "10A"),
    ("A major", "11B"),
    ("F# minor", "11A"),
    ("E major", "12B"),
    ("C# minor", "12A"),
];

/// Immutable (key, scale) → Camelot code table.
#[derive(Debug, Clone)]
pub struct CamelotTable {
    codes: HashMap<&'static str, &'static str>,
}

impl CamelotTable {
    /// The standard 24-key wheel
    pub fn standard() -> Self {
        Self {
            codes: CAMELOT_WHEEL.iter().copied().collect(),
        }
    }

    /// Look up `"<key> <scale>"`, exactly as spelled.
    pub fn lookup(&self, key: &str, scale: &str) -> &'static str {
        self.get(&format!("{} {}", key, scale)).unwrap_or(UNKNOWN)
    }

    pub fn get(&self, label: &str) -> Option<&'static str> {
        self.codes.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.codes.iter().map(|(label, code)| (*label, *code))
    }
}
