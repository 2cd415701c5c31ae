//! Keyboard layout to pitch mapping
//!
//! Twenty keys across the home row and the row above it, tuned one
//! equal-tempered semitone apart, ascending left to right.

use std::collections::HashMap;

/// Key order, lowest pitch first
pub const KEY_LAYOUT: [char; 20] = [
    'a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l', ';', '\'', 'e', 'r', 't', 'u', 'i', 'p', '[',
    ']', '\\',
];

/// C3 in Hz
pub const BASE_FREQUENCY: f64 = 130.81;

/// Semitones above the base frequency for the first key (F#3)
pub const START_SEMITONE: i32 = 6;

lazy_static::lazy_static! {
    static ref STANDARD: PitchMap = PitchMap::build();
}

/// Equal-tempered frequency `semitones` above `base`
pub fn semitone_to_freq(base: f64, semitones: i32) -> f64 {
    base * 2.0_f64.powf(semitones as f64 / 12.0)
}

/// Immutable key -> frequency table
#[derive(Debug, Clone)]
pub struct PitchMap {
    frequencies: HashMap<char, f64>,
}

impl PitchMap {
    /// Build the table from [`KEY_LAYOUT`]
    pub fn build() -> Self {
        let frequencies = KEY_LAYOUT
            .iter()
            .enumerate()
            .map(|(i, &key)| {
                (
                    key,
                    semitone_to_freq(BASE_FREQUENCY, START_SEMITONE + i as i32),
                )
            })
            .collect();

        Self { frequencies }
    }

    /// Process-wide table, built on first use
    pub fn standard() -> &'static PitchMap {
        &STANDARD
    }

    /// Frequency for `key`, or `None` when the key is not on the layout
    pub fn frequency(&self, key: char) -> Option<f64> {
        self.frequencies.get(&key).copied()
    }

    pub fn contains(&self, key: char) -> bool {
        self.frequencies.contains_key(&key)
    }

    /// Keys in layout order
    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        KEY_LAYOUT.iter().copied()
    }

    /// `(key, frequency)` pairs in layout order
    pub fn iter(&self) -> impl Iterator<Item = (char, f64)> + '_ {
        KEY_LAYOUT
            .iter()
            .filter_map(move |&key| self.frequency(key).map(|freq| (key, freq)))
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

impl Default for PitchMap {
    fn default() -> Self {
        Self::build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_layout_keys_mapped() {
        let map = PitchMap::build();
        assert_eq!(map.len(), 20);
        for key in KEY_LAYOUT {
            let freq = map.frequency(key).expect("layout key missing");
            assert!(freq > 0.0, "{:?} has non-positive frequency {}", key, freq);
        }
    }

    #[test]
    fn test_frequencies_strictly_increase() {
        let map = PitchMap::build();
        let freqs: Vec<f64> = map.iter().map(|(_, f)| f).collect();
        for pair in freqs.windows(2) {
            assert!(pair[1] > pair[0], "{} !> {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_first_key_frequency() {
        let map = PitchMap::build();
        let expected = 130.81 * 2.0_f64.powf(6.0 / 12.0);
        assert!((map.frequency('a').unwrap() - expected).abs() < 1e-9);
        // F#3 is ~185 Hz
        assert!((map.frequency('a').unwrap() - 184.99).abs() < 0.05);
    }

    #[test]
    fn test_semitone_spacing() {
        let map = PitchMap::build();
        let ratio = map.frequency('s').unwrap() / map.frequency('a').unwrap();
        assert!((ratio - 2.0_f64.powf(1.0 / 12.0)).abs() < 1e-12);

        // twelve keys up is one octave
        let octave = map.frequency('r').unwrap() / map.frequency('a').unwrap();
        assert!((octave - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_keys() {
        let map = PitchMap::build();
        assert_eq!(map.frequency('z'), None);
        assert_eq!(map.frequency('A'), None);
        assert_eq!(map.frequency('w'), None);
        assert!(!map.contains(' '));
    }

    #[test]
    fn test_keys_in_layout_order() {
        let keys: String = PitchMap::standard().keys().collect();
        assert_eq!(keys, "asdfghjkl;'ertuip[]\\");
    }
}
