// Chord definitions used by the progression tables.
//
// A chord is a display symbol ("C", "Am", "Cmaj7") plus the ordered list of
// pitch classes it contains. The order is the order tones are stacked by the
// MIDI encoder (lowest first); no voicing theory is applied anywhere.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pitch::PitchClass;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    /// Human-readable chord symbol shown in charts.
    pub symbol: String,
    /// Chord tones, lowest first. Never empty in a validated table.
    pub tones: Vec<PitchClass>,
}

impl Chord {
    pub fn new(symbol: impl Into<String>, tones: Vec<PitchClass>) -> Self {
        Chord {
            symbol: symbol.into(),
            tones,
        }
    }

    /// Tone names in order, e.g. `["F", "A", "C"]`.
    pub fn tone_names(&self) -> Vec<&'static str> {
        self.tones.iter().map(|t| t.name()).collect()
    }

    /// Stack the tones upward starting at `base_key`: each tone is placed at
    /// the lowest key at or above the previous one (strictly above, for
    /// repeated pitch classes). Keys that would exceed 127 are dropped.
    pub fn stacked_keys(&self, base_key: u8) -> Vec<u8> {
        let mut keys = Vec::with_capacity(self.tones.len());
        let octave_floor = base_key - base_key % 12;
        let mut floor = base_key;
        for tone in &self.tones {
            let mut key = u16::from(octave_floor) + u16::from(tone.semitone());
            while key < u16::from(floor) {
                key += 12;
            }
            let Some(key) = u8::try_from(key).ok().filter(|&k| k <= 127) else {
                break;
            };
            keys.push(key);
            floor = key.saturating_add(1);
        }
        keys
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{{}}}", self.symbol, self.tone_names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(symbol: &str, names: &[&str]) -> Chord {
        let tones = names.iter().map(|n| n.parse::<PitchClass>().unwrap()).collect();
        Chord::new(symbol, tones)
    }

    #[test]
    fn tones_deserialize_from_names() {
        let f: Chord =
            serde_json::from_str(r#"{"symbol": "F", "tones": ["F", "A", "C"]}"#).unwrap();
        assert_eq!(f.tone_names(), vec!["F", "A", "C"]);
        assert!(serde_json::from_str::<Chord>(r#"{"symbol": "X", "tones": ["F", "Z"]}"#).is_err());
    }

    #[test]
    fn stacked_keys_ascend() {
        // C3 = 48.
        let c = chord("C", &["C", "E", "G"]);
        assert_eq!(c.stacked_keys(48), vec![48, 52, 55]);

        let f = chord("F", &["F", "A", "C"]);
        assert_eq!(f.stacked_keys(48), vec![53, 57, 60]);

        let g7 = chord("G7", &["G", "B", "D", "F"]);
        assert_eq!(g7.stacked_keys(48), vec![55, 59, 62, 65]);
    }

    #[test]
    fn repeated_tone_moves_up_an_octave() {
        let octave = chord("C5", &["C", "G", "C"]);
        assert_eq!(octave.stacked_keys(48), vec![48, 55, 60]);
    }

    #[test]
    fn display_lists_tones() {
        let am = chord("Am", &["A", "C", "E"]);
        assert_eq!(am.to_string(), "Am {A, C, E}");
    }
}
