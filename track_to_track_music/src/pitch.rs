// Pitch names: pitch classes ("C", "Eb") and octave-qualified pitches ("C4").
//
// Chord definitions are sets of pitch classes; melody notes are pitches with
// an octave. Both are written as plain strings in the table JSON and on the
// wire, so both types serialize through their display names.
//
// Spelling is canonicalized on parse: "D#" and "Eb" both become pitch class 3
// and always display as "Eb". Octave numbering follows the MIDI convention
// where C4 = 60.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display names for the 12 pitch classes, indexed by semitone above C.
const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Error returned when a pitch or pitch-class name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PitchParseError {
    #[error("invalid pitch name '{0}'")]
    InvalidName(String),
    #[error("pitch '{0}' is outside the MIDI key range 0-127")]
    OutOfRange(String),
}

/// A note name without octave, stored as semitones above C (0-11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);
    pub const D: PitchClass = PitchClass(2);
    pub const E_FLAT: PitchClass = PitchClass(3);
    pub const E: PitchClass = PitchClass(4);
    pub const F: PitchClass = PitchClass(5);
    pub const G: PitchClass = PitchClass(7);
    pub const A: PitchClass = PitchClass(9);
    pub const B_FLAT: PitchClass = PitchClass(10);
    pub const B: PitchClass = PitchClass(11);

    pub fn semitone(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        PITCH_CLASS_NAMES[self.0 as usize]
    }
}

/// Parse the letter + accidentals prefix of a note name. Returns the pitch
/// class, the octave carry when accidentals cross C ("Cb" is -1, "B#" is
/// +1), and the unparsed remainder (the octave, for full pitches).
fn split_pitch_class(s: &str) -> Option<(PitchClass, i8, &str)> {
    let mut chars = s.char_indices();
    let (_, letter) = chars.next()?;
    let base: i16 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut offset: i16 = 0;
    let mut rest_start = letter.len_utf8();
    for (i, c) in chars {
        match c {
            '#' | '♯' => offset += 1,
            'b' | '♭' => offset -= 1,
            _ => break,
        }
        rest_start = i + c.len_utf8();
    }

    let semitone = base + offset;
    let carry = i8::try_from(semitone.div_euclid(12)).ok()?;
    let class = PitchClass(semitone.rem_euclid(12) as u8);
    Some((class, carry, &s[rest_start..]))
}

impl FromStr for PitchClass {
    type Err = PitchParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match split_pitch_class(trimmed) {
            Some((pc, _, "")) => Ok(pc),
            _ => Err(PitchParseError::InvalidName(s.to_string())),
        }
    }
}

impl TryFrom<String> for PitchClass {
    type Error = PitchParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PitchClass> for String {
    fn from(pc: PitchClass) -> Self {
        pc.name().to_string()
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pitch class in a specific octave, e.g. "C4" (middle C) or "Bb4".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch {
    pub class: PitchClass,
    pub octave: i8,
}

impl Pitch {
    pub fn new(class: PitchClass, octave: i8) -> Self {
        Pitch { class, octave }
    }

    /// MIDI key number (C4 = 60), or `None` when the pitch falls outside 0-127.
    pub fn midi_key(self) -> Option<u8> {
        let key = (i16::from(self.octave) + 1) * 12 + i16::from(self.class.semitone());
        u8::try_from(key).ok().filter(|&k| k <= 127)
    }
}

impl FromStr for Pitch {
    type Err = PitchParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (class, carry, octave_str) = split_pitch_class(trimmed)
            .ok_or_else(|| PitchParseError::InvalidName(s.to_string()))?;
        let written: i8 = octave_str
            .parse()
            .map_err(|_| PitchParseError::InvalidName(s.to_string()))?;
        // "Cb4" sounds as B3: the accidental carries across the octave line.
        let octave = written
            .checked_add(carry)
            .ok_or_else(|| PitchParseError::OutOfRange(s.to_string()))?;
        let pitch = Pitch { class, octave };
        if pitch.midi_key().is_none() {
            return Err(PitchParseError::OutOfRange(s.to_string()));
        }
        Ok(pitch)
    }
}

impl TryFrom<String> for Pitch {
    type Error = PitchParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(p: Pitch) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pitch_classes() {
        assert_eq!("C".parse::<PitchClass>().unwrap(), PitchClass::C);
        assert_eq!("Eb".parse::<PitchClass>().unwrap(), PitchClass::E_FLAT);
        assert_eq!("D#".parse::<PitchClass>().unwrap(), PitchClass::E_FLAT);
        assert_eq!("bb".parse::<PitchClass>().unwrap(), PitchClass::B_FLAT);
        // Cb wraps around to B.
        assert_eq!("Cb".parse::<PitchClass>().unwrap(), PitchClass::B);
        assert!("H".parse::<PitchClass>().is_err());
        assert!("C4".parse::<PitchClass>().is_err());
        assert!("".parse::<PitchClass>().is_err());
    }

    #[test]
    fn spelling_is_canonical() {
        let pc: PitchClass = "D#".parse().unwrap();
        assert_eq!(pc.to_string(), "Eb");
        let pc: PitchClass = "Db".parse().unwrap();
        assert_eq!(pc.to_string(), "C#");
    }

    #[test]
    fn pitch_midi_keys() {
        assert_eq!("C4".parse::<Pitch>().unwrap().midi_key(), Some(60));
        assert_eq!("Eb4".parse::<Pitch>().unwrap().midi_key(), Some(63));
        assert_eq!("Bb4".parse::<Pitch>().unwrap().midi_key(), Some(70));
        assert_eq!("C5".parse::<Pitch>().unwrap().midi_key(), Some(72));
        assert_eq!("C-1".parse::<Pitch>().unwrap().midi_key(), Some(0));
        assert_eq!("G9".parse::<Pitch>().unwrap().midi_key(), Some(127));
    }

    #[test]
    fn accidentals_carry_across_the_octave() {
        assert_eq!("Cb4".parse::<Pitch>().unwrap().midi_key(), Some(59));
        assert_eq!("B#3".parse::<Pitch>().unwrap().midi_key(), Some(60));
        assert_eq!("Cbb4".parse::<Pitch>().unwrap().midi_key(), Some(58));
        assert_eq!("B##3".parse::<Pitch>().unwrap().midi_key(), Some(61));
        // Spelled back canonically in the sounding octave.
        assert_eq!("Cb4".parse::<Pitch>().unwrap().to_string(), "B3");
        assert_eq!("B#3".parse::<Pitch>().unwrap().to_string(), "C4");
        assert!(matches!(
            "Cb-1".parse::<Pitch>(),
            Err(PitchParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn pitch_rejects_bad_names() {
        assert!(matches!(
            "C".parse::<Pitch>(),
            Err(PitchParseError::InvalidName(_))
        ));
        assert!(matches!(
            "X4".parse::<Pitch>(),
            Err(PitchParseError::InvalidName(_))
        ));
        assert!(matches!(
            "A9".parse::<Pitch>(),
            Err(PitchParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn pitch_serializes_as_name() {
        let pitch: Pitch = "Bb4".parse().unwrap();
        let json = serde_json::to_string(&pitch).unwrap();
        assert_eq!(json, "\"Bb4\"");
        let restored: Pitch = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, pitch);
        assert!(serde_json::from_str::<Pitch>("\"Q4\"").is_err());
    }
}
