// Static lookup tables: chord progressions per genre and melody note sets.
//
// `SketchTables` is plain immutable data, built once at startup and then
// only read. The built-in tables come from `Default`; a custom table set can
// be loaded from JSON (same shape as `serde_json::to_string_pretty` of the
// defaults, which the `tables` CLI subcommand prints).
//
// Loading validates the invariants the generator relies on: every
// progression (including the default) and every note set is non-empty, and
// every chord has at least one tone. After that the generator's modulo
// indexing is always defined and generation cannot fail.
//
// Tables are shared between concurrent server requests behind an `Arc`;
// nothing here has interior mutability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::chord::Chord;
use crate::pitch::{Pitch, PitchClass};
use crate::request::{Genre, ScaleQuality};

/// Errors from loading or validating a table set.
#[derive(Debug, thiserror::Error)]
pub enum TablesError {
    #[error("failed to read tables from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid tables JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("progression for '{0}' is empty")]
    EmptyProgression(String),
    #[error("chord {index} of the '{genre}' progression has no tones")]
    EmptyChord { genre: String, index: usize },
    #[error("{0:?} melody note set is empty")]
    EmptyNoteSet(ScaleQuality),
}

/// Melody notes cycled through, one per bar, by scale quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MelodyNoteSets {
    pub major: Vec<Pitch>,
    pub minor: Vec<Pitch>,
}

impl MelodyNoteSets {
    pub fn for_quality(&self, quality: ScaleQuality) -> &[Pitch] {
        match quality {
            ScaleQuality::Major => &self.major,
            ScaleQuality::Minor => &self.minor,
        }
    }
}

impl Default for MelodyNoteSets {
    fn default() -> Self {
        MelodyNoteSets {
            // C4 E4 G4 C5
            major: vec![
                Pitch::new(PitchClass::C, 4),
                Pitch::new(PitchClass::E, 4),
                Pitch::new(PitchClass::G, 4),
                Pitch::new(PitchClass::C, 5),
            ],
            // C4 Eb4 G4 Bb4
            minor: vec![
                Pitch::new(PitchClass::C, 4),
                Pitch::new(PitchClass::E_FLAT, 4),
                Pitch::new(PitchClass::G, 4),
                Pitch::new(PitchClass::B_FLAT, 4),
            ],
        }
    }
}

/// Chord progressions and melody note sets used by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchTables {
    progressions: BTreeMap<Genre, Vec<Chord>>,
    default_progression: Vec<Chord>,
    melody: MelodyNoteSets,
}

fn triad(symbol: &str, root: PitchClass, third: PitchClass, fifth: PitchClass) -> Chord {
    Chord::new(symbol, vec![root, third, fifth])
}

fn seventh(symbol: &str, tones: [PitchClass; 4]) -> Chord {
    Chord::new(symbol, tones.to_vec())
}

/// C - F - G - C, used for any genre without a table entry.
fn default_progression() -> Vec<Chord> {
    use PitchClass as P;
    vec![
        triad("C", P::C, P::E, P::G),
        triad("F", P::F, P::A, P::C),
        triad("G", P::G, P::B, P::D),
        triad("C", P::C, P::E, P::G),
    ]
}

impl Default for SketchTables {
    fn default() -> Self {
        use PitchClass as P;
        let mut progressions = BTreeMap::new();

        // I - IV - V - I
        progressions.insert(Genre::Pop, default_progression());

        // I - bVII - IV - I
        progressions.insert(
            Genre::Rock,
            vec![
                triad("C", P::C, P::E, P::G),
                triad("Bb", P::B_FLAT, P::D, P::F),
                triad("F", P::F, P::A, P::C),
                triad("C", P::C, P::E, P::G),
            ],
        );

        // vi - IV - I - V
        progressions.insert(
            Genre::Edm,
            vec![
                triad("Am", P::A, P::C, P::E),
                triad("F", P::F, P::A, P::C),
                triad("C", P::C, P::E, P::G),
                triad("G", P::G, P::B, P::D),
            ],
        );

        // Imaj7 - vi7 - ii7 - V7
        progressions.insert(
            Genre::Gospel,
            vec![
                seventh("Cmaj7", [P::C, P::E, P::G, P::B]),
                seventh("Am7", [P::A, P::C, P::E, P::G]),
                seventh("Dm7", [P::D, P::F, P::A, P::C]),
                seventh("G7", [P::G, P::B, P::D, P::F]),
            ],
        );

        SketchTables {
            progressions,
            default_progression: default_progression(),
            melody: MelodyNoteSets::default(),
        }
    }
}

impl SketchTables {
    /// Load and validate a table set from a JSON file.
    pub fn load(path: &Path) -> Result<Self, TablesError> {
        let contents = std::fs::read_to_string(path).map_err(|source| TablesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a table set from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, TablesError> {
        let tables: SketchTables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn to_json_pretty(&self) -> Result<String, TablesError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), TablesError> {
        let named = self
            .progressions
            .iter()
            .map(|(genre, prog)| (genre.name(), prog.as_slice()));
        let all = named.chain(std::iter::once(("default", self.default_progression.as_slice())));
        for (name, progression) in all {
            if progression.is_empty() {
                return Err(TablesError::EmptyProgression(name.to_string()));
            }
            if let Some(index) = progression.iter().position(|c| c.tones.is_empty()) {
                return Err(TablesError::EmptyChord {
                    genre: name.to_string(),
                    index,
                });
            }
        }
        if self.melody.major.is_empty() {
            return Err(TablesError::EmptyNoteSet(ScaleQuality::Major));
        }
        if self.melody.minor.is_empty() {
            return Err(TablesError::EmptyNoteSet(ScaleQuality::Minor));
        }
        Ok(())
    }

    /// The progression for a genre, or the default progression when the
    /// genre has no entry. Never empty.
    ///
    /// Custom genre names match case-insensitively, like the listed ones.
    pub fn progression_for(&self, genre: &Genre) -> &[Chord] {
        if let Some(progression) = self.progressions.get(genre) {
            return progression;
        }
        if let Genre::Unlisted(name) = genre {
            let folded = self
                .progressions
                .iter()
                .find(|(key, _)| key.name().eq_ignore_ascii_case(name));
            if let Some((_, progression)) = folded {
                return progression;
            }
        }
        &self.default_progression
    }

    pub fn default_progression(&self) -> &[Chord] {
        &self.default_progression
    }

    /// The melody note set for a scale quality. Never empty.
    pub fn melody_for(&self, quality: ScaleQuality) -> &[Pitch] {
        self.melody.for_quality(quality)
    }

    /// Genres that have their own progression, in table order.
    pub fn genres(&self) -> impl Iterator<Item = &Genre> {
        self.progressions.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_listed_genres() {
        let tables = SketchTables::default();
        for genre in Genre::LISTED.iter() {
            assert!(
                tables.progressions.contains_key(genre),
                "missing progression for {genre}"
            );
        }
        assert!(tables.validate().is_ok());
    }

    #[test]
    fn unknown_genre_uses_default_progression() {
        let tables = SketchTables::default();
        let prog = tables.progression_for(&Genre::Unlisted("Polka".into()));
        let symbols: Vec<&str> = prog.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["C", "F", "G", "C"]);
    }

    #[test]
    fn default_tables_roundtrip_through_json() {
        let tables = SketchTables::default();
        let json = tables.to_json_pretty().unwrap();
        assert!(json.contains("\"EDM\""));
        assert!(json.contains("\"Eb4\""));
        let restored = SketchTables::from_json_str(&json).unwrap();
        assert_eq!(restored, tables);
    }

    #[test]
    fn custom_genre_loads_from_json() {
        let json = r#"{
            "progressions": {
                "Funk": [
                    {"symbol": "E7", "tones": ["E", "G#", "B", "D"]},
                    {"symbol": "A7", "tones": ["A", "C#", "E", "G"]}
                ]
            },
            "default_progression": [{"symbol": "C", "tones": ["C", "E", "G"]}],
            "melody": {"major": ["E4", "G#4"], "minor": ["E4", "G4"]}
        }"#;
        let tables = SketchTables::from_json_str(json).unwrap();
        let funk = tables.progression_for(&Genre::from_name("Funk"));
        assert_eq!(funk[1].symbol, "A7");
        for spelling in ["funk", "FUNK", " fUnK "] {
            let funk = tables.progression_for(&Genre::from_name(spelling));
            assert_eq!(funk.len(), 2, "{spelling:?} should find the Funk progression");
        }
        assert_eq!(tables.progression_for(&Genre::from_name("Funky")).len(), 1);
        // Pop is not in this table, so it falls back.
        assert_eq!(tables.progression_for(&Genre::Pop).len(), 1);
    }

    #[test]
    fn rejects_empty_progression() {
        let json = r#"{
            "progressions": {"Pop": []},
            "default_progression": [{"symbol": "C", "tones": ["C"]}],
            "melody": {"major": ["C4"], "minor": ["C4"]}
        }"#;
        let err = SketchTables::from_json_str(json).unwrap_err();
        assert!(matches!(err, TablesError::EmptyProgression(ref g) if g == "Pop"));
    }

    #[test]
    fn rejects_empty_chord_and_note_set() {
        let json = r#"{
            "progressions": {},
            "default_progression": [{"symbol": "N.C.", "tones": []}],
            "melody": {"major": ["C4"], "minor": ["C4"]}
        }"#;
        let err = SketchTables::from_json_str(json).unwrap_err();
        assert!(matches!(err, TablesError::EmptyChord { index: 0, .. }));

        let json = r#"{
            "progressions": {},
            "default_progression": [{"symbol": "C", "tones": ["C"]}],
            "melody": {"major": ["C4"], "minor": []}
        }"#;
        let err = SketchTables::from_json_str(json).unwrap_err();
        assert!(matches!(err, TablesError::EmptyNoteSet(ScaleQuality::Minor)));
    }

    #[test]
    fn rejects_bad_pitch_names() {
        let json = r#"{
            "progressions": {},
            "default_progression": [{"symbol": "C", "tones": ["C"]}],
            "melody": {"major": ["C4"], "minor": ["Q4"]}
        }"#;
        assert!(matches!(
            SketchTables::from_json_str(json),
            Err(TablesError::Json(_))
        ));
    }
}
