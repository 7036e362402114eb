// Generation requests and the validation that produces them.
//
// User input arrives as loosely typed `RawParameters` (strings and integers
// typed into a form or passed as CLI flags). `RawParameters::validate()` is
// the single place where that input is checked and classified:
//
// - genre strings become a `Genre` (listed styles match case-insensitively;
//   anything else is kept verbatim as `Genre::Unlisted`),
// - scale names are classified once into a `ScaleQuality`,
// - bpm and bar counts become range-checked newtypes,
// - section names (English or the Portuguese UI labels) become a `Section`.
//
// A `GenerationRequest` therefore cannot hold out-of-range values, and the
// generator never has to re-check or string-match anything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why raw parameters were rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("genre must not be empty")]
    EmptyGenre,
    #[error("scale must not be empty")]
    EmptyScale,
    #[error("bpm {0} is outside the allowed range {min}-{max}", min = Bpm::MIN, max = Bpm::MAX)]
    BpmOutOfRange(u32),
    #[error(
        "bar count {0} is outside the allowed range {min}-{max}",
        min = BarCount::MIN,
        max = BarCount::MAX
    )]
    BarsOutOfRange(u32),
    #[error("unknown section '{0}' (expected Intro, Verse or Chorus)")]
    UnknownSection(String),
}

// ---------------------------------------------------------------------------
// Genre
// ---------------------------------------------------------------------------

/// A musical style. The listed variants have built-in progressions; any other
/// name is carried as `Unlisted` and falls back to the default progression
/// unless a custom table defines it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Genre {
    Pop,
    Rock,
    Edm,
    Gospel,
    Unlisted(String),
}

impl Genre {
    /// Genres with built-in progressions, in menu order.
    pub const LISTED: [Genre; 4] = [Genre::Pop, Genre::Rock, Genre::Edm, Genre::Gospel];

    pub fn name(&self) -> &str {
        match self {
            Genre::Pop => "Pop",
            Genre::Rock => "Rock",
            Genre::Edm => "EDM",
            Genre::Gospel => "Gospel",
            Genre::Unlisted(name) => name,
        }
    }

    /// Classify a genre name. Never fails; unknown names become `Unlisted`.
    pub fn from_name(name: &str) -> Genre {
        let trimmed = name.trim();
        Genre::LISTED
            .iter()
            .find(|g| g.name().eq_ignore_ascii_case(trimmed))
            .cloned()
            .unwrap_or_else(|| Genre::Unlisted(trimmed.to_string()))
    }
}

impl From<String> for Genre {
    fn from(name: String) -> Self {
        Genre::from_name(&name)
    }
}

impl From<Genre> for String {
    fn from(genre: Genre) -> Self {
        genre.name().to_string()
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// The song section a sketch is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Intro,
    Verse,
    Chorus,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Intro, Section::Verse, Section::Chorus];

    pub fn name(self) -> &'static str {
        match self {
            Section::Intro => "Intro",
            Section::Verse => "Verse",
            Section::Chorus => "Chorus",
        }
    }
}

impl FromStr for Section {
    type Err = RequestError;

    /// Accepts the English names and the Portuguese labels ("Verso",
    /// "Refrão"), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intro" | "introdução" | "introducao" => Ok(Section::Intro),
            "verse" | "verso" => Ok(Section::Verse),
            "chorus" | "refrão" | "refrao" => Ok(Section::Chorus),
            _ => Err(RequestError::UnknownSection(s.to_string())),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

/// Which melody note set a scale uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleQuality {
    Major,
    /// Minor, modal, or any unrecognized scale name.
    Minor,
}

impl ScaleQuality {
    /// Names containing the case-sensitive token "Major" are major; every
    /// other name, recognized or not, is minor.
    pub fn classify(scale_name: &str) -> ScaleQuality {
        if scale_name.contains("Major") {
            ScaleQuality::Major
        } else {
            ScaleQuality::Minor
        }
    }
}

/// A scale name plus its quality, classified once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Scale {
    name: String,
    quality: ScaleQuality,
}

impl Scale {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let quality = ScaleQuality::classify(&name);
        Scale { name, quality }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quality(&self) -> ScaleQuality {
        self.quality
    }
}

impl From<String> for Scale {
    fn from(name: String) -> Self {
        Scale::new(name)
    }
}

impl From<Scale> for String {
    fn from(scale: Scale) -> Self {
        scale.name
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Numeric ranges
// ---------------------------------------------------------------------------

/// Tempo in quarter-note beats per minute, always within 60-180.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Bpm(u16);

impl Bpm {
    pub const MIN: u32 = 60;
    pub const MAX: u32 = 180;
    pub const DEFAULT: u32 = 120;

    pub fn new(bpm: u32) -> Result<Self, RequestError> {
        if (Self::MIN..=Self::MAX).contains(&bpm) {
            // The range check keeps this within u16.
            Ok(Bpm(bpm as u16))
        } else {
            Err(RequestError::BpmOutOfRange(bpm))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Microseconds per quarter note, as stored in a MIDI tempo event.
    pub fn micros_per_quarter(self) -> u32 {
        60_000_000 / u32::from(self.0)
    }
}

impl TryFrom<u32> for Bpm {
    type Error = RequestError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Bpm::new(value)
    }
}

impl From<Bpm> for u32 {
    fn from(bpm: Bpm) -> Self {
        u32::from(bpm.0)
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of bars in a sketch, always within 4-16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BarCount(u32);

impl BarCount {
    pub const MIN: u32 = 4;
    pub const MAX: u32 = 16;
    pub const DEFAULT: u32 = 8;

    pub fn new(bars: u32) -> Result<Self, RequestError> {
        if (Self::MIN..=Self::MAX).contains(&bars) {
            Ok(BarCount(bars))
        } else {
            Err(RequestError::BarsOutOfRange(bars))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for BarCount {
    type Error = RequestError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        BarCount::new(value)
    }
}

impl From<BarCount> for u32 {
    fn from(bars: BarCount) -> Self {
        bars.0
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Unvalidated user input, as typed into the CLI or web form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParameters {
    pub genre: String,
    pub scale: String,
    pub bpm: u32,
    pub bars: u32,
    pub section: String,
}

impl RawParameters {
    /// Check every field and classify the strings. The first failing field
    /// is reported.
    pub fn validate(&self) -> Result<GenerationRequest, RequestError> {
        if self.genre.trim().is_empty() {
            return Err(RequestError::EmptyGenre);
        }
        if self.scale.trim().is_empty() {
            return Err(RequestError::EmptyScale);
        }
        Ok(GenerationRequest {
            genre: Genre::from_name(&self.genre),
            scale: Scale::new(self.scale.trim()),
            bpm: Bpm::new(self.bpm)?,
            bar_count: BarCount::new(self.bars)?,
            section: self.section.parse()?,
        })
    }
}

/// A fully validated generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub genre: Genre,
    pub scale: Scale,
    pub bpm: Bpm,
    pub bar_count: BarCount,
    pub section: Section,
}

impl GenerationRequest {
    pub fn new(
        genre: Genre,
        scale: Scale,
        bpm: Bpm,
        bar_count: BarCount,
        section: Section,
    ) -> Self {
        GenerationRequest {
            genre,
            scale,
            bpm,
            bar_count,
            section,
        }
    }
}
