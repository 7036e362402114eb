// The choices offered to a user: genres, scales, sections and numeric ranges.
//
// Parameter sources (the CLI and the web form) present these lists and the
// ranges; validation itself lives in `request.rs`. Genres are read from the
// active tables so a custom table file shows up in the menus.

use serde::Serialize;

use crate::request::{BarCount, Bpm, Section};
use crate::tables::SketchTables;

/// Key names offered in the scale menu.
pub const SCALES: [&str; 7] = [
    "C Major", "G Major", "D Major", "F Major", "A Minor", "E Minor", "D Minor",
];

/// An inclusive integer range with a preselected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumericRange {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub genres: Vec<String>,
    pub scales: Vec<String>,
    pub sections: Vec<String>,
    pub bpm: NumericRange,
    pub bars: NumericRange,
}

impl Catalog {
    pub fn from_tables(tables: &SketchTables) -> Self {
        Catalog {
            genres: tables.genres().map(|g| g.name().to_string()).collect(),
            scales: SCALES.iter().map(|s| s.to_string()).collect(),
            sections: Section::ALL.iter().map(|s| s.name().to_string()).collect(),
            bpm: NumericRange {
                min: Bpm::MIN,
                max: Bpm::MAX,
                default: Bpm::DEFAULT,
            },
            bars: NumericRange {
                min: BarCount::MIN,
                max: BarCount::MAX,
                default: BarCount::DEFAULT,
            },
        }
    }
}
