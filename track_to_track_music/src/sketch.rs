// The generator's output: one chord + one melody note per bar.
//
// A `Sketch` is created only by `generator::generate_sketch` and is never
// mutated afterwards; fields are private and exposed through accessors.
// Durations are in quarter-note beats and, together with the tempo, are all
// the MIDI encoder needs to compute absolute timing. Time is always 4/4.

use serde::Serialize;
use std::fmt::Write as _;

use crate::chord::Chord;
use crate::pitch::Pitch;
use crate::request::{Bpm, Genre, Section};

/// Beats per bar. Every sketch is in 4/4.
pub const BEATS_PER_BAR: u8 = 4;

/// A chord held for `beats` quarter notes from the start of its bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChordEvent {
    pub chord: Chord,
    pub beats: u8,
}

/// A single melody note played for `beats` quarter notes from the start of
/// its bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MelodyEvent {
    pub pitch: Pitch,
    pub beats: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarEvent {
    pub bar_index: u32,
    pub chord: ChordEvent,
    pub melody: MelodyEvent,
}

impl BarEvent {
    /// Offset of this bar from the start of the sketch, in beats.
    pub fn start_beat(&self) -> u32 {
        self.bar_index * u32::from(BEATS_PER_BAR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sketch {
    title: String,
    genre: Genre,
    section: Section,
    bpm: Bpm,
    scale_name: String,
    events: Vec<BarEvent>,
}

impl Sketch {
    pub(crate) fn new(
        genre: Genre,
        section: Section,
        bpm: Bpm,
        scale_name: String,
        events: Vec<BarEvent>,
    ) -> Self {
        Sketch {
            title: format!("{} - {}", genre.name(), section.name()),
            genre,
            section,
            bpm,
            scale_name,
            events,
        }
    }

    /// "{genre} - {section}", e.g. "Pop - Verse".
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn genre(&self) -> &Genre {
        &self.genre
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn bpm(&self) -> Bpm {
        self.bpm
    }

    pub fn scale_name(&self) -> &str {
        &self.scale_name
    }

    /// Bar events in order; `events()[i].bar_index == i`.
    pub fn events(&self) -> &[BarEvent] {
        &self.events
    }

    pub fn bar_count(&self) -> usize {
        self.events.len()
    }

    pub fn total_beats(&self) -> u32 {
        self.events.len() as u32 * u32::from(BEATS_PER_BAR)
    }

    pub fn duration_seconds(&self) -> f64 {
        f64::from(self.total_beats()) * 60.0 / f64::from(self.bpm.get())
    }

    /// Download file name: "{genre}_{section}.mid", lowercased, with anything
    /// other than ASCII letters, digits, '-' and '_' replaced by '_'.
    pub fn file_name(&self) -> String {
        let stem: String = format!("{}_{}", self.genre.name(), self.section.name())
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{stem}.mid")
    }

    /// Plain-text chord chart, one line per bar.
    pub fn chart(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} | {} | {} BPM | {} bars",
            self.title,
            self.scale_name,
            self.bpm,
            self.events.len()
        );
        for event in &self.events {
            let tones = format!("{{{}}}", event.chord.chord.tone_names().join(", "));
            let melody = event.melody.pitch.to_string();
            let _ = writeln!(
                out,
                "  bar {:>2}  {:<6} {:<16} melody {:<4} ({} beat{})",
                event.bar_index + 1,
                event.chord.chord.symbol,
                tones,
                melody,
                event.melody.beats,
                if event.melody.beats == 1 { "" } else { "s" },
            );
        }
        out
    }
}
