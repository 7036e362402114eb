// The sketch generator: expands a validated request into one bar event per
// bar.
//
// For bar i the chord is progression[i mod L] held for a whole bar and the
// melody note is note_set[i mod N] held for one beat. The progression comes
// from the genre (default C - F - G - C when the genre has no entry) and the
// note set from the scale quality classified at validation time.
//
// This is a pure function of the request and the tables: no I/O, no
// randomness, no failure path. Identical inputs give identical sketches.

use crate::request::GenerationRequest;
use crate::sketch::{BEATS_PER_BAR, BarEvent, ChordEvent, MelodyEvent, Sketch};
use crate::tables::SketchTables;

/// Melody notes last one beat.
pub const MELODY_BEATS: u8 = 1;

/// Chords fill the whole bar.
pub const CHORD_BEATS: u8 = BEATS_PER_BAR;

/// Generate a sketch of exactly `request.bar_count` bars.
pub fn generate_sketch(request: &GenerationRequest, tables: &SketchTables) -> Sketch {
    let progression = tables.progression_for(&request.genre);
    let notes = tables.melody_for(request.scale.quality());

    let events = (0..request.bar_count.get())
        .map(|i| {
            let bar = i as usize;
            BarEvent {
                bar_index: i,
                chord: ChordEvent {
                    chord: progression[bar % progression.len()].clone(),
                    beats: CHORD_BEATS,
                },
                melody: MelodyEvent {
                    pitch: notes[bar % notes.len()],
                    beats: MELODY_BEATS,
                },
            }
        })
        .collect();

    Sketch::new(
        request.genre.clone(),
        request.section,
        request.bpm,
        request.scale.name().to_string(),
        events,
    )
}
