// Track to Track Music: chord-and-melody sketch generator
//
// Turns a genre, scale, tempo, bar count and song section into a short
// multi-bar sketch (one chord and one melody note per bar) and renders it
// as a Standard MIDI File.
//
// Architecture:
// - pitch.rs: Pitch-class and octave-qualified pitch names ("Eb", "C4")
// - chord.rs: Chord definitions (symbol + tones) and mechanical stacking
// - request.rs: Raw user parameters, validation, and the typed request
// - catalog.rs: Menu choices (genres, scales, sections, numeric ranges)
// - tables.rs: Immutable progression and melody tables (built-in or JSON)
// - generator.rs: The pure request -> sketch expansion
// - sketch.rs: Sketch / bar event types, chart text, download file name
// - midi.rs: SMF output via `midly`
//
// Generation is deterministic and infallible once a request has been
// validated; only table loading, validation and MIDI writing return errors.

pub mod catalog;
pub mod chord;
pub mod generator;
pub mod midi;
pub mod pitch;
pub mod request;
pub mod sketch;
pub mod tables;

pub use generator::generate_sketch;
pub use request::{GenerationRequest, RawParameters, RequestError};
pub use sketch::Sketch;
pub use tables::SketchTables;
