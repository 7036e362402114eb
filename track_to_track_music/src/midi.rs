// MIDI output from sketches.
//
// Converts a `Sketch` into a Standard MIDI File (SMF) for download or DAW
// import. Output is SMF Format 1 with three tracks:
//
// - Track 0: conductor (track name = sketch title, tempo, 4/4 time signature)
// - Track 1: "Chords", each bar's chord tones stacked upward from C3
// - Track 2: "Melody", each bar's single melody note
//
// Bar i starts at tick i * 4 * ticks_per_quarter. Note lengths come straight
// from the bar events' beat durations; the encoder makes no timing decisions
// of its own. Events at the same tick are ordered note-offs first, so a
// repeated key is released before it is struck again.
//
// Uses the `midly` crate for MIDI writing. Encoding is deterministic: the
// same sketch always produces the same bytes.

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

use crate::sketch::{BEATS_PER_BAR, Sketch};

/// Default ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// MIDI key chord stacking starts from (C3).
const CHORD_BASE_KEY: u8 = 48;

/// Errors from encoding a sketch to MIDI.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("melody pitch {0} is outside the MIDI key range")]
    KeyOutOfRange(String),
    #[error("invalid encoder setting: {0}")]
    InvalidSetting(String),
    #[error("failed to write MIDI: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-track output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSettings {
    /// MIDI channel, 0-15.
    pub channel: u8,
    /// General MIDI program number, 0-127.
    pub program: u8,
    /// Note-on velocity, 1-127.
    pub velocity: u8,
}

impl TrackSettings {
    fn check(&self, track: &str) -> Result<(), EncodeError> {
        if self.channel > 15 {
            return Err(EncodeError::InvalidSetting(format!(
                "{track} channel {} (expected 0-15)",
                self.channel
            )));
        }
        if self.program > 127 {
            return Err(EncodeError::InvalidSetting(format!(
                "{track} program {} (expected 0-127)",
                self.program
            )));
        }
        if !(1..=127).contains(&self.velocity) {
            return Err(EncodeError::InvalidSetting(format!(
                "{track} velocity {} (expected 1-127)",
                self.velocity
            )));
        }
        Ok(())
    }
}

/// Sketch → SMF encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEncoder {
    pub ticks_per_quarter: u16,
    pub chords: TrackSettings,
    pub melody: TrackSettings,
}

impl Default for MidiEncoder {
    fn default() -> Self {
        MidiEncoder {
            ticks_per_quarter: TICKS_PER_QUARTER,
            // Acoustic grand piano.
            chords: TrackSettings {
                channel: 0,
                program: 0,
                velocity: 90,
            },
            // Lead 1 (square).
            melody: TrackSettings {
                channel: 1,
                program: 80,
                velocity: 100,
            },
        }
    }
}

/// A note event at an absolute tick, before delta conversion.
struct TimedEvent {
    tick: u32,
    /// 0 = note-off, 1 = note-on. Offs sort first at equal ticks.
    order: u8,
    message: MidiMessage,
}

impl MidiEncoder {
    /// Encode a sketch to SMF bytes.
    pub fn encode(&self, sketch: &Sketch) -> Result<Vec<u8>, EncodeError> {
        let smf = self.sketch_to_smf(sketch)?;
        let mut buf = Vec::new();
        smf.write_std(&mut buf)?;
        Ok(buf)
    }

    /// Convert a sketch to an in-memory SMF.
    pub fn sketch_to_smf<'a>(&self, sketch: &'a Sketch) -> Result<Smf<'a>, EncodeError> {
        if self.ticks_per_quarter == 0 || self.ticks_per_quarter > 0x7FFF {
            return Err(EncodeError::InvalidSetting(format!(
                "ticks per quarter {} (expected 1-32767)",
                self.ticks_per_quarter
            )));
        }
        self.chords.check("chord")?;
        self.melody.check("melody")?;

        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(self.ticks_per_quarter)),
        ));

        // Track 0: conductor
        let conductor: Track<'a> = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(sketch.title().as_bytes())),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(
                    sketch.bpm().micros_per_quarter(),
                ))),
            },
            TrackEvent {
                delta: u28::new(0),
                // 4/4, quarter-note denominator (2^2), 24 clocks per click,
                // 8 thirty-seconds per quarter.
                kind: TrackEventKind::Meta(MetaMessage::TimeSignature(BEATS_PER_BAR, 2, 24, 8)),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ];
        smf.tracks.push(conductor);

        let tpq = u32::from(self.ticks_per_quarter);

        let mut chord_events = Vec::new();
        let mut melody_events = Vec::new();
        for event in sketch.events() {
            let start = event.start_beat() * tpq;

            let chord_end = start + u32::from(event.chord.beats) * tpq;
            for key in event.chord.chord.stacked_keys(CHORD_BASE_KEY) {
                push_note(
                    &mut chord_events,
                    key,
                    self.chords.velocity,
                    start,
                    chord_end,
                );
            }

            let key = event
                .melody
                .pitch
                .midi_key()
                .ok_or_else(|| EncodeError::KeyOutOfRange(event.melody.pitch.to_string()))?;
            let melody_end = start + u32::from(event.melody.beats) * tpq;
            push_note(
                &mut melody_events,
                key,
                self.melody.velocity,
                start,
                melody_end,
            );
        }

        smf.tracks.push(build_track("Chords", self.chords, chord_events));
        smf.tracks.push(build_track("Melody", self.melody, melody_events));

        Ok(smf)
    }
}

fn push_note(events: &mut Vec<TimedEvent>, key: u8, velocity: u8, start: u32, end: u32) {
    events.push(TimedEvent {
        tick: start,
        order: 1,
        message: MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(velocity),
        },
    });
    events.push(TimedEvent {
        tick: end,
        order: 0,
        message: MidiMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(0),
        },
    });
}

/// Build one instrument track: name, program change, then the note events
/// sorted by tick and converted to deltas.
fn build_track(
    name: &'static str,
    settings: TrackSettings,
    mut events: Vec<TimedEvent>,
) -> Track<'static> {
    let channel = u4::new(settings.channel);
    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(settings.program),
                },
            },
        },
    ];

    // Stable sort keeps insertion order for chord tones at the same tick.
    events.sort_by_key(|e| (e.tick, e.order));

    let mut last_tick = 0;
    for event in events {
        track.push(TrackEvent {
            delta: u28::new(event.tick - last_tick),
            kind: TrackEventKind::Midi {
                channel,
                message: event.message,
            },
        });
        last_tick = event.tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

/// Encode a sketch with the default encoder and write it to a file.
/// Returns the number of bytes written.
pub fn write_midi(sketch: &Sketch, path: &Path) -> Result<usize, EncodeError> {
    let bytes = MidiEncoder::default().encode(sketch)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_sketch;
    use crate::request::{BarCount, Bpm, GenerationRequest, Genre, Scale, Section};
    use crate::tables::SketchTables;

    fn pop_sketch(bars: u32) -> Sketch {
        let request = GenerationRequest::new(
            Genre::Pop,
            Scale::new("C Major"),
            Bpm::new(120).unwrap(),
            BarCount::new(bars).unwrap(),
            Section::Verse,
        );
        generate_sketch(&request, &SketchTables::default())
    }

    /// Collect (absolute tick, key, is_note_on) for the note events of a track.
    fn notes(track: &Track<'_>) -> Vec<(u32, u8, bool)> {
        let mut tick = 0;
        let mut out = Vec::new();
        for event in track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = event.kind {
                match message {
                    MidiMessage::NoteOn { key, .. } => out.push((tick, key.as_int(), true)),
                    MidiMessage::NoteOff { key, .. } => out.push((tick, key.as_int(), false)),
                    _ => {}
                }
            }
        }
        out
    }

    #[test]
    fn sketch_to_smf_has_three_tracks() {
        let sketch = pop_sketch(4);
        let smf = MidiEncoder::default().sketch_to_smf(&sketch).unwrap();
        assert_eq!(smf.tracks.len(), 3);
        assert_eq!(smf.header.format, Format::Parallel);
    }

    #[test]
    fn melody_notes_last_one_beat() {
        let sketch = pop_sketch(4);
        let smf = MidiEncoder::default().sketch_to_smf(&sketch).unwrap();
        let melody = notes(&smf.tracks[2]);
        assert_eq!(
            melody,
            vec![
                (0, 60, true),
                (480, 60, false),
                (1920, 64, true),
                (2400, 64, false),
                (3840, 67, true),
                (4320, 67, false),
                (5760, 72, true),
                (6240, 72, false),
            ]
        );
    }

    #[test]
    fn chords_fill_the_bar_and_release_before_restrike() {
        let sketch = pop_sketch(4);
        let smf = MidiEncoder::default().sketch_to_smf(&sketch).unwrap();
        let chords = notes(&smf.tracks[1]);
        // Bar 0: C E G on at 0.
        assert_eq!(&chords[..3], &[(0, 48, true), (0, 52, true), (0, 55, true)]);
        // At tick 1920 the C chord is released before F A C is struck.
        assert_eq!(
            &chords[3..9],
            &[
                (1920, 48, false),
                (1920, 52, false),
                (1920, 55, false),
                (1920, 53, true),
                (1920, 57, true),
                (1920, 60, true),
            ]
        );
        // Last event releases the final chord at the end of bar 4.
        assert_eq!(chords.last().map(|n| n.0), Some(4 * 1920));
    }

    #[test]
    fn rejects_bad_settings() {
        let sketch = pop_sketch(4);
        let mut encoder = MidiEncoder::default();
        encoder.melody.channel = 16;
        assert!(matches!(
            encoder.encode(&sketch),
            Err(EncodeError::InvalidSetting(_))
        ));

        let mut encoder = MidiEncoder::default();
        encoder.ticks_per_quarter = 0;
        assert!(matches!(
            encoder.encode(&sketch),
            Err(EncodeError::InvalidSetting(_))
        ));
    }
}
