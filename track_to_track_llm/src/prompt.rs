// Prompt construction for chord/melody idea suggestions.
//
// The prompt is built only from display strings (genre, section, bpm, scale)
// so this crate stays independent of the music crate's types. The reply is
// shown to the user as-is and never parsed back into structured data.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaPrompt {
    pub genre: String,
    pub section: String,
    pub bpm: u32,
    pub scale: String,
}

impl IdeaPrompt {
    pub fn new(
        genre: impl Into<String>,
        section: impl Into<String>,
        bpm: u32,
        scale: impl Into<String>,
    ) -> Self {
        IdeaPrompt {
            genre: genre.into(),
            section: section.into(),
            bpm,
            scale: scale.into(),
        }
    }

    /// Instructions sent as the system message.
    pub fn system_text(&self) -> &'static str {
        "You are a session musician helping a producer sketch song ideas. \
         Answer in plain text, at most six short lines, no preamble."
    }

    /// The user message describing what to suggest.
    pub fn user_text(&self) -> String {
        format!(
            "Suggest a chord progression and a simple melody idea for the {section} \
             of a {genre} track at {bpm} BPM in {scale}. Name the chords bar by bar, \
             describe the melody contour in one sentence, and give one production tip.",
            section = self.section,
            genre = self.genre,
            bpm = self.bpm,
            scale = self.scale,
        )
    }
}
