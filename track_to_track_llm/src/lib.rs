// track_to_track_llm: chord/melody idea suggestions from a language model.
//
// The suggester is purely informational: it turns (genre, section, bpm,
// scale) into a prompt, asks a completion service for a short free-text
// idea, and hands the text back for display. Nothing it returns feeds into
// sketch generation, and every failure is recoverable.
//
// Module overview:
// - `prompt.rs`:   `IdeaPrompt` and the system/user message text.
// - `backend.rs`:  `CompletionBackend` trait, the HTTP chat-completions
//                  implementation, `ApiKey`, `SuggestConfig`, `SuggestError`.
// - `task.rs`:     `SuggestionTask`, runs a backend call on its own thread
//                  with poll / timed wait / cancel, so callers never block
//                  sketch or MIDI generation on the network.
//
// No dependency on the music crate: the prompt takes display strings.

pub mod backend;
pub mod prompt;
pub mod task;

pub use backend::{
    API_KEY_ENV, ApiKey, CompletionBackend, HttpCompletionBackend, SuggestConfig, SuggestError,
};
pub use prompt::IdeaPrompt;
pub use task::{SuggestionOutcome, SuggestionTask};
