// track_to_track_server: a small web front end for the sketch generator.
//
// Serves an HTML form, renders the result page (chord chart, optional idea
// suggestion, download link) and streams the MIDI file. The same sketch can
// be fetched as JSON for scripting.
//
// Module overview:
// - `form.rs`:   urlencoded form parsing, query building, HTML escaping,
//                form fields -> `GenerationRequest`.
// - `pages.rs`:  HTML for the index, result and error pages.
// - `server.rs`: `tiny_http` listener thread, routing, `ServerConfig` and
//                `ServerHandle`.
//
// Nothing is persisted between requests. A download link carries the full
// parameter set and the sketch is regenerated on demand, which is cheap and
// deterministic. A credential typed into the form is used for that one
// request only.

pub mod form;
pub mod pages;
pub mod server;

pub use server::{ServerConfig, ServerHandle, start_server};
