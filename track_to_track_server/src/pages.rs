// HTML pages for the web front end.
//
// Plain server-rendered HTML, no scripts: the index form, the result page
// shown after POST /generate, and a small error page. Every user-supplied
// string passes through `escape_html`.

use std::fmt::Write as _;

use track_to_track_llm::SuggestionOutcome;
use track_to_track_music::Sketch;
use track_to_track_music::catalog::Catalog;

use crate::form::escape_html;

const STYLE: &str = "body{font-family:sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin:.6rem 0 .2rem}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.25rem .6rem}\
.idea{white-space:pre-wrap;background:#f4f4f4;padding:.8rem}\
.warn{color:#9a5b00}.error{color:#b00020}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>\n{body}\n</body></html>\n",
        title = escape_html(title),
    )
}

fn options(values: &[String], selected: &str) -> String {
    let mut out = String::new();
    for value in values {
        let mark = if value == selected { " selected" } else { "" };
        let value = escape_html(value);
        let _ = write!(out, "<option value=\"{value}\"{mark}>{value}</option>");
    }
    out
}

/// The parameter form.
pub fn index(catalog: &Catalog) -> String {
    let mut body = String::new();
    body.push_str("<h1>Track to Track</h1>\n");
    body.push_str("<form method=\"post\" action=\"/generate\">\n");
    let _ = write!(
        body,
        "<label>Genre</label><select name=\"genre\">{}</select>\n",
        options(&catalog.genres, catalog.genres.first().map_or("", String::as_str))
    );
    let _ = write!(
        body,
        "<label>Scale</label><select name=\"scale\">{}</select>\n",
        options(&catalog.scales, catalog.scales.first().map_or("", String::as_str))
    );
    let _ = write!(
        body,
        "<label>Section</label><select name=\"section\">{}</select>\n",
        options(&catalog.sections, "Verse")
    );
    let _ = write!(
        body,
        "<label>BPM ({min}-{max})</label>\
         <input type=\"number\" name=\"bpm\" min=\"{min}\" max=\"{max}\" value=\"{default}\">\n",
        min = catalog.bpm.min,
        max = catalog.bpm.max,
        default = catalog.bpm.default,
    );
    let _ = write!(
        body,
        "<label>Bars ({min}-{max})</label>\
         <input type=\"number\" name=\"bars\" min=\"{min}\" max=\"{max}\" value=\"{default}\">\n",
        min = catalog.bars.min,
        max = catalog.bars.max,
        default = catalog.bars.default,
    );
    body.push_str(
        "<label><input type=\"checkbox\" name=\"suggest\" value=\"on\"> \
         Ask a language model for an idea</label>\n\
         <label>API key (only used for this request, never stored)</label>\
         <input type=\"password\" name=\"api_key\" autocomplete=\"off\">\n\
         <p><button type=\"submit\">Generate MIDI</button></p>\n</form>\n",
    );
    page("Track to Track", &body)
}

/// The result page: parameters, chord chart, suggestion, download link.
pub fn result(
    sketch: &Sketch,
    midi_size: usize,
    download_query: &str,
    suggestion: Option<&SuggestionOutcome>,
) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{} generated</h1>", escape_html(sketch.title()));
    let _ = writeln!(
        body,
        "<p>Scale: {} &middot; BPM: {} &middot; Bars: {} &middot; {:.1}s</p>",
        escape_html(sketch.scale_name()),
        sketch.bpm(),
        sketch.bar_count(),
        sketch.duration_seconds(),
    );

    body.push_str("<table><tr><th>Bar</th><th>Chord</th><th>Tones</th><th>Melody</th></tr>\n");
    for event in sketch.events() {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            event.bar_index + 1,
            escape_html(&event.chord.chord.symbol),
            event.chord.chord.tone_names().join(" "),
            event.melody.pitch,
        );
    }
    body.push_str("</table>\n");

    let _ = writeln!(
        body,
        "<p><a href=\"/download?{}\" download=\"{}\">Download {} ({} bytes)</a> \
         &mdash; open it in your DAW.</p>",
        escape_html(download_query),
        escape_html(&sketch.file_name()),
        escape_html(&sketch.file_name()),
        midi_size,
    );

    match suggestion {
        Some(SuggestionOutcome::Ready(text)) => {
            let _ = writeln!(
                body,
                "<h2>Idea</h2><div class=\"idea\">{}</div>",
                escape_html(text)
            );
        }
        Some(other) => {
            if let Some(message) = other.status_message() {
                let _ = writeln!(body, "<p class=\"warn\">{}</p>", escape_html(&message));
            }
        }
        None => {}
    }

    body.push_str("<p><a href=\"/\">Back</a></p>");
    page(sketch.title(), &body)
}

/// A short error page.
pub fn error(status: u16, message: &str) -> String {
    let body = format!(
        "<h1>Error {status}</h1><p class=\"error\">{}</p><p><a href=\"/\">Back</a></p>",
        escape_html(message)
    );
    page("Error", &body)
}
