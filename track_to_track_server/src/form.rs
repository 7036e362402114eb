// URL-encoded form handling and HTML escaping.
//
// Both the query string of GET requests and the body of the POST /generate
// form use `application/x-www-form-urlencoded`. `parse_form` decodes either
// into a map (last value wins for repeated keys); `encode_form` builds the
// query strings used in download links. `raw_parameters` is the web side of
// the parameter source: it pulls the five generation fields out of a form
// and reports missing or non-numeric values before `RawParameters::validate`
// checks ranges.

use std::collections::BTreeMap;

use track_to_track_music::request::RequestError;
use track_to_track_music::{GenerationRequest, RawParameters};

pub type Form = BTreeMap<String, String>;

/// Why form fields could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("missing field '{0}'")]
    Missing(&'static str),
    #[error("field '{field}' must be a whole number, got '{value}'")]
    NotANumber { field: &'static str, value: String },
    #[error(transparent)]
    Invalid(#[from] RequestError),
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Percent-decode one component. '+' means space; malformed escapes are kept
/// literally.
pub fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode one component for a query string.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

pub fn parse_form(s: &str) -> Form {
    s.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

pub fn encode_form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn field<'a>(form: &'a Form, name: &'static str) -> Result<&'a str, ParamError> {
    form.get(name)
        .map(String::as_str)
        .ok_or(ParamError::Missing(name))
}

fn number(form: &Form, name: &'static str) -> Result<u32, ParamError> {
    let value = field(form, name)?;
    value.trim().parse().map_err(|_| ParamError::NotANumber {
        field: name,
        value: value.to_string(),
    })
}

/// Extract the generation fields (genre, scale, bpm, bars, section).
pub fn raw_parameters(form: &Form) -> Result<RawParameters, ParamError> {
    Ok(RawParameters {
        genre: field(form, "genre")?.to_string(),
        scale: field(form, "scale")?.to_string(),
        bpm: number(form, "bpm")?,
        bars: number(form, "bars")?,
        section: field(form, "section")?.to_string(),
    })
}

/// Extract and validate in one step.
pub fn request_from_form(form: &Form) -> Result<GenerationRequest, ParamError> {
    Ok(raw_parameters(form)?.validate()?)
}

/// Query string that reproduces a request (used for download links).
pub fn request_query(request: &GenerationRequest) -> String {
    let bpm = request.bpm.to_string();
    let bars = request.bar_count.get().to_string();
    encode_form(&[
        ("genre", request.genre.name()),
        ("scale", request.scale.name()),
        ("bpm", &bpm),
        ("bars", &bars),
        ("section", request.section.name()),
    ])
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
