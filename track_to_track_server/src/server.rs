// HTTP listener and request routing for the web front end.
//
// Architecture: one listener thread plus a thread per request.
//
// - **Listener thread** owns the `tiny_http::Server` and polls it with
//   `recv_timeout`, checking the `keep_running` flag between polls. Each
//   accepted request is handed to a fresh thread together with a shared
//   `Arc<AppState>`.
// - **Request threads** route on (method, path), run the generator, and
//   respond. POST /generate may also start a `SuggestionTask`; it is spawned
//   before generation so the network call overlaps the sketch and MIDI work,
//   and the page waits at most `suggest_timeout` for it afterwards.
//
// Shutdown: `ServerHandle::stop` clears `keep_running` and joins the
// listener. Request threads that are still running finish on their own.
//
// Routes:
//   GET  /              parameter form
//   POST /generate      result page (urlencoded form body)
//   GET  /download?...  MIDI file (audio/midi, attachment)
//   GET  /api/sketch?...  sketch as JSON
//   GET  /api/catalog   catalog as JSON
//
// Log lines go to stdout as `[server] METHOD path -> status`. The query
// string is left out, and the credential never appears in any log line.

use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tiny_http::{Header, Method, Request, Response};

use track_to_track_llm::{
    ApiKey, HttpCompletionBackend, IdeaPrompt, SuggestConfig, SuggestionOutcome, SuggestionTask,
};
use track_to_track_music::catalog::Catalog;
use track_to_track_music::midi::MidiEncoder;
use track_to_track_music::{GenerationRequest, Sketch, SketchTables, generate_sketch};

use crate::form::{self, Form, ParamError};
use crate::pages;

/// Largest accepted POST body. The form has seven short fields.
const MAX_BODY_BYTES: u64 = 16 * 1024;

/// How long the listener blocks before re-checking `keep_running`.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for starting the web server.
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub tables: SketchTables,
    pub suggest: SuggestConfig,
    /// Fallback credential for suggestions when the form leaves the field
    /// empty. Usually read from the environment.
    pub api_key: Option<ApiKey>,
    /// How long a result page waits for the suggestion once the MIDI is
    /// ready.
    pub suggest_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8501,
            tables: SketchTables::default(),
            suggest: SuggestConfig::default(),
            api_key: None,
            suggest_timeout: Duration::from_secs(15),
        }
    }
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// True once the listener thread has exited, e.g. after a fatal accept
    /// error.
    pub fn is_stopped(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Signal the server to stop and wait for the listener to exit.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Immutable state shared by every request thread.
struct AppState {
    tables: SketchTables,
    catalog: Catalog,
    encoder: MidiEncoder,
    suggest: SuggestConfig,
    api_key: Option<ApiKey>,
    suggest_timeout: Duration,
}

/// Start the server on a background thread. Returns a handle for stopping
/// it and the bound address (port 0 lets the OS pick one).
pub fn start_server(config: ServerConfig) -> io::Result<(ServerHandle, SocketAddr)> {
    let server = tiny_http::Server::http(format!("{}:{}", config.bind, config.port))
        .map_err(io::Error::other)?;
    let addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| io::Error::other("listener is not bound to an IP address"))?;

    let state = Arc::new(AppState {
        catalog: Catalog::from_tables(&config.tables),
        tables: config.tables,
        encoder: MidiEncoder::default(),
        suggest: config.suggest,
        api_key: config.api_key,
        suggest_timeout: config.suggest_timeout,
    });

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let thread = thread::spawn(move || {
        run_server(server, state, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Listener loop. Runs until `keep_running` is set to false.
fn run_server(server: tiny_http::Server, state: Arc<AppState>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => {
                let state = state.clone();
                thread::spawn(move || handle_request(&state, request));
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("[server] listener error: {e}");
                break;
            }
        }
    }
}

/// A response before it is turned into a `tiny_http::Response`.
struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    attachment: Option<String>,
}

impl Reply {
    fn html(status: u16, body: String) -> Self {
        Reply {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
            attachment: None,
        }
    }

    fn json(status: u16, value: &serde_json::Value) -> Self {
        Reply {
            status,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
            attachment: None,
        }
    }

    fn error_page(status: u16, message: &str) -> Self {
        Self::html(status, pages::error(status, message))
    }

    fn error_json(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }
}

fn handle_request(state: &AppState, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));

    let reply = match (&method, path) {
        (Method::Get, "/") => Reply::html(200, pages::index(&state.catalog)),
        (Method::Post, "/generate") => match read_form_body(&mut request) {
            Ok(form) => generate_page(state, &form),
            Err(reply) => reply,
        },
        (Method::Get, "/download") => download(state, &form::parse_form(query)),
        (Method::Get, "/api/sketch") => sketch_json(state, &form::parse_form(query)),
        (Method::Get, "/api/catalog") => match serde_json::to_value(&state.catalog) {
            Ok(value) => Reply::json(200, &value),
            Err(e) => Reply::error_json(500, &e.to_string()),
        },
        (_, "/" | "/generate" | "/download" | "/api/sketch" | "/api/catalog") => {
            Reply::error_page(405, &format!("{method} is not allowed on {path}"))
        }
        _ => Reply::error_page(404, &format!("no page at {path}")),
    };

    println!("[server] {method} {path} -> {}", reply.status);
    respond(request, reply);
}

fn respond(request: Request, reply: Reply) {
    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    if let Some(file_name) = reply.attachment {
        let value = format!("attachment; filename=\"{file_name}\"");
        if let Ok(header) = Header::from_bytes(&b"Content-Disposition"[..], value.as_bytes()) {
            response = response.with_header(header);
        }
    }
    if let Err(e) = request.respond(response) {
        eprintln!("[server] failed to send response: {e}");
    }
}

fn read_form_body(request: &mut Request) -> Result<Form, Reply> {
    let mut body = String::new();
    request
        .as_reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_string(&mut body)
        .map_err(|e| Reply::error_page(400, &format!("could not read form: {e}")))?;
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(Reply::error_page(413, "form body too large"));
    }
    Ok(form::parse_form(&body))
}

/// Validate and generate. Errors carry the validation message.
fn build(state: &AppState, form: &Form) -> Result<Sketch, ParamError> {
    let request = form::request_from_form(form)?;
    Ok(generate_sketch(&request, &state.tables))
}

fn start_suggestion(state: &AppState, request: &GenerationRequest, form: &Form) -> SuggestionTask {
    let api_key = form
        .get("api_key")
        .cloned()
        .and_then(ApiKey::new)
        .or_else(|| state.api_key.clone());
    let backend = Arc::new(HttpCompletionBackend::new(state.suggest.clone(), api_key));
    let prompt = IdeaPrompt::new(
        request.genre.name(),
        request.section.name(),
        u32::from(request.bpm),
        request.scale.name(),
    );
    SuggestionTask::spawn(backend, prompt)
}

fn generate_page(state: &AppState, form: &Form) -> Reply {
    let request = match form::request_from_form(form) {
        Ok(request) => request,
        Err(e) => return Reply::error_page(400, &e.to_string()),
    };

    let suggestion = form
        .get("suggest")
        .is_some_and(|v| v == "on")
        .then(|| start_suggestion(state, &request, form));

    let sketch = generate_sketch(&request, &state.tables);
    let midi = match state.encoder.encode(&sketch) {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Some(task) = &suggestion {
                task.cancel();
            }
            return Reply::error_page(500, &format!("MIDI encoding failed: {e}"));
        }
    };

    let outcome = suggestion.map(|task| task.wait(state.suggest_timeout));
    if let Some(message) = outcome.as_ref().and_then(SuggestionOutcome::status_message) {
        eprintln!("[suggest] {message}");
    }

    Reply::html(
        200,
        pages::result(
            &sketch,
            midi.len(),
            &form::request_query(&request),
            outcome.as_ref(),
        ),
    )
}

fn download(state: &AppState, form: &Form) -> Reply {
    let sketch = match build(state, form) {
        Ok(sketch) => sketch,
        Err(e) => return Reply::error_page(400, &e.to_string()),
    };
    match state.encoder.encode(&sketch) {
        Ok(bytes) => Reply {
            status: 200,
            content_type: "audio/midi",
            body: bytes,
            attachment: Some(sketch.file_name()),
        },
        Err(e) => Reply::error_page(500, &format!("MIDI encoding failed: {e}")),
    }
}

fn sketch_json(state: &AppState, form: &Form) -> Reply {
    let sketch = match build(state, form) {
        Ok(sketch) => sketch,
        Err(e) => return Reply::error_json(400, &e.to_string()),
    };
    match serde_json::to_value(&sketch) {
        Ok(value) => Reply::json(200, &value),
        Err(e) => Reply::error_json(500, &e.to_string()),
    }
}
