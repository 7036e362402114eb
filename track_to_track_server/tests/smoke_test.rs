// End-to-end smoke tests for the web front end.
//
// Each test starts a real server on port 0 and talks to it with raw HTTP/1.1
// over `std::net::TcpStream` (one request per connection, `Connection:
// close`). The suggestion path is pointed at a one-shot `tiny_http` fake
// completion endpoint, so no test touches the network beyond localhost.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use track_to_track_llm::{ApiKey, SuggestConfig};
use track_to_track_server::{ServerConfig, ServerHandle, start_server};

struct HttpReply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpReply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn start(config: ServerConfig) -> (ServerHandle, SocketAddr) {
    let config = ServerConfig { port: 0, ..config };
    start_server(config).unwrap()
}

fn send(addr: SocketAddr, method: &str, target: &str, body: &str) -> HttpReply {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    let request = format!(
        "{method} {target} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header block");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap();
    let status = status_line.split(' ').nth(1).unwrap().parse().unwrap();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    HttpReply {
        status,
        headers,
        body,
    }
}

const POP_VERSE: &str = "genre=Pop&scale=C+Major&bpm=120&bars=4&section=Verse";

#[test]
fn index_page_lists_choices() {
    let (handle, addr) = start(ServerConfig::default());
    let reply = send(addr, "GET", "/", "");
    assert_eq!(reply.status, 200);
    assert!(reply.header("Content-Type").unwrap().starts_with("text/html"));
    let html = reply.text();
    assert!(html.contains("action=\"/generate\""));
    assert!(html.contains("<option value=\"EDM\">EDM</option>"));
    handle.stop();
}

#[test]
fn generate_then_download() {
    let (handle, addr) = start(ServerConfig::default());

    let reply = send(addr, "POST", "/generate", POP_VERSE);
    assert_eq!(reply.status, 200);
    let html = reply.text();
    assert!(html.contains("Pop - Verse generated"));
    assert!(html.contains("<td>G</td><td>G B D</td><td>G4</td>"));
    assert!(html.contains("href=\"/download?genre=Pop&amp;scale=C+Major"));

    let reply = send(addr, "GET", &format!("/download?{POP_VERSE}"), "");
    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("Content-Type"), Some("audio/midi"));
    assert_eq!(
        reply.header("Content-Disposition"),
        Some("attachment; filename=\"pop_verse.mid\"")
    );
    assert_eq!(&reply.body[..4], b"MThd");
    handle.stop();
}

#[test]
fn api_returns_json() {
    let (handle, addr) = start(ServerConfig::default());

    let reply = send(addr, "GET", "/api/catalog", "");
    assert_eq!(reply.status, 200);
    let catalog: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(catalog["bpm"]["min"], 60);
    assert_eq!(catalog["sections"][2], "Chorus");

    let reply = send(
        addr,
        "GET",
        "/api/sketch?genre=Bossa&scale=X+Minor&bpm=90&bars=5&section=Intro",
        "",
    );
    assert_eq!(reply.status, 200);
    let sketch: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(sketch["events"].as_array().unwrap().len(), 5);
    handle.stop();
}

#[test]
fn bad_parameters_are_rejected() {
    let (handle, addr) = start(ServerConfig::default());

    let reply = send(
        addr,
        "POST",
        "/generate",
        "genre=Pop&scale=C+Major&bpm=300&bars=4&section=Verse",
    );
    assert_eq!(reply.status, 400);
    assert!(reply.text().contains("300"));

    let reply = send(
        addr,
        "GET",
        "/download?genre=Pop&scale=C+Major&bpm=120&bars=2&section=Verse",
        "",
    );
    assert_eq!(reply.status, 400);

    let reply = send(
        addr,
        "GET",
        "/api/sketch?genre=Pop&scale=C+Major&bpm=120&bars=4&section=Bridge",
        "",
    );
    assert_eq!(reply.status, 400);
    let error: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("Bridge"));
    handle.stop();
}

#[test]
fn unknown_path_and_wrong_method() {
    let (handle, addr) = start(ServerConfig::default());
    assert_eq!(send(addr, "GET", "/nope", "").status, 404);
    assert_eq!(send(addr, "GET", "/generate", "").status, 405);
    assert_eq!(send(addr, "POST", "/download", "").status, 405);
    handle.stop();
}

#[test]
fn suggestion_without_key_still_generates() {
    let config = ServerConfig {
        api_key: None,
        ..ServerConfig::default()
    };
    let (handle, addr) = start(config);
    let reply = send(addr, "POST", "/generate", &format!("{POP_VERSE}&suggest=on"));
    assert_eq!(reply.status, 200);
    let html = reply.text();
    assert!(html.contains("Pop - Verse generated"));
    assert!(html.contains("no API key"));
    handle.stop();
}

/// One-shot fake chat-completions endpoint that checks the bearer token.
fn fake_completion_endpoint(expected_key: &'static str) -> String {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || {
        let request = server.recv().unwrap();
        let authorized = request
            .headers()
            .iter()
            .any(|h| {
                h.field.equiv("Authorization")
                    && h.value.as_str() == format!("Bearer {expected_key}")
            });
        let (status, body): (u16, &str) = if authorized {
            (
                200,
                r#"{"choices":[{"message":{"role":"assistant","content":"Try a IV-V-vi turnaround."}}]}"#,
            )
        } else {
            (401, r#"{"error":"bad key"}"#)
        };
        request
            .respond(tiny_http::Response::from_string(body).with_status_code(status))
            .unwrap();
    });
    format!("http://{addr}/v1")
}

#[test]
fn suggestion_is_merged_into_result_page() {
    let config = ServerConfig {
        suggest: SuggestConfig {
            base_url: fake_completion_endpoint("sk-form"),
            request_timeout: Duration::from_secs(5),
            ..SuggestConfig::default()
        },
        api_key: ApiKey::new("sk-server"),
        suggest_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    };
    let (handle, addr) = start(config);

    // The key typed into the form takes precedence over the server key.
    let reply = send(
        addr,
        "POST",
        "/generate",
        &format!("{POP_VERSE}&suggest=on&api_key=sk-form"),
    );
    assert_eq!(reply.status, 200);
    let html = reply.text();
    assert!(html.contains("<h2>Idea</h2>"));
    assert!(html.contains("Try a IV-V-vi turnaround."));
    assert!(!html.contains("sk-form"));
    handle.stop();
}
