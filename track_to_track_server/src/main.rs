// CLI entry point for the Track to Track web front end.
//
// Starts the HTTP server and keeps it running until the process is killed.
// See `server.rs` for routing and the threading model.
//
// Usage:
//   serve [OPTIONS]
//     --bind <ADDR>                 Listen address (default: 127.0.0.1)
//     --port <PORT>                 Listen port (default: 8501)
//     --tables <FILE>               Custom progression/melody tables (JSON)
//     --endpoint <URL>              Chat-completions base URL for suggestions
//     --model <NAME>                Model name for suggestions
//     --suggest-timeout-secs <N>    Wait limit for a suggestion (default: 15)
//
// A server-wide credential for suggestions is read from
// TRACK_TO_TRACK_API_KEY. Users can also type one into the form.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use track_to_track_llm::{API_KEY_ENV, ApiKey};
use track_to_track_music::SketchTables;
use track_to_track_server::{ServerConfig, start_server};

#[derive(Parser)]
#[command(name = "serve", about = "Web front end for the Track to Track sketch generator")]
#[command(version)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Listen port
    #[arg(long, default_value_t = 8501)]
    port: u16,

    /// Custom progression/melody tables (JSON)
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Chat-completions base URL for suggestions
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name for suggestions
    #[arg(long)]
    model: Option<String>,

    /// Seconds a result page waits for a suggestion
    #[arg(long, default_value_t = 15)]
    suggest_timeout_secs: u64,
}

fn main() {
    let args = Args::parse();
    let config = build_config(args);
    let has_key = config.api_key.is_some();

    let (handle, addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!("Track to Track listening on http://{addr}/");
    if !has_key {
        println!("{API_KEY_ENV} is not set; suggestions need a key typed into the form.");
    }
    println!("Press Ctrl+C to stop.");

    // The process exits on SIGINT/SIGTERM; request threads go down with it.
    loop {
        std::thread::sleep(Duration::from_millis(100));
        if handle.is_stopped() {
            break;
        }
    }

    eprintln!("[server] listener stopped");
    handle.stop();
}

fn build_config(args: Args) -> ServerConfig {
    let mut config = ServerConfig {
        bind: args.bind,
        port: args.port,
        api_key: ApiKey::from_env(),
        suggest_timeout: Duration::from_secs(args.suggest_timeout_secs),
        ..ServerConfig::default()
    };

    if let Some(path) = args.tables {
        config.tables = SketchTables::load(&path).unwrap_or_else(|e| {
            eprintln!("Error loading tables: {e}");
            std::process::exit(1);
        });
    }
    if let Some(endpoint) = args.endpoint {
        config.suggest.base_url = endpoint;
    }
    if let Some(model) = args.model {
        config.suggest.model = model;
    }
    config
}
