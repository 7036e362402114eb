// CLI entry point for the Track to Track sketch generator.
//
// Generates a chord-and-melody sketch and writes it to MIDI. The pipeline:
// validate parameters → (optionally start an idea suggestion in the
// background) → generate sketch → write MIDI → show the suggestion if it
// arrived in time.
//
// Usage:
//   cargo run -p track_to_track_music -- generate [--genre G] [--scale S]
//     [--bpm N] [--bars N] [--section SECTION] [--output FILE] [--tables FILE]
//     [--json] [--suggest [--api-key KEY] [--endpoint URL] [--model NAME]
//     [--suggest-timeout-secs N]]
//   cargo run -p track_to_track_music -- list
//   cargo run -p track_to_track_music -- tables
//
// The API key can also come from TRACK_TO_TRACK_API_KEY. It is only held in
// memory for the duration of the run.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use track_to_track_llm::{
    ApiKey, CompletionBackend, HttpCompletionBackend, IdeaPrompt, SuggestConfig,
    SuggestionOutcome, SuggestionTask,
};
use track_to_track_music::catalog::Catalog;
use track_to_track_music::midi::write_midi;
use track_to_track_music::request::{BarCount, Bpm};
use track_to_track_music::{RawParameters, SketchTables, generate_sketch};

#[derive(Parser)]
#[command(name = "generate", about = "Chord-and-melody sketch generator with MIDI export")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a sketch and write it as a MIDI file
    Generate(GenerateArgs),

    /// List the available genres, scales, sections and ranges
    List {
        /// Custom progression/melody tables (JSON)
        #[arg(long)]
        tables: Option<PathBuf>,
    },

    /// Print the active lookup tables as JSON
    Tables {
        /// Custom progression/melody tables (JSON) to validate and echo
        #[arg(long)]
        tables: Option<PathBuf>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Musical style (Pop, Rock, EDM, Gospel; others use a default progression)
    #[arg(long, default_value = "Pop")]
    genre: String,

    /// Key name, e.g. "C Major" or "A Minor"
    #[arg(long, default_value = "C Major")]
    scale: String,

    /// Tempo in beats per minute (60-180)
    #[arg(long, default_value_t = Bpm::DEFAULT)]
    bpm: u32,

    /// Number of bars (4-16)
    #[arg(long, default_value_t = BarCount::DEFAULT)]
    bars: u32,

    /// Song section: Intro, Verse or Chorus
    #[arg(long, default_value = "Verse")]
    section: String,

    /// Output path (defaults to "{genre}_{section}.mid")
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Custom progression/melody tables (JSON)
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Print the sketch as JSON instead of a chord chart
    #[arg(long)]
    json: bool,

    /// Ask a language model for a chord/melody idea while generating
    #[arg(long)]
    suggest: bool,

    /// API key for the suggestion service (default: $TRACK_TO_TRACK_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Chat-completions base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name for suggestions
    #[arg(long)]
    model: Option<String>,

    /// Seconds to wait for a suggestion after the MIDI is written
    #[arg(long, default_value_t = 20)]
    suggest_timeout_secs: u64,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::List { tables } => {
            let tables = load_tables(tables.as_deref());
            print_catalog(&Catalog::from_tables(&tables));
        }
        Command::Tables { tables } => {
            let tables = load_tables(tables.as_deref());
            match tables.to_json_pretty() {
                Ok(json) => println!("{json}"),
                Err(e) => fail(&format!("Error serializing tables: {e}")),
            }
        }
    }
}

fn run_generate(args: GenerateArgs) {
    let tables = load_tables(args.tables.as_deref());

    let raw = RawParameters {
        genre: args.genre.clone(),
        scale: args.scale.clone(),
        bpm: args.bpm,
        bars: args.bars,
        section: args.section.clone(),
    };
    let request = raw
        .validate()
        .unwrap_or_else(|e| fail(&format!("Invalid parameters: {e}")));

    // Start the suggestion first so its latency overlaps generation.
    let suggestion = if args.suggest {
        let prompt = IdeaPrompt::new(
            request.genre.name(),
            request.section.name(),
            u32::from(request.bpm),
            request.scale.name(),
        );
        let backend: Arc<dyn CompletionBackend> = Arc::new(HttpCompletionBackend::new(
            suggest_config(&args),
            args.api_key.clone().and_then(ApiKey::new).or_else(ApiKey::from_env),
        ));
        Some(SuggestionTask::spawn(backend, prompt))
    } else {
        None
    };

    let sketch = generate_sketch(&request, &tables);

    if args.json {
        match serde_json::to_string_pretty(&sketch) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(&format!("Error serializing sketch: {e}")),
        }
    } else {
        print!("{}", sketch.chart());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(sketch.file_name()));
    let written = write_midi(&sketch, &output)
        .unwrap_or_else(|e| fail(&format!("Error writing {}: {e}", output.display())));
    // Progress goes to stderr when stdout carries JSON.
    let note = format!(
        "Wrote {} ({} bytes, {:.1}s at {} BPM)",
        output.display(),
        written,
        sketch.duration_seconds(),
        sketch.bpm()
    );
    if args.json {
        eprintln!("{note}");
    } else {
        println!("{note}");
    }

    if let Some(task) = suggestion {
        match task.wait(Duration::from_secs(args.suggest_timeout_secs)) {
            SuggestionOutcome::Ready(text) => {
                println!();
                println!("Idea:");
                for line in text.lines() {
                    println!("  {line}");
                }
            }
            other => {
                if let Some(message) = other.status_message() {
                    eprintln!("[suggest] {message}");
                }
            }
        }
    }
}

fn suggest_config(args: &GenerateArgs) -> SuggestConfig {
    let mut config = SuggestConfig::default();
    if let Some(endpoint) = &args.endpoint {
        config.base_url = endpoint.clone();
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    config
}

fn load_tables(path: Option<&Path>) -> SketchTables {
    match path {
        Some(path) => SketchTables::load(path)
            .unwrap_or_else(|e| fail(&format!("Error loading tables: {e}"))),
        None => SketchTables::default(),
    }
}

fn print_catalog(catalog: &Catalog) {
    println!("Genres:   {}", catalog.genres.join(", "));
    println!("Scales:   {}", catalog.scales.join(", "));
    println!("Sections: {}", catalog.sections.join(", "));
    println!(
        "BPM:      {}-{} (default {})",
        catalog.bpm.min, catalog.bpm.max, catalog.bpm.default
    );
    println!(
        "Bars:     {}-{} (default {})",
        catalog.bars.min, catalog.bars.max, catalog.bars.default
    );
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}
