//! Example door controller CLI.
//!
//! Runs the scripted door scenario and prints the nodes it passed through.
//!
//! # Usage
//!
//! ```bash
//! door [graph.json] [runner.json]
//! ```
//!
//! Without arguments the bundled assets are used. Logging is controlled by
//! `TRELLIS_LOG` (an env filter such as `info,trellis_graph=debug`) and
//! `TRELLIS_LOG_FORMAT` (`pretty`, `compact` or `json`), both of which may
//! also come from a `.env` file.

#![expect(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "the demo reports to the terminal"
)]

use std::path::Path;
use std::process::ExitCode;

use example::{DOOR_GRAPH, DOOR_RUNNER, door_script, read_asset, run_scripted};
use trellis_core::{TracingConfig, TracingFormat};

const FRAMES: u64 = 240;
const DELTA_TIME: f32 = 1.0 / 30.0;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let mut tracing = TracingConfig::new();
    if let Ok(filter) = std::env::var("TRELLIS_LOG") {
        tracing = tracing.with_env_filter(filter);
    }
    if let Ok(name) = std::env::var("TRELLIS_LOG_FORMAT") {
        match TracingFormat::parse(&name) {
            Some(format) => tracing = tracing.with_format(format),
            None => eprintln!("Warning: unknown log format '{name}', using pretty"),
        }
    }
    tracing.init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() > 2 {
        eprintln!("Usage: door [graph.json] [runner.json]");
        return ExitCode::FAILURE;
    }

    let graph = match args.first() {
        Some(path) => read_asset(Path::new(path)),
        None => Ok(DOOR_GRAPH.to_owned()),
    };
    let runner = match args.get(1) {
        Some(path) => read_asset(Path::new(path)),
        None => Ok(DOOR_RUNNER.to_owned()),
    };
    let (graph, runner) = match (graph, runner) {
        (Ok(graph), Ok(runner)) => (graph, runner),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run_scripted(&graph, &runner, &door_script(), FRAMES, DELTA_TIME) {
        Ok(summary) => {
            println!("ran {} frames", summary.frames);
            println!("visited: {}", summary.visited.join(" -> "));
            println!(
                "final node: {} (door {})",
                summary.final_node.as_deref().unwrap_or("-"),
                if summary.door_open { "open" } else { "closed" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
