//! CLI entry point: manifest in, JSON Lines out.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::Parser;
use log::{error, info};

use httpvolley::{
    Engine, EngineConfig, ParsedLine, RequestDescriptor, parse_line,
};

/// Execute a manifest of HTTP requests concurrently and stream results as
/// JSON Lines.
#[derive(Debug, Parser)]
#[command(name = "httpvolley", version, about)]
struct Cli {
    /// Manifest file (newline-delimited JSON); reads stdin when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file; writes stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of concurrent workers.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Default per-request timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Default retry budget beyond the first attempt.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Do not retry 5xx/429 responses.
    #[arg(long)]
    no_status_retries: bool,

    /// Add random jitter to retry backoff delays.
    #[arg(long)]
    jitter: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&cli);
    let (requests, invalid) = read_manifest(cli.input.as_deref())?;

    let writer: Box<dyn Write + Send> = match cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let engine = Engine::new(config, writer);

    for (id, message) in &invalid {
        engine.sink().emit_error(id, message)?;
    }
    engine.process_batch(&requests)?;

    let stats = engine.stats();
    info!(
        "processed {} requests ({} failed, {} retries, {} rejected manifest lines)",
        stats.completed,
        stats.failed,
        stats.retries,
        invalid.len()
    );
    Ok(())
}

fn build_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(concurrency) = cli.concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.default_timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(max_retries) = cli.max_retries {
        config.default_max_retries = max_retries;
    }
    config.retry_server_errors = !cli.no_status_retries;
    config.jitter = cli.jitter;
    config
}

type InvalidLine = (String, String);

fn read_manifest(
    path: Option<&Path>,
) -> io::Result<(Vec<RequestDescriptor>, Vec<InvalidLine>)> {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut requests = Vec::new();
    let mut invalid = Vec::new();
    for line in reader.lines() {
        match parse_line(&line?) {
            None => {}
            Some(ParsedLine::Request(request)) => requests.push(request),
            Some(ParsedLine::Invalid { id, error }) => invalid.push((id, error.to_string())),
        }
    }
    Ok((requests, invalid))
}
