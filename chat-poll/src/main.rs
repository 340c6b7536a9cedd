use anyhow::Context;
use chat_poll::{
    JsonLinesSink, PollConfig, PollEngine, PollQuery, PollSink, ReaderLineSource, TeeSink,
    TieBreakPolicy, TranscriptFileSink,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Chat lines kept in memory when neither the config nor a flag says otherwise.
const DEFAULT_TRANSCRIPT_LIMIT: usize = 1_000;

/// Resolve a live chat poll from raw protocol lines on stdin.
#[derive(Debug, Parser)]
#[command(name = "chat-poll", version)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated candidate options
    #[arg(long, value_delimiter = ',')]
    candidates: Option<Vec<String>>,

    /// Count at most one valid answer per viewer per cycle
    #[arg(long)]
    dedup: bool,

    /// random | first_option | fastest_reached
    #[arg(long)]
    tie_break: Option<TieBreakPolicy>,

    /// most_common | least_common
    #[arg(long)]
    query: Option<PollQuery>,

    /// Cycle length in milliseconds
    #[arg(long)]
    cycle_ms: Option<u64>,

    /// Seed for the random tie-break
    #[arg(long)]
    seed: Option<u64>,

    /// Append accepted chat lines to this file
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Recent chat lines to keep in memory (0 keeps none)
    #[arg(long)]
    transcript_limit: Option<usize>,

    /// Timer resolution in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Echo accepted chat lines on stdout as JSON
    #[arg(long)]
    echo_chat: bool,

    /// Print the cycle countdown on stdout as JSON every tick
    #[arg(long)]
    show_remaining: bool,

    /// Resolve the partial cycle when stdin closes
    #[arg(long)]
    flush_on_exit: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn poll_config(&self) -> anyhow::Result<PollConfig> {
        let mut config = match &self.config {
            Some(path) => PollConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => PollConfig::default(),
        };

        if let Some(candidates) = &self.candidates {
            config.candidates = candidates
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if self.dedup {
            config.dedup_per_viewer = true;
        }
        if let Some(tie_break) = self.tie_break {
            config.tie_break = tie_break;
        }
        if let Some(query) = self.query {
            config.query = query;
        }
        if let Some(cycle_ms) = self.cycle_ms {
            config.cycle_duration_ms = cycle_ms;
        }
        if self.seed.is_some() {
            config.rng_seed = self.seed;
        }
        if self.transcript.is_some() {
            config.transcript_path = self.transcript.clone();
        }
        config.transcript_limit = self
            .transcript_limit
            .or(config.transcript_limit)
            .or(Some(DEFAULT_TRANSCRIPT_LIMIT));

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level: tracing::Level = args
        .log_level
        .parse()
        .with_context(|| format!("invalid log level: {}", args.log_level))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = args.poll_config()?;
    let engine = PollEngine::new(&config).context("starting poll engine")?;

    let (mirror, writer) = match &config.transcript_path {
        Some(path) => {
            let (mirror, writer) = TranscriptFileSink::open(path)
                .await
                .with_context(|| format!("opening transcript {}", path.display()))?;
            (Some(mirror), Some(writer))
        }
        None => (None, None),
    };

    let mut source = ReaderLineSource::stdin();
    let stdout = JsonLinesSink::new(std::io::stdout())
        .with_transcript(args.echo_chat)
        .with_remaining(args.show_remaining);
    let mut sink = TeeSink::new(stdout, mirror);

    info!("Starting chat poll");
    let summary = engine
        .run(&mut source, &mut sink, Duration::from_millis(args.tick_ms))
        .await
        .map_err(|e| {
            error!("Poll engine failed: {}", e);
            e
        })?;

    if args.flush_on_exit {
        let outcome = engine.expire().await?;
        sink.on_outcome(&outcome)?;
    }

    drop(sink);
    if let Some(writer) = writer {
        writer.await.context("transcript writer panicked")?;
    }

    info!(
        "Read {} lines ({} chat), resolved {} cycles",
        summary.lines_read, summary.chat_lines, summary.cycles_resolved
    );
    Ok(())
}
