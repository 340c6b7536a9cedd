use crate::traits::PollSink;
use crate::transcript::TranscriptLine;
use crate::types::{CycleOutcome, PollError, Result};
use crate::utils::time::format_remaining;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Reports everything through `tracing`; the default for headless runs.
#[derive(Debug, Default)]
pub struct TracingSink;

impl PollSink for TracingSink {
    fn on_outcome(&mut self, outcome: &CycleOutcome) -> Result<()> {
        info!(
            "Poll result #{}: {} ({})",
            outcome.cycle, outcome.resolution.candidate, outcome.query
        );
        Ok(())
    }

    fn on_transcript(&mut self, line: &TranscriptLine) -> Result<()> {
        debug!("{}", line.render());
        Ok(())
    }
}

/// Writes one JSON object per outcome. Optionally echoes the transcript
/// and countdown as JSON too.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    include_transcript: bool,
    include_remaining: bool,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            include_transcript: false,
            include_remaining: false,
        }
    }

    pub fn with_transcript(mut self, enabled: bool) -> Self {
        self.include_transcript = enabled;
        self
    }

    pub fn with_remaining(mut self, enabled: bool) -> Self {
        self.include_remaining = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_value(&mut self, value: &serde_json::Value) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> PollSink for JsonLinesSink<W> {
    fn on_outcome(&mut self, outcome: &CycleOutcome) -> Result<()> {
        let value = serde_json::json!({ "outcome": outcome });
        self.write_value(&value)
    }

    fn on_transcript(&mut self, line: &TranscriptLine) -> Result<()> {
        if !self.include_transcript {
            return Ok(());
        }
        let value = serde_json::json!({ "chat": line });
        self.write_value(&value)
    }

    fn on_remaining(&mut self, remaining: Duration) -> Result<()> {
        if !self.include_remaining {
            return Ok(());
        }
        let value = serde_json::json!({
            "remaining_ms": remaining.as_millis() as u64,
            "display": format_remaining(remaining),
        });
        self.write_value(&value)
    }
}

/// Forwards outcomes to another task.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<CycleOutcome>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CycleOutcome>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl PollSink for ChannelSink {
    fn on_outcome(&mut self, outcome: &CycleOutcome) -> Result<()> {
        self.sender
            .send(outcome.clone())
            .map_err(|e| PollError::General(format!("outcome receiver dropped: {}", e)))
    }
}

/// Appends every transcript line to a file from a background task, so the
/// engine never waits on the disk.
pub struct TranscriptFileSink {
    sender: mpsc::UnboundedSender<String>,
    path: PathBuf,
}

impl TranscriptFileSink {
    /// Open `path` in append mode (creating it) and start the writer task.
    /// The task drains and flushes once every sender is dropped.
    pub async fn open(path: &Path) -> Result<(Self, JoinHandle<()>)> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        info!("Mirroring chat transcript to {}", path.display());

        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_transcript(file, path.to_path_buf(), receiver));
        Ok((
            Self {
                sender,
                path: path.to_path_buf(),
            },
            writer,
        ))
    }
}

async fn write_transcript(
    mut file: tokio::fs::File,
    path: PathBuf,
    mut receiver: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = receiver.recv().await {
        if let Err(e) = file.write_all(line.as_bytes()).await {
            warn!("Failed to write transcript to {}: {}", path.display(), e);
        }
    }
    if let Err(e) = file.flush().await {
        warn!("Failed to flush transcript {}: {}", path.display(), e);
    }
}

impl PollSink for TranscriptFileSink {
    fn on_outcome(&mut self, _outcome: &CycleOutcome) -> Result<()> {
        Ok(())
    }

    fn on_transcript(&mut self, line: &TranscriptLine) -> Result<()> {
        // A dead mirror must not stop the poll.
        if self.sender.send(format!("{}\n", line.render())).is_err() {
            warn!("Transcript writer for {} has stopped", self.path.display());
        }
        Ok(())
    }
}

/// Hands every event to two sinks, `first` before `second`.
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A: PollSink, B: PollSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: PollSink, B: PollSink> PollSink for TeeSink<A, B> {
    fn on_outcome(&mut self, outcome: &CycleOutcome) -> Result<()> {
        self.first.on_outcome(outcome)?;
        self.second.on_outcome(outcome)
    }

    fn on_transcript(&mut self, line: &TranscriptLine) -> Result<()> {
        self.first.on_transcript(line)?;
        self.second.on_transcript(line)
    }

    fn on_remaining(&mut self, remaining: Duration) -> Result<()> {
        self.first.on_remaining(remaining)?;
        self.second.on_remaining(remaining)
    }
}

/// An absent sink ignores everything.
impl<S: PollSink> PollSink for Option<S> {
    fn on_outcome(&mut self, outcome: &CycleOutcome) -> Result<()> {
        match self {
            Some(sink) => sink.on_outcome(outcome),
            None => Ok(()),
        }
    }

    fn on_transcript(&mut self, line: &TranscriptLine) -> Result<()> {
        match self {
            Some(sink) => sink.on_transcript(line),
            None => Ok(()),
        }
    }

    fn on_remaining(&mut self, remaining: Duration) -> Result<()> {
        match self {
            Some(sink) => sink.on_remaining(remaining),
            None => Ok(()),
        }
    }
}
