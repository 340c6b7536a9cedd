use crate::transcript::TranscriptLine;
use crate::types::{CycleOutcome, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Supplies raw protocol lines in arrival order.
///
/// Connection setup, authentication and reconnects live behind this trait;
/// the engine only ever asks for the next line.
#[async_trait]
pub trait LineSource: Send {
    /// Human-readable name for logs
    fn source_name(&self) -> String;

    /// Wait for the next raw line. `Ok(None)` means the stream has ended.
    async fn next_line(&mut self) -> Result<Option<String>>;
}

/// Receives what the engine produces. Only `on_outcome` is required, so a
/// headless sink can ignore the transcript and countdown.
pub trait PollSink: Send {
    fn on_outcome(&mut self, outcome: &CycleOutcome) -> Result<()>;

    fn on_transcript(&mut self, _line: &TranscriptLine) -> Result<()> {
        Ok(())
    }

    fn on_remaining(&mut self, _remaining: Duration) -> Result<()> {
        Ok(())
    }
}
