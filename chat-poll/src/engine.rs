use crate::cycle::{CycleManager, Ingested};
use crate::traits::{LineSource, PollSink};
use crate::types::{CycleOutcome, PollConfig, PollError, PollQuery, Resolution, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Counters for one [`PollEngine::run`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub chat_lines: u64,
    pub cycles_resolved: u64,
}

/// Thread-safe driver around a [`CycleManager`].
///
/// Ingestion and resolve+reset both go through one lock, so a line is
/// either counted in the cycle being resolved or lands in the next one.
pub struct PollEngine {
    manager: Arc<Mutex<CycleManager>>,
    is_running: Arc<RwLock<bool>>,
    stop_requested: watch::Sender<bool>,
}

impl PollEngine {
    pub fn new(config: &PollConfig) -> Result<Self> {
        Ok(Self::from_manager(CycleManager::new(config)?))
    }

    pub fn from_manager(manager: CycleManager) -> Self {
        let (stop_requested, _) = watch::channel(false);
        Self {
            manager: Arc::new(Mutex::new(manager)),
            is_running: Arc::new(RwLock::new(false)),
            stop_requested,
        }
    }

    pub async fn ingest_line(&self, line: &str) -> Option<Ingested> {
        self.manager.lock().await.ingest_line(line)
    }

    pub async fn advance(&self, elapsed: Duration) -> Result<Option<CycleOutcome>> {
        self.manager.lock().await.advance(elapsed)
    }

    pub async fn expire(&self) -> Result<CycleOutcome> {
        self.manager.lock().await.expire()
    }

    pub async fn peek(&self, query: PollQuery) -> Result<Resolution> {
        self.manager.lock().await.peek(query)
    }

    pub async fn remaining(&self) -> Duration {
        self.manager.lock().await.remaining()
    }

    pub async fn set_candidates(&self, options: Vec<String>) -> Result<()> {
        self.manager.lock().await.set_candidates(options)
    }

    /// Run `f` against the manager while holding the lock.
    pub async fn with_manager<T>(&self, f: impl FnOnce(&mut CycleManager) -> T) -> T {
        let mut manager = self.manager.lock().await;
        f(&mut manager)
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Ask [`run`](Self::run) to return. A request made before the loop has
    /// started is kept and honoured as soon as it does; a resolution already
    /// under way finishes first.
    pub async fn stop(&self) {
        if self.is_running().await {
            info!("Stopping poll engine");
        }
        self.stop_requested.send_replace(true);
    }

    /// Pull lines from `source` and tick the cycle timer every `tick` until
    /// the source ends or [`stop`](Self::stop) is called.
    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K, tick: Duration) -> Result<RunSummary>
    where
        S: LineSource + ?Sized,
        K: PollSink + ?Sized,
    {
        if tick.is_zero() {
            return Err(PollError::InvalidConfig("tick interval must be positive".to_string()));
        }

        {
            let mut is_running = self.is_running.write().await;
            if *is_running {
                return Err(PollError::General("Poll engine is already running".to_string()));
            }
            *is_running = true;
        }

        info!("Poll engine reading from {} (tick {:?})", source.source_name(), tick);
        let result = self.drive(source, sink, tick).await;

        self.stop_requested.send_replace(false);
        *self.is_running.write().await = false;

        match &result {
            Ok(summary) => info!(
                "Poll engine finished: {} lines, {} chat, {} cycles",
                summary.lines_read, summary.chat_lines, summary.cycles_resolved
            ),
            Err(e) => warn!("Poll engine stopped with error: {}", e),
        }
        result
    }

    async fn drive<S, K>(&self, source: &mut S, sink: &mut K, tick: Duration) -> Result<RunSummary>
    where
        S: LineSource + ?Sized,
        K: PollSink + ?Sized,
    {
        let source_name = source.source_name();
        let mut summary = RunSummary::default();
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        let mut last_tick = Instant::now();
        let mut stop = self.stop_requested.subscribe();

        loop {
            if *stop.borrow_and_update() {
                debug!("Stop requested, leaving {}", source_name);
                break;
            }

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                line = source.next_line() => {
                    let Some(line) = line? else {
                        debug!("Line source {} closed", source_name);
                        break;
                    };
                    summary.lines_read += 1;
                    if let Some(ingested) = self.ingest_line(&line).await {
                        summary.chat_lines += 1;
                        sink.on_transcript(&ingested.transcript)?;
                    }
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_tick);
                    last_tick = now;

                    let (outcome, remaining) = {
                        let mut manager = self.manager.lock().await;
                        let outcome = manager.advance(elapsed)?;
                        (outcome, manager.remaining())
                    };

                    if let Some(outcome) = outcome {
                        summary.cycles_resolved += 1;
                        sink.on_outcome(&outcome)?;
                    }
                    sink.on_remaining(remaining)?;
                }
            }
        }

        Ok(summary)
    }
}
