use crate::filter::{FilterDecision, ResponseFilter};
use crate::parser::{ChatLineParser, ParserStats};
use crate::resolver;
use crate::transcript::{Transcript, TranscriptLine};
use crate::types::{
    CandidateSet, ChatEntry, CycleOutcome, PollConfig, PollError, PollQuery, Resolution, Result,
    TieBreakPolicy,
};
use crate::utils::time::countdown;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Everything accepted since the last reset.
#[derive(Debug, Clone, Default)]
pub struct CycleState {
    log: Vec<String>,
    submitted: HashSet<String>,
}

impl CycleState {
    pub fn record(&mut self, normalized: String) {
        self.log.push(normalized);
    }

    pub fn mark_submitted(&mut self, viewer: String) {
        self.submitted.insert(viewer);
    }

    pub fn has_submitted(&self, viewer: &str) -> bool {
        self.submitted.contains(viewer)
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.len()
    }

    /// Drops the log and the submitted-viewer set together.
    pub fn clear(&mut self) {
        self.log.clear();
        self.submitted.clear();
    }
}

/// A line that made it through the parser, with what the filter did to it.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub transcript: TranscriptLine,
    pub decision: FilterDecision,
}

/// Owns the per-cycle state and the countdown that ends each cycle.
///
/// The manager schedules nothing itself: the host calls [`advance`] with
/// elapsed time (or [`expire`] directly) and feeds lines through
/// [`ingest_line`].
///
/// [`advance`]: CycleManager::advance
/// [`expire`]: CycleManager::expire
/// [`ingest_line`]: CycleManager::ingest_line
pub struct CycleManager {
    candidates: CandidateSet,
    filter: ResponseFilter,
    tie_break: TieBreakPolicy,
    query: PollQuery,
    cycle_duration: Duration,
    remaining: Duration,
    cycle: u64,
    state: CycleState,
    parser: ChatLineParser,
    transcript: Transcript,
    rng: StdRng,
}

impl CycleManager {
    pub fn new(config: &PollConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let cycle_duration = config.cycle_duration();

        info!(
            "Poll configured: candidates={:?} dedup={} tie_break={} query={} cycle={}ms",
            config.candidates,
            config.dedup_per_viewer,
            config.tie_break,
            config.query,
            config.cycle_duration_ms
        );

        Ok(Self {
            candidates: config.candidate_set(),
            filter: ResponseFilter::new(config.dedup_per_viewer),
            tie_break: config.tie_break,
            query: config.query,
            cycle_duration,
            remaining: cycle_duration,
            cycle: 1,
            state: CycleState::default(),
            parser: ChatLineParser::new(),
            transcript: Transcript::with_limit(config.transcript_limit),
            rng,
        })
    }

    /// Parse a raw line and, if it is chat, log it and run it through the filter.
    pub fn ingest_line(&mut self, line: &str) -> Option<Ingested> {
        let entry = self.parser.parse_line(line)?;
        let transcript = self.transcript.append(&entry);
        let decision = self.ingest_entry(&entry);
        Some(Ingested {
            transcript,
            decision,
        })
    }

    pub fn ingest_entry(&mut self, entry: &ChatEntry) -> FilterDecision {
        self.filter.apply(entry, &self.candidates, &mut self.state)
    }

    /// Count down by `elapsed`; when the cycle runs out, resolve it.
    /// A tick longer than the whole cycle still ends only one cycle.
    pub fn advance(&mut self, elapsed: Duration) -> Result<Option<CycleOutcome>> {
        self.remaining = countdown(self.remaining, elapsed);
        if !self.remaining.is_zero() {
            return Ok(None);
        }
        self.expire().map(Some)
    }

    /// End the current cycle now: resolve, clear, restart the countdown.
    /// If resolution fails the cycle is left exactly as it was.
    pub fn expire(&mut self) -> Result<CycleOutcome> {
        let resolution = resolver::resolve(
            &self.candidates,
            self.state.log(),
            self.query,
            self.tie_break,
            &mut self.rng,
        )?;

        let outcome = CycleOutcome {
            cycle: self.cycle,
            query: self.query,
            resolution,
            entries: self.state.len(),
            resolved_at: Utc::now(),
        };

        info!(
            "Cycle {} resolved: {} (tally={:?}, entries={}, voters={})",
            outcome.cycle,
            outcome.resolution.candidate,
            outcome.resolution.tally,
            outcome.entries,
            self.state.submitted_count()
        );

        self.state.clear();
        self.cycle += 1;
        self.remaining = self.cycle_duration;

        Ok(outcome)
    }

    /// Resolve against the current log without ending the cycle.
    pub fn peek(&mut self, query: PollQuery) -> Result<Resolution> {
        resolver::resolve(
            &self.candidates,
            self.state.log(),
            query,
            self.tie_break,
            &mut self.rng,
        )
    }

    /// Swap the candidate set. Entries already logged are kept and tallied
    /// against the new set at expiry.
    pub fn set_candidates(&mut self, options: Vec<String>) -> Result<()> {
        if options.is_empty() {
            return Err(PollError::EmptyCandidateSet);
        }
        debug!("Replacing candidates with {:?}", options);
        self.candidates = CandidateSet::new(options);
        Ok(())
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn cycle_duration(&self) -> Duration {
        self.cycle_duration
    }

    pub fn cycle_number(&self) -> u64 {
        self.cycle
    }

    pub fn query(&self) -> PollQuery {
        self.query
    }

    pub fn tie_break(&self) -> TieBreakPolicy {
        self.tie_break
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn parser_stats(&self) -> ParserStats {
        self.parser.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(dedup: bool) -> CycleManager {
        let config = PollConfig {
            candidates: vec!["yes".to_string(), "no".to_string()],
            dedup_per_viewer: dedup,
            cycle_duration_ms: 1_000,
            rng_seed: Some(1),
            ..PollConfig::default()
        };
        CycleManager::new(&config).expect("config should be valid")
    }

    fn chat(viewer: &str, message: &str) -> String {
        format!(":{viewer}!{viewer}@{viewer}.tmi.twitch.tv PRIVMSG #poll :{message}\r\n")
    }

    #[test]
    fn advance_fires_once_at_zero_and_restarts() {
        let mut manager = manager(false);
        manager.ingest_line(&chat("v1", "no"));

        assert!(manager.advance(Duration::from_millis(600)).unwrap().is_none());
        assert_eq!(manager.remaining(), Duration::from_millis(400));

        let outcome = manager
            .advance(Duration::from_millis(5_000))
            .unwrap()
            .expect("cycle should end");
        assert_eq!(outcome.cycle, 1);
        assert_eq!(outcome.resolution.candidate, "no");
        assert_eq!(manager.remaining(), Duration::from_millis(1_000));
        assert_eq!(manager.cycle_number(), 2);
    }

    #[test]
    fn expire_resets_log_and_viewers() {
        let mut manager = manager(true);
        manager.ingest_line(&chat("v1", "yes"));
        assert_eq!(manager.state().submitted_count(), 1);

        manager.expire().unwrap();
        assert!(manager.state().is_empty());
        assert_eq!(manager.state().submitted_count(), 0);

        let outcome = manager.expire().unwrap();
        assert_eq!(outcome.resolution.tally, vec![0, 0]);
        assert_eq!(outcome.entries, 0);
    }

    #[test]
    fn viewer_can_vote_again_next_cycle() {
        let mut manager = manager(true);
        manager.ingest_line(&chat("v1", "yes"));
        manager.expire().unwrap();

        let ingested = manager.ingest_line(&chat("v1", "no")).expect("chat line");
        assert!(ingested.decision.is_recorded());
    }

    #[test]
    fn non_chat_lines_do_not_touch_state_or_transcript() {
        let mut manager = manager(false);
        assert!(manager.ingest_line("PING :tmi.twitch.tv").is_none());
        assert!(manager.ingest_line("garbage PRIVMSG line").is_none());
        assert!(manager.state().is_empty());
        assert!(manager.transcript().is_empty());
        assert_eq!(manager.parser_stats().malformed, 1);
    }

    #[test]
    fn transcript_keeps_rejected_chat_and_survives_reset() {
        let mut manager = manager(true);
        manager.ingest_line(&chat("v1", "maybe"));
        manager.ingest_line(&chat("v1", "yes"));
        manager.expire().unwrap();

        assert_eq!(manager.transcript().len(), 2);
        assert!(manager.state().is_empty());
    }

    #[test]
    fn transcript_limit_comes_from_config() {
        let config = PollConfig {
            transcript_limit: Some(1),
            ..PollConfig::default()
        };
        let mut manager = CycleManager::new(&config).unwrap();
        manager.ingest_line(&chat("v1", "yes"));
        manager.ingest_line(&chat("v2", "no"));

        assert_eq!(manager.transcript().len(), 1);
        assert_eq!(manager.transcript().total_appended(), 2);
        assert_eq!(manager.state().len(), 2);
    }

    #[test]
    fn peek_does_not_reset() {
        let mut manager = manager(false);
        manager.ingest_line(&chat("v1", "yes"));
        let resolution = manager.peek(PollQuery::LeastCommon).unwrap();
        assert_eq!(resolution.candidate, "no");
        assert_eq!(manager.state().len(), 1);
        assert_eq!(manager.cycle_number(), 1);
    }

    #[test]
    fn empty_candidate_replacement_is_rejected() {
        let mut manager = manager(false);
        assert!(matches!(
            manager.set_candidates(Vec::new()),
            Err(PollError::EmptyCandidateSet)
        ));
        manager
            .set_candidates(vec!["red".to_string(), "blue".to_string()])
            .unwrap();
        assert_eq!(manager.candidates().len(), 2);
    }
}
