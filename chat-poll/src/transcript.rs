use crate::types::ChatEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub received_at: DateTime<Utc>,
    pub viewer: String,
    pub message: String,
}

impl TranscriptLine {
    pub fn render(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.received_at.format("%H:%M:%S"),
            self.viewer,
            self.message
        )
    }
}

/// In-memory history of every chat line the engine accepted, across all
/// cycles. Nothing in the tally path reads it back.
///
/// With a limit set only the newest `limit` lines are retained; the full
/// history goes to whatever sink handles `on_transcript`.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: VecDeque<TranscriptLine>,
    limit: Option<usize>,
    appended: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn append(&mut self, entry: &ChatEntry) -> TranscriptLine {
        let line = TranscriptLine {
            received_at: Utc::now(),
            viewer: entry.viewer.clone(),
            message: entry.message.clone(),
        };
        self.appended += 1;

        match self.limit {
            Some(0) => {}
            Some(limit) => {
                if self.lines.len() == limit {
                    self.lines.pop_front();
                }
                self.lines.push_back(line.clone());
            }
            None => self.lines.push_back(line.clone()),
        }
        line
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &TranscriptLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines appended over the transcript's lifetime, including evicted ones.
    pub fn total_appended(&self) -> u64 {
        self.appended
    }

    pub fn last(&self) -> Option<&TranscriptLine> {
        self.lines.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order() {
        let mut transcript = Transcript::new();
        transcript.append(&ChatEntry::new("a", "first"));
        let line = transcript.append(&ChatEntry::new("b", "second"));

        assert_eq!(line.viewer, "b");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.lines().next().map(|l| l.viewer.as_str()), Some("a"));
        assert_eq!(transcript.last().map(|l| l.message.as_str()), Some("second"));
    }

    #[test]
    fn limit_keeps_newest_lines() {
        let mut transcript = Transcript::with_limit(Some(2));
        for message in ["one", "two", "three"] {
            transcript.append(&ChatEntry::new("v", message));
        }

        let kept: Vec<&str> = transcript.lines().map(|l| l.message.as_str()).collect();
        assert_eq!(kept, vec!["two", "three"]);
        assert_eq!(transcript.total_appended(), 3);
    }

    #[test]
    fn zero_limit_retains_nothing() {
        let mut transcript = Transcript::with_limit(Some(0));
        let line = transcript.append(&ChatEntry::new("v", "hello"));

        assert_eq!(line.message, "hello");
        assert!(transcript.is_empty());
        assert_eq!(transcript.total_appended(), 1);
    }
}
