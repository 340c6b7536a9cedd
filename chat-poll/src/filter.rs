use crate::cycle::CycleState;
use crate::types::{CandidateSet, ChatEntry};
use crate::utils::normalize_response;
use tracing::debug;

/// Outcome of running one chat entry through the [`ResponseFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Appended to the working log in normalized form.
    Recorded(String),
    /// Viewer already has a counted submission this cycle.
    DuplicateViewer,
    /// Dedup is on and the message is not one of the candidates.
    NotACandidate,
}

impl FilterDecision {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Decides whether a chat entry counts towards the current cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFilter {
    dedup_per_viewer: bool,
}

impl ResponseFilter {
    pub fn new(dedup_per_viewer: bool) -> Self {
        Self { dedup_per_viewer }
    }

    pub fn apply(
        &self,
        entry: &ChatEntry,
        candidates: &CandidateSet,
        state: &mut CycleState,
    ) -> FilterDecision {
        let normalized = normalize_response(&entry.message);

        if !self.dedup_per_viewer {
            state.record(normalized.clone());
            return FilterDecision::Recorded(normalized);
        }

        if state.has_submitted(&entry.viewer) {
            debug!("Ignoring repeat submission from {}", entry.viewer);
            return FilterDecision::DuplicateViewer;
        }

        // An off-candidate message does not use up the viewer's vote.
        if !candidates.contains_key(&normalized) {
            debug!("Ignoring non-candidate response from {}: {:?}", entry.viewer, normalized);
            return FilterDecision::NotACandidate;
        }

        state.mark_submitted(entry.viewer.clone());
        state.record(normalized.clone());
        FilterDecision::Recorded(normalized)
    }
}
