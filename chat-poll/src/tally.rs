use crate::types::{CandidateSet, PollQuery};

/// Per-candidate vote counts for one working log.
///
/// Always rebuilt from the log rather than maintained alongside it, so two
/// computations over the same inputs are identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    counts: Vec<usize>,
}

impl Tally {
    /// Count, for every candidate, the log entries equal to its key.
    /// Duplicate candidates each get the full count.
    pub fn compute<S: AsRef<str>>(candidates: &CandidateSet, log: &[S]) -> Self {
        let counts = candidates
            .keys()
            .map(|key| {
                log.iter()
                    .filter(|entry| {
                        let entry: &str = (*entry).as_ref();
                        entry == key
                    })
                    .count()
            })
            .collect();
        Self { counts }
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn into_counts(self) -> Vec<usize> {
        self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Max or min count depending on the query; `None` for an empty tally.
    pub fn extreme(&self, query: PollQuery) -> Option<usize> {
        match query {
            PollQuery::MostCommon => self.counts.iter().copied().max(),
            PollQuery::LeastCommon => self.counts.iter().copied().min(),
        }
    }

    /// Candidate indices whose count equals `value`, in set order.
    pub fn indices_at(&self, value: usize) -> Vec<usize> {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count == value)
            .map(|(index, _)| index)
            .collect()
    }
}
