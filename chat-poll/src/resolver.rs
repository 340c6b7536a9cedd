use crate::tally::Tally;
use crate::types::{CandidateSet, PollError, PollQuery, Resolution, Result, TieBreakPolicy};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Pick the most frequent candidate.
pub fn most_common<S, R>(
    candidates: &CandidateSet,
    log: &[S],
    policy: TieBreakPolicy,
    rng: &mut R,
) -> Result<Resolution>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    resolve(candidates, log, PollQuery::MostCommon, policy, rng)
}

/// Pick the least frequent candidate.
pub fn least_common<S, R>(
    candidates: &CandidateSet,
    log: &[S],
    policy: TieBreakPolicy,
    rng: &mut R,
) -> Result<Resolution>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    resolve(candidates, log, PollQuery::LeastCommon, policy, rng)
}

/// Tally `log` against `candidates` and select one candidate at the extreme
/// named by `query`. The policy is consulted only when several candidates
/// share that extreme; `rng` is touched only for [`TieBreakPolicy::Random`].
pub fn resolve<S, R>(
    candidates: &CandidateSet,
    log: &[S],
    query: PollQuery,
    policy: TieBreakPolicy,
    rng: &mut R,
) -> Result<Resolution>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let tally = Tally::compute(candidates, log);
    let target = tally.extreme(query).ok_or(PollError::EmptyCandidateSet)?;
    let tied = tally.indices_at(target);

    let (index, tie_break) = match tied.as_slice() {
        [only] => (*only, None),
        _ => (break_tie(&tied, candidates, log, policy, rng)?, Some(policy)),
    };

    let candidate = candidates
        .label(index)
        .ok_or_else(|| PollError::General(format!("resolved index {index} out of range")))?
        .to_string();

    if tie_break.is_some() {
        debug!(
            "{} tie on {} between {:?} broken by {} -> {}",
            query, target, tied, policy, candidate
        );
    }

    Ok(Resolution {
        index,
        candidate,
        tally: tally.into_counts(),
        tied,
        tie_break,
    })
}

fn break_tie<S, R>(
    tied: &[usize],
    candidates: &CandidateSet,
    log: &[S],
    policy: TieBreakPolicy,
    rng: &mut R,
) -> Result<usize>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let chosen = match policy {
        TieBreakPolicy::Random => tied.choose(rng).copied(),
        TieBreakPolicy::FirstOption => tied.iter().copied().min(),
        TieBreakPolicy::FastestReached => {
            let first_seen = first_positions(log);
            // Never-seen candidates sort last; all-absent falls back to set order.
            tied.iter().copied().min_by_key(|&index| {
                let position = candidates
                    .key(index)
                    .and_then(|key| first_seen.get(key).copied())
                    .unwrap_or(usize::MAX);
                (position, index)
            })
        }
    };

    chosen.ok_or(PollError::EmptyCandidateSet)
}

/// Index of the first occurrence of each distinct entry in the log.
pub fn first_positions<S: AsRef<str>>(log: &[S]) -> HashMap<&str, usize> {
    let mut positions = HashMap::new();
    for (position, entry) in log.iter().enumerate() {
        positions.entry(entry.as_ref()).or_insert(position);
    }
    positions
}
