use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::utils::normalize_response;

/// One broadcast chat message pulled off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub viewer: String,
    pub message: String,
}

impl ChatEntry {
    pub fn new(viewer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            viewer: viewer.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CandidateOption {
    label: String,
    key: String,
}

/// Ordered poll options. Order decides `FirstOption` precedence and the
/// indices reported in a [`Tally`](crate::tally::Tally).
///
/// Each option keeps the label it was given plus a normalized match key, so
/// `"Yes"` as an option still matches a viewer typing `yes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    options: Vec<CandidateOption>,
}

impl CandidateSet {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options
            .into_iter()
            .map(|option| {
                let label = option.into();
                let key = normalize_response(&label);
                CandidateOption { label, key }
            })
            .collect();
        Self { options }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(|o| o.label.as_str())
    }

    pub fn key(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(|o| o.key.as_str())
    }

    /// `normalized` must already be trimmed and lowercased.
    pub fn contains_key(&self, normalized: &str) -> bool {
        self.options.iter().any(|o| o.key == normalized)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.key.as_str())
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// Uniform pick among the tied candidates.
    Random,
    /// Earliest candidate in set order.
    FirstOption,
    /// Candidate whose first vote landed earliest in the cycle.
    FastestReached,
}

impl Default for TieBreakPolicy {
    fn default() -> Self {
        Self::FirstOption
    }
}

impl fmt::Display for TieBreakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Random => "random",
            Self::FirstOption => "first_option",
            Self::FastestReached => "fastest_reached",
        };
        f.write_str(name)
    }
}

impl FromStr for TieBreakPolicy {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random" => Ok(Self::Random),
            "first_option" | "first" => Ok(Self::FirstOption),
            "fastest_reached" | "fastest" => Ok(Self::FastestReached),
            other => Err(PollError::InvalidConfig(format!(
                "unknown tie-break policy: {other}"
            ))),
        }
    }
}

/// Which extreme of the tally a resolution looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollQuery {
    MostCommon,
    LeastCommon,
}

impl Default for PollQuery {
    fn default() -> Self {
        Self::MostCommon
    }
}

impl fmt::Display for PollQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MostCommon => f.write_str("most_common"),
            Self::LeastCommon => f.write_str("least_common"),
        }
    }
}

impl FromStr for PollQuery {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "most_common" | "most" => Ok(Self::MostCommon),
            "least_common" | "least" => Ok(Self::LeastCommon),
            other => Err(PollError::InvalidConfig(format!("unknown poll query: {other}"))),
        }
    }
}

/// Result of one resolver call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub index: usize,
    pub candidate: String,
    pub tally: Vec<usize>,
    pub tied: Vec<usize>,
    /// Set only when more than one candidate shared the extreme value.
    pub tie_break: Option<TieBreakPolicy>,
}

/// What a cycle emits when its timer expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub cycle: u64,
    pub query: PollQuery,
    pub resolution: Resolution,
    pub entries: usize,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub candidates: Vec<String>,
    pub dedup_per_viewer: bool,
    pub tie_break: TieBreakPolicy,
    pub query: PollQuery,
    pub cycle_duration_ms: u64,
    pub rng_seed: Option<u64>,
    /// File that [`TranscriptFileSink`](crate::sinks::TranscriptFileSink)
    /// appends accepted chat to.
    pub transcript_path: Option<PathBuf>,
    /// How many recent chat lines to keep in memory; `None` keeps all.
    pub transcript_limit: Option<usize>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            candidates: vec!["yes".to_string(), "no".to_string()],
            dedup_per_viewer: false,
            tie_break: TieBreakPolicy::FirstOption,
            query: PollQuery::MostCommon,
            cycle_duration_ms: 30_000,
            rng_seed: None,
            transcript_path: None,
            transcript_limit: None,
        }
    }
}

impl PollConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PollConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cycle_duration_ms == 0 {
            return Err(PollError::InvalidConfig(
                "cycle_duration_ms must be positive".to_string(),
            ));
        }
        if self.candidates.is_empty() {
            return Err(PollError::InvalidConfig(
                "at least one candidate is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cycle_duration(&self) -> Duration {
        Duration::from_millis(self.cycle_duration_ms)
    }

    pub fn candidate_set(&self) -> CandidateSet {
        CandidateSet::new(self.candidates.iter().cloned())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("candidate set is empty")]
    EmptyCandidateSet,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, PollError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn candidate_keys_are_normalized_but_labels_kept() {
        let set = CandidateSet::new(["  Yes ", "NO"]);
        assert_eq!(set.label(0), Some("  Yes "));
        assert_eq!(set.key(0), Some("yes"));
        assert!(set.contains_key("no"));
        assert!(!set.contains_key("NO"));
    }

    #[test]
    fn config_rejects_zero_duration_and_empty_candidates() {
        let mut config = PollConfig::default();
        config.cycle_duration_ms = 0;
        assert!(matches!(config.validate(), Err(PollError::InvalidConfig(_))));

        let mut config = PollConfig::default();
        config.candidates.clear();
        assert!(matches!(config.validate(), Err(PollError::InvalidConfig(_))));

        assert!(PollConfig::default().validate().is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PollConfig =
            serde_json::from_str(r#"{"candidates":["a","b"],"tie_break":"fastest_reached"}"#)
                .unwrap();
        assert_eq!(config.candidates, vec!["a", "b"]);
        assert_eq!(config.tie_break, TieBreakPolicy::FastestReached);
        assert_eq!(config.query, PollQuery::MostCommon);
        assert_eq!(config.cycle_duration_ms, 30_000);
    }

    #[test]
    fn config_loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config should be created");
        write!(
            file,
            r#"{{"candidates":["left","right"],"dedup_per_viewer":true,"cycle_duration_ms":5000,"transcript_limit":50}}"#
        )
        .expect("config should be written");

        let config = PollConfig::from_json_file(file.path()).expect("config should load");
        assert!(config.dedup_per_viewer);
        assert_eq!(config.cycle_duration(), Duration::from_secs(5));
        assert_eq!(config.candidate_set().len(), 2);
        assert_eq!(config.transcript_limit, Some(50));
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let dir = tempfile::TempDir::new().expect("temp dir should be created");
        let path = dir.path().join("poll.json");
        std::fs::write(&path, r#"{"cycle_duration_ms":0}"#).expect("config should be written");
        assert!(matches!(
            PollConfig::from_json_file(&path),
            Err(PollError::InvalidConfig(_))
        ));

        assert!(matches!(
            PollConfig::from_json_file(&dir.path().join("missing.json")),
            Err(PollError::Io(_))
        ));
    }

    #[test]
    fn policies_parse_from_cli_spellings() {
        assert_eq!("fastest-reached".parse::<TieBreakPolicy>().unwrap(), TieBreakPolicy::FastestReached);
        assert_eq!("Random".parse::<TieBreakPolicy>().unwrap(), TieBreakPolicy::Random);
        assert_eq!("least".parse::<PollQuery>().unwrap(), PollQuery::LeastCommon);
        assert!("loudest".parse::<TieBreakPolicy>().is_err());
    }
}
