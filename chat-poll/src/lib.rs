pub mod types;
pub mod utils;
pub mod parser;
pub mod filter;
pub mod tally;
pub mod resolver;
pub mod transcript;
pub mod cycle;
pub mod traits;
pub mod sources;
pub mod sinks;
pub mod engine;

pub use types::*;
pub use parser::{parse_chat_line, ChatLineParser};
pub use filter::{FilterDecision, ResponseFilter};
pub use tally::Tally;
pub use resolver::{least_common, most_common, resolve};
pub use transcript::{Transcript, TranscriptLine};
pub use cycle::{CycleManager, CycleState, Ingested};
pub use traits::{LineSource, PollSink};
pub use sources::{ChannelLineSource, ReaderLineSource};
pub use sinks::{ChannelSink, JsonLinesSink, TeeSink, TracingSink, TranscriptFileSink};
pub use engine::{PollEngine, RunSummary};
