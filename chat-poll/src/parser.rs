use crate::types::ChatEntry;
use crate::utils::trim_line_ending;
use tracing::debug;

/// Token that marks a line as a broadcast chat message.
pub const CHAT_MARKER: &str = "PRIVMSG";

/// How a single raw line was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Not chat traffic (pings, acks, membership notices).
    Other,
    /// Carried the marker but lacked the `!` or `:` delimiters.
    Malformed,
    Chat(ChatEntry),
}

/// Counters kept by [`ChatLineParser`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub lines_seen: u64,
    pub entries_parsed: u64,
    pub malformed: u64,
}

pub struct ChatLineParser {
    stats: ParserStats,
}

impl ChatLineParser {
    pub fn new() -> Self {
        Self {
            stats: ParserStats::default(),
        }
    }

    /// Turn one raw protocol line into a chat entry. Anything that is not a
    /// well-formed broadcast yields `None`.
    pub fn parse_line(&mut self, line: &str) -> Option<ChatEntry> {
        self.stats.lines_seen += 1;

        match classify_line(line) {
            LineKind::Chat(entry) => {
                self.stats.entries_parsed += 1;
                Some(entry)
            }
            LineKind::Malformed => {
                self.stats.malformed += 1;
                debug!("Dropping malformed chat line: {:?}", trim_line_ending(line));
                None
            }
            LineKind::Other => None,
        }
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ParserStats::default();
    }
}

impl Default for ChatLineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateless variant of [`ChatLineParser::parse_line`].
pub fn parse_chat_line(line: &str) -> Option<ChatEntry> {
    match classify_line(line) {
        LineKind::Chat(entry) => Some(entry),
        _ => None,
    }
}

/// Positional extraction: the sender runs from byte 1 to the first `!`,
/// the text starts after the first `:` that follows it.
pub fn classify_line(line: &str) -> LineKind {
    if !line.contains(CHAT_MARKER) {
        return LineKind::Other;
    }

    let Some(bang) = line.get(1..).and_then(|rest| rest.find('!')).map(|i| i + 1) else {
        return LineKind::Malformed;
    };

    let viewer = &line[1..bang];
    if viewer.is_empty() {
        return LineKind::Malformed;
    }

    let after_bang = bang + 1;
    let Some(colon) = line[after_bang..].find(':').map(|i| i + after_bang) else {
        return LineKind::Malformed;
    };

    let message = trim_line_ending(&line[colon + 1..]);

    LineKind::Chat(ChatEntry::new(viewer, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = ":alice!alice@alice.tmi.twitch.tv PRIVMSG #channel :Yes please\r\n";

    #[test]
    fn extracts_viewer_and_message() {
        let entry = parse_chat_line(LINE).expect("chat line should parse");
        assert_eq!(entry.viewer, "alice");
        assert_eq!(entry.message, "Yes please");
    }

    #[test]
    fn message_keeps_later_colons() {
        let entry =
            parse_chat_line(":bob!bob@host PRIVMSG #c :time is 10:30").expect("should parse");
        assert_eq!(entry.message, "time is 10:30");
    }

    #[test]
    fn non_chat_traffic_is_ignored() {
        assert_eq!(classify_line("PING :tmi.twitch.tv"), LineKind::Other);
        assert_eq!(
            classify_line(":tmi.twitch.tv 001 bot :Welcome, GLHF!"),
            LineKind::Other
        );
        assert_eq!(classify_line(""), LineKind::Other);
    }

    #[test]
    fn missing_delimiters_are_malformed_not_fatal() {
        assert_eq!(classify_line("PRIVMSG without delimiters"), LineKind::Malformed);
        assert_eq!(classify_line(":carol@host PRIVMSG #c :hi"), LineKind::Malformed);
        assert_eq!(classify_line(":dave!dave@host PRIVMSG #c no colon"), LineKind::Malformed);
        assert_eq!(classify_line(":!x@host PRIVMSG #c :empty sender"), LineKind::Malformed);
    }

    #[test]
    fn parser_counts_lines() {
        let mut parser = ChatLineParser::new();
        assert!(parser.parse_line(LINE).is_some());
        assert!(parser.parse_line("PING :tmi.twitch.tv").is_none());
        assert!(parser.parse_line("PRIVMSG broken").is_none());

        let stats = parser.stats();
        assert_eq!(stats.lines_seen, 3);
        assert_eq!(stats.entries_parsed, 1);
        assert_eq!(stats.malformed, 1);

        parser.reset_stats();
        assert_eq!(parser.stats(), ParserStats::default());
    }
}
