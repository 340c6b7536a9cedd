/// Case-fold and trim a chat message so it can be compared against
/// candidate keys.
pub fn normalize_response(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Strip the line terminator the wire leaves on a raw line.
pub fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(&['\r', '\n'][..])
}

/// Time utilities
pub mod time {
    use std::time::Duration;

    /// Format a countdown the way an overlay shows it: `m:ss`, or `s.s`
    /// once under ten seconds.
    pub fn format_remaining(remaining: Duration) -> String {
        let total_ms = remaining.as_millis();
        if total_ms < 10_000 {
            let tenths = total_ms / 100;
            return format!("{}.{}", tenths / 10, tenths % 10);
        }

        let total_seconds = remaining.as_secs();
        format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
    }

    /// Subtract an elapsed tick from a countdown, stopping at zero.
    pub fn countdown(remaining: Duration, elapsed: Duration) -> Duration {
        remaining.saturating_sub(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_response("  YeS \t"), "yes");
        assert_eq!(normalize_response(""), "");
    }

    #[test]
    fn line_endings_are_stripped() {
        assert_eq!(trim_line_ending("hello\r\n"), "hello");
        assert_eq!(trim_line_ending("hello"), "hello");
        assert_eq!(trim_line_ending(" hi \n"), " hi ");
    }

    #[test]
    fn remaining_time_formats() {
        assert_eq!(time::format_remaining(Duration::from_secs(75)), "1:15");
        assert_eq!(time::format_remaining(Duration::from_millis(9_450)), "9.4");
        assert_eq!(time::format_remaining(Duration::ZERO), "0.0");
    }

    #[test]
    fn countdown_saturates() {
        assert_eq!(
            time::countdown(Duration::from_secs(1), Duration::from_secs(3)),
            Duration::ZERO
        );
    }
}
