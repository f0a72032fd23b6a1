/// Error detection: scan reconstructed console text for the fatal error line.
///
/// The target prints `Error: undefined` at the start of a line when it has
/// wedged. Occurrences in the middle of a line are ordinary log output and
/// do not count.
use regex::Regex;
use std::sync::LazyLock;

/// Literal the target prints when it needs to be restarted.
pub const ERROR_PATTERN: &str = "Error: undefined";

/// Line-anchored, case-sensitive matcher for [`ERROR_PATTERN`].
static ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?m)^{}", regex::escape(ERROR_PATTERN))).unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPatternMatcher;

impl ErrorPatternMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if any line of `text` begins with the error literal.
    pub fn matches(&self, text: &str) -> bool {
        let found = ERROR_LINE.find(text);
        if let Some(m) = &found {
            tracing::debug!(offset = m.start(), "error pattern matched");
        }
        found.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_at_start_of_first_line() {
        assert!(ErrorPatternMatcher::new().matches("Error: undefined\nfoo"));
    }

    #[test]
    fn test_match_at_start_of_later_line() {
        assert!(ErrorPatternMatcher::new().matches("starting up\nconnected\nError: undefined   "));
    }

    #[test]
    fn test_match_with_trailing_text() {
        assert!(ErrorPatternMatcher::new().matches("Error: undefined is not a function"));
    }

    #[test]
    fn test_mid_line_does_not_match() {
        assert!(!ErrorPatternMatcher::new().matches("foo Error: undefined"));
    }

    #[test]
    fn test_indented_does_not_match() {
        assert!(!ErrorPatternMatcher::new().matches("ok\n  Error: undefined"));
    }

    #[test]
    fn test_empty_text() {
        assert!(!ErrorPatternMatcher::new().matches(""));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!ErrorPatternMatcher::new().matches("error: undefined"));
        assert!(!ErrorPatternMatcher::new().matches("ERROR: UNDEFINED"));
    }

    #[test]
    fn test_other_errors_ignored() {
        assert!(!ErrorPatternMatcher::new().matches("Error: timeout\nError: undef"));
    }
}
