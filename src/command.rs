//! Generic ordered command table
//!
//! An append-only sequence of (prefix, handler) pairs with
//! first-match-wins lookup. Matching is a case-insensitive ASCII prefix
//! test, so `quit` matches the input `quitnow`. Specificity ordering is
//! the caller's responsibility; duplicate prefixes are legal and the
//! earliest registration wins.

/// Outcome of a dispatch attempt
///
/// `Unmatched` is a signal, never an error: the caller decides the
/// fallback (log it, treat the text as casual chat, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler matched and ran
    Handled,
    /// No registered prefix matched the input
    Unmatched,
}

/// Ordered prefix-to-handler table
#[derive(Debug, Default)]
pub struct CommandTable<H> {
    entries: Vec<(String, H)>,
}

impl<H> CommandTable<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a handler for a command prefix
    pub fn register(&mut self, prefix: impl Into<String>, handler: H) {
        self.entries.push((prefix.into(), handler));
    }

    /// Find the first handler whose prefix matches the input
    pub fn lookup(&self, input: &str) -> Option<&H> {
        self.entries
            .iter()
            .find(|(prefix, _)| matches_prefix(prefix, input))
            .map(|(_, handler)| handler)
    }

    /// Number of registered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-insensitive ASCII prefix match
pub fn matches_prefix(prefix: &str, input: &str) -> bool {
    input
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CommandTable<&'static str> {
        let mut t = CommandTable::new();
        t.register("list", "list");
        t.register("help", "help");
        t.register("quit", "quit");
        t.register("connect", "connect");
        t
    }

    #[test]
    fn test_exact_match() {
        let t = table();
        assert_eq!(t.lookup("help"), Some(&"help"));
        assert_eq!(t.lookup("connect irc.example.org a b c"), Some(&"connect"));
    }

    #[test]
    fn test_case_insensitive() {
        let t = table();
        assert_eq!(t.lookup("QUIT"), Some(&"quit"));
        assert_eq!(t.lookup("LiSt"), Some(&"list"));
    }

    #[test]
    fn test_prefix_only_match() {
        // "quit" registered first must win on input "quitnow"
        let mut t = table();
        t.register("quitnow", "quitnow");
        assert_eq!(t.lookup("quitnow"), Some(&"quit"));
    }

    #[test]
    fn test_first_registration_wins() {
        let mut t = CommandTable::new();
        t.register("cmd", 1);
        t.register("cmd", 2);
        assert_eq!(t.lookup("cmd"), Some(&1));
    }

    #[test]
    fn test_unmatched() {
        let t = table();
        assert!(t.lookup("unknown").is_none());
        assert!(t.lookup("").is_none());
        assert!(t.lookup("qui").is_none());
    }

    #[test]
    fn test_deterministic_lookup() {
        let t = table();
        for _ in 0..3 {
            assert_eq!(t.lookup("quit"), Some(&"quit"));
        }
    }
}
