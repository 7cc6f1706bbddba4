//! IRC wire protocol: inbound line parsing and outbound line formatting
//!
//! Parsing covers the prefixed server line shape
//! `:<source>!user@host <COMMAND> <target> :<trailing>`. Lines without
//! the leading prefix marker carry no structured fields and are handled
//! by literal-prefix matching only (keep-alive probes in particular).

/// One parsed inbound protocol line
///
/// Ephemeral: built for a single readiness event and discarded once
/// dispatch for that event completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// Nick portion of the line prefix (left of the first `!`)
    pub source: String,
    /// Protocol command, e.g. `PRIVMSG` or `JOIN`
    pub command: String,
    /// Message target (channel or nick), when present
    pub target: Option<String>,
    /// Text after the trailing colon, when present
    pub trailing: Option<String>,
}

impl IrcMessage {
    /// Parse one raw line, returning `None` when the line carries no
    /// structured fields (missing prefix marker or command token).
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(':')?;
        let (prefix, rest) = rest.split_once(' ')?;

        let mut words = rest.splitn(2, ' ');
        let command = words.next().filter(|c| !c.is_empty())?.to_string();
        let remainder = words
            .next()
            .unwrap_or("")
            .trim_end_matches(['\r', '\n']);

        let (target, trailing) = match remainder.split_once(':') {
            Some((target, trailing)) => {
                (non_empty(target.trim_end()), Some(trailing.to_string()))
            }
            None => (non_empty(remainder), None),
        };

        let source = prefix.split('!').next().unwrap_or(prefix).to_string();

        Some(Self {
            source,
            command,
            target,
            trailing,
        })
    }

    /// Target, or `""` when the line had none
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or("")
    }

    /// Trailing parameter, or `""` when the line had none
    pub fn trailing(&self) -> &str {
        self.trailing.as_deref().unwrap_or("")
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Whether a raw line is a server keep-alive probe
///
/// Checked on the raw bytes before any parsing; a probe bypasses the
/// command tables entirely.
pub fn is_keepalive(line: &str) -> bool {
    line.get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("ping"))
}

/// Reply to a keep-alive probe
pub fn pong() -> String {
    "PONG".to_string()
}

/// Identity-announce line of the registration handshake
pub fn user(nick: &str, description: &str) -> String {
    format!("user {nick} 0 *: {description}")
}

/// Nickname-request line of the registration handshake
pub fn nick(nick: &str) -> String {
    format!("nick {nick}")
}

/// Channel join request (`channel` given without the `#`)
pub fn join(channel: &str) -> String {
    format!("join #{channel}")
}

/// Message to a channel or nick
pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {target} :{text}")
}
