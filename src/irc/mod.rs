//! Wire framing and command routing.

pub mod line;
pub(crate) mod router;

/// Informational replies dropped before dispatch: whois footer,
/// topic-set-time, end-of-names, and the MOTD numerics. They carry no
/// actionable state.
pub(crate) const IGNORED_REPLIES: [&str; 6] = ["318", "333", "366", "372", "375", "376"];

/// A framed command line, tokenized on single spaces.
///
/// Joining the tail tokens back with single spaces reconstructs trailing
/// text losslessly, including runs of spaces inside message bodies.
#[derive(Debug, Clone)]
pub struct Line {
    raw: String,
    parts: Vec<String>,
}

impl Line {
    /// Split a decoded line. Blank lines yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_owned(),
            parts: raw.split(' ').map(str::to_owned).collect(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn part(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }

    /// The command verb: the second token. (The first is the sender prefix
    /// on everything except keep-alive probes.)
    pub fn verb(&self) -> Option<&str> {
        self.part(1)
    }

    /// Join the tokens from `index` on, dropping the leading `:` of a
    /// trailing argument.
    pub fn text_from(&self, index: usize) -> String {
        if index >= self.parts.len() {
            return String::new();
        }
        let joined = self.parts[index..].join(" ");
        match joined.strip_prefix(':') {
            Some(stripped) => stripped.to_owned(),
            None => joined,
        }
    }

    /// Nick portion of a `:nick!user@host` sender prefix.
    pub fn sender_nick(&self) -> Option<&str> {
        let prefix = self.part(0)?.strip_prefix(':')?;
        prefix.split(['!', '@']).next().filter(|nick| !nick.is_empty())
    }
}
