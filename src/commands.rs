//! commands.rs: user command parsing.
//!
//! Accepted forms: `/brush`, `/brush choose <alias>`, `/brush start|like|skip|read|save|refresh`.
//! The leading slash is optional and verbs are case-insensitive. Extra args passed
//! separately (e.g. button callbacks split by a chat adapter) are appended to the text.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "arg", rename_all = "snake_case")]
pub enum Command {
    Brush,
    /// Alias as typed; may be empty when the user omitted it.
    Choose(String),
    Start,
    Like,
    Skip,
    Read,
    Save,
    Refresh,
    Unknown(String),
}

impl Command {
    pub fn parse<S: AsRef<str>>(text: &str, args: &[S]) -> Command {
        let mut merged = text.trim().to_string();
        for a in args.iter().map(AsRef::as_ref).filter(|a| !a.trim().is_empty()) {
            merged.push(' ');
            merged.push_str(a.trim());
        }

        let mut parts = merged.split_whitespace();
        let head = parts.next().unwrap_or_default();
        if !head.trim_start_matches('/').eq_ignore_ascii_case("brush") {
            return Command::Unknown(merged);
        }

        let verb = parts.next().map(str::to_ascii_lowercase);
        let rest: Vec<&str> = parts.collect();
        match (verb.as_deref(), rest.as_slice()) {
            (None, _) => Command::Brush,
            (Some("choose"), [alias, ..]) => Command::Choose(alias.to_ascii_lowercase()),
            (Some("choose"), []) => Command::Choose(String::new()),
            (Some("start"), []) => Command::Start,
            (Some("like"), []) => Command::Like,
            (Some("skip"), []) => Command::Skip,
            (Some("read"), []) => Command::Read,
            (Some("save"), []) => Command::Save,
            (Some("refresh"), []) => Command::Refresh,
            _ => Command::Unknown(merged),
        }
    }

    /// Label used for the `commands_total` metric.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Brush => "brush",
            Command::Choose(_) => "choose",
            Command::Start => "start",
            Command::Like => "like",
            Command::Skip => "skip",
            Command::Read => "read",
            Command::Save => "save",
            Command::Refresh => "refresh",
            Command::Unknown(_) => "unknown",
        }
    }
}

impl std::str::FromStr for Command {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Command::parse::<&str>(s, &[]))
    }
}
