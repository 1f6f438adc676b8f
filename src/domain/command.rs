//! Inbound chat commands
//!
//! One parse step turns a raw message into a [`Command`], which the
//! dispatcher then matches exhaustively.

use serde::{Deserialize, Serialize};

use super::allowlist::{AllowList, GETLOG_KEYWORD, RUNSCRIPT_KEYWORD};

/// Character that marks a message as a command
pub const TRIGGER: char = '/';

/// Who sent an inbound message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    #[default]
    User,
    Bot,
}

/// One inbound chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub raw_text: String,
    pub source_role: SourceRole,
}

impl CommandRequest {
    #[must_use]
    pub fn new(raw_text: impl Into<String>, source_role: SourceRole) -> Self {
        Self {
            raw_text: raw_text.into(),
            source_role,
        }
    }

    #[must_use]
    pub fn from_user(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, SourceRole::User)
    }

    /// Only non-empty messages from users get any reply
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        self.source_role == SourceRole::User && !self.raw_text.trim().is_empty()
    }
}

/// Keyword and whitespace-separated arguments of a `/command`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub keyword: String,
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// Split command text, with or without its leading trigger
    ///
    /// The keyword is whatever directly follows the trigger, so `/ df` has
    /// an empty keyword. Runs of whitespace between arguments collapse.
    #[must_use]
    pub fn split(text: &str) -> Self {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix(TRIGGER).unwrap_or(trimmed);
        let mut tokens = body.split(char::is_whitespace);
        let keyword = tokens.next().unwrap_or_default().to_string();
        Self {
            keyword,
            args: tokens
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Canned answers to plain text (no trigger)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    Hi,
    Hello,
    Help,
    /// Anything else: the introduction with usage examples
    Intro,
}

impl Greeting {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "hi" => Self::Hi,
            "hello" => Self::Hello,
            "help" => Self::Help,
            _ => Self::Intro,
        }
    }
}

/// What one inbound message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Not from a user, or empty: no reply at all
    Ignored,
    PlainText(Greeting),
    /// Fetch a remote file; `path` is the arguments joined with single spaces
    GetLog { path: String },
    RunScript { name: String },
    AllowListed { keyword: String, command: String },
    Unrecognized { keyword: String },
}

impl Command {
    /// Classify a request against the allow-list
    ///
    /// `getlog` without arguments and `runscript` without exactly one
    /// argument are looked up in the allow-list like any other keyword.
    #[must_use]
    pub fn parse(request: &CommandRequest, allow_list: &AllowList) -> Self {
        if !request.is_actionable() {
            return Self::Ignored;
        }

        let text = request.raw_text.trim();
        if !text.starts_with(TRIGGER) {
            return Self::PlainText(Greeting::from_text(text));
        }

        let ParsedCommand { keyword, args } = ParsedCommand::split(text);

        match (keyword.as_str(), args.as_slice()) {
            (GETLOG_KEYWORD, [_, ..]) => {
                return Self::GetLog {
                    path: args.join(" "),
                };
            }
            (RUNSCRIPT_KEYWORD, [name]) => return Self::RunScript { name: name.clone() },
            _ => {}
        }

        match allow_list.lookup(&keyword) {
            Ok(command) => Self::AllowListed {
                command: command.to_string(),
                keyword,
            },
            Err(_) => Self::Unrecognized { keyword },
        }
    }

    /// Whether handling this command touches the remote host
    #[must_use]
    pub const fn needs_remote(&self) -> bool {
        matches!(
            self,
            Self::GetLog { .. } | Self::RunScript { .. } | Self::AllowListed { .. }
        )
    }
}
