//! Commands a host can send to the outline

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Toggle,
    Show,
    Hide,
    Next,
    Prev,
    Refresh,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Toggle,
        Command::Show,
        Command::Hide,
        Command::Next,
        Command::Prev,
        Command::Refresh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Toggle => "toggle",
            Command::Show => "show",
            Command::Hide => "hide",
            Command::Next => "next",
            Command::Prev => "prev",
            Command::Refresh => "refresh",
        }
    }
}

impl FromStr for Command {
    type Err = TocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Command::ALL
            .into_iter()
            .find(|command| command.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| TocError::UnknownCommand(name.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
