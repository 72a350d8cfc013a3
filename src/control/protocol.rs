//! Line protocol spoken over the control socket.
//!
//! One command per connection, one response line back:
//!
//! ```text
//! → ADD /abs/path/notes.md\n      ← OK http://localhost:6333/?file=/abs/path/notes.md\n
//! → STOP\n                        ← OK stopping\n
//! → anything else\n               ← ERROR invalid command: ...\n
//! ```
//!
//! Paths are not escaped. `ADD` takes everything after the first space, so
//! spaces inside paths survive; a newline cannot be expressed.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(PathBuf),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Keyword was `ADD` but no path followed
    #[error("invalid command: expected 'ADD <path>'")]
    MissingPath,

    #[error("invalid command: expected 'ADD <path>' or 'STOP'")]
    Unknown,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        match line.split_once(' ') {
            Some(("ADD", path)) if !path.trim().is_empty() => Ok(Self::Add(PathBuf::from(path))),
            None if line == "ADD" => Err(ParseError::MissingPath),
            None if line == "STOP" => Ok(Self::Stop),
            _ => Err(ParseError::Unknown),
        }
    }

    /// Wire form, newline included.
    pub fn to_line(&self) -> String {
        match self {
            Self::Add(path) => format!("ADD {}\n", path.display()),
            Self::Stop => "STOP\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok(String),
    Error(String),
}

impl Response {
    /// `None` for anything that is neither `OK ...` nor `ERROR ...`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(body) = line.strip_prefix("OK ") {
            Some(Self::Ok(body.to_string()))
        } else {
            line.strip_prefix("ERROR ")
                .map(|reason| Self::Error(reason.to_string()))
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            Self::Ok(body) => format!("OK {body}\n"),
            Self::Error(reason) => format!("ERROR {reason}\n"),
        }
    }
}
