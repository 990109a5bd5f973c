use std::{borrow::Cow, fmt, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembler::Element;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error reported by a `RecordSink`.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Location of a tokenizer event within the input (zero based, as reported by `xml-rs`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: u64,
    pub column: u64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

/// What went wrong while assembling records.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ParseErrorKind {
    #[error("unexpected <{element}> {context}")]
    UnexpectedOpen {
        element: Element,
        context: Cow<'static, str>,
    },
    #[error("unexpected </{element}> {context}")]
    UnexpectedClose {
        element: Element,
        context: Cow<'static, str>,
    },
    #[error("<{element}> is missing the `{attribute}` attribute")]
    MissingAttribute {
        element: Element,
        attribute: Cow<'static, str>,
    },
    #[error("input ended inside <{open}>")]
    Truncated { open: Element },
    #[error("malformed input: {message}")]
    Decode { message: String },
    #[error("line {line} has no key delimiter")]
    InvalidLine { line: u64 },
    #[error("line {line} holds no record")]
    MissingRecord { line: u64 },
    #[error("assembler already failed")]
    Poisoned,
}

/// Fatal parse failure, tagged with the (1-based) number of the record being assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub record: u64,
    pub position: Option<Position>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(record: u64, kind: ParseErrorKind) -> ParseError {
        ParseError {
            record,
            position: None,
            kind,
        }
    }

    pub fn at(mut self, position: Position) -> ParseError {
        self.position = Some(position);
        self
    }

    /// Returns `true` if the input ended with structures still open.
    pub fn is_truncation(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Truncated { .. })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}", self.record)?;
        if let Some(position) = self.position {
            write!(f, " at {}", position)?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl ::std::error::Error for ParseError {}

/// Errors of this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("consumer failed: {0}")]
    Consumer(String),
    #[error("job was cancelled")]
    Cancelled,
    #[error("channel closed before the end of the stream")]
    Disconnected,
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("message encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration syntax error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("XML error: {0}")]
    XmlWrite(#[from] xml::writer::Error),
}

impl Error {
    /// Number of the record a parse error occurred in, if this is a parse error.
    pub fn record_number(&self) -> Option<u64> {
        match self {
            Error::Parse(err) => Some(err.record),
            _ => None,
        }
    }
}

impl From<SinkError> for Error {
    fn from(err: SinkError) -> Error {
        Error::Consumer(err.to_string())
    }
}
