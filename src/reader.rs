//! # Record readers
//!
//! [`Records`] reads a whole MARC XML document, either a `collection` or a lone `record`.
//! [`DelimitedRecords`] reads dumps holding one record per line, prefixed by a key and a tab.

use std::{
    io::{self, BufRead, BufReader, Read},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::debug;
use xml::{
    common::Position as _,
    reader::{EventReader, ParserConfig, XmlEvent},
};

use crate::{
    assembler::{Assembler, DEFAULT_IDENTIFIER_TAG},
    errors::{ParseError, ParseErrorKind, Position},
    Record, Tag,
};

/// Remembers whether the wrapped reader has reported end of file.
#[derive(Debug)]
struct EofTracking<R> {
    inner: R,
    eof: Arc<AtomicBool>,
}

impl<R: Read> Read for EofTracking<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.eof.store(true, Ordering::Relaxed);
        }
        Ok(n)
    }
}

/// Reads records from an `io::Read` implementor holding a MARC XML document.
///
/// The input is buffered internally. Yields records in document order. The iterator is
/// fused after the first error.
pub struct Records<R: Read> {
    reader: EventReader<EofTracking<BufReader<R>>>,
    assembler: Assembler,
    eof: Arc<AtomicBool>,
    done: bool,
}

impl<R: Read> Records<R> {
    pub fn new(input: R) -> Records<R> {
        Records::with_identifier_tag(input, DEFAULT_IDENTIFIER_TAG)
    }

    /// Takes record identifiers from the control field `tag` instead of `001`.
    pub fn with_identifier_tag<T: Into<Tag>>(input: R, tag: T) -> Records<R> {
        Records::buffered(BufReader::new(input), tag)
    }

    fn buffered<T: Into<Tag>>(input: BufReader<R>, tag: T) -> Records<R> {
        let eof = Arc::new(AtomicBool::new(false));
        let reader = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(true)
            .cdata_to_characters(true)
            .ignore_comments(true)
            .create_reader(EofTracking {
                inner: input,
                eof: eof.clone(),
            });
        Records {
            reader,
            assembler: Assembler::with_identifier_tag(tag),
            eof,
            done: false,
        }
    }

    /// Number of records read so far.
    pub fn count_read(&self) -> u64 {
        self.assembler.emitted()
    }

    fn xml_position(&self) -> Position {
        let pos = self.reader.position();
        Position {
            row: pos.row,
            column: pos.column,
        }
    }

    fn step(&mut self, event: XmlEvent) -> Result<Option<Record>, ParseError> {
        match event {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let attrs = attributes
                    .iter()
                    .map(|a| (a.name.local_name.as_str(), a.value.as_str()));
                self.assembler.on_open(&name.local_name, attrs)?;
                Ok(None)
            }
            XmlEvent::Characters(text) | XmlEvent::Whitespace(text) => {
                self.assembler.on_text(&text)?;
                Ok(None)
            }
            XmlEvent::EndElement { name } => self.assembler.on_close(&name.local_name),
            XmlEvent::EndDocument => {
                self.done = true;
                self.assembler.finish()?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn tokenizer_error(&mut self, err: xml::reader::Error) -> ParseError {
        let position = err.position();
        let kind = match self.assembler.open_element() {
            Some(open) if self.eof.load(Ordering::Relaxed) => ParseErrorKind::Truncated { open },
            _ => ParseErrorKind::Decode {
                message: err.msg().to_string(),
            },
        };
        self.assembler.abort(kind).at(Position {
            row: position.row,
            column: position.column,
        })
    }
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Record, ParseError>;

    fn next(&mut self) -> Option<Result<Record, ParseError>> {
        while !self.done {
            let result = match self.reader.next() {
                Ok(event) => self.step(event).map_err(|err| err.at(self.xml_position())),
                Err(err) => Err(self.tokenizer_error(err)),
            };
            match result {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => (),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<R: Read> std::fmt::Debug for Records<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("assembler", &self.assembler)
            .field("done", &self.done)
            .finish()
    }
}

/// Reads records from a delimited dump: one `key<TAB>xml` line per record.
///
/// Each line is parsed on its own and the key is kept as the record's `source_id`.
/// Blank lines are skipped.
#[derive(Debug)]
pub struct DelimitedRecords<R> {
    input: R,
    identifier_tag: Tag,
    line: u64,
    records: u64,
    buf: String,
    done: bool,
}

impl<R: BufRead> DelimitedRecords<R> {
    pub fn new(input: R) -> DelimitedRecords<R> {
        DelimitedRecords::with_identifier_tag(input, DEFAULT_IDENTIFIER_TAG)
    }

    pub fn with_identifier_tag<T: Into<Tag>>(input: R, tag: T) -> DelimitedRecords<R> {
        DelimitedRecords {
            input,
            identifier_tag: tag.into(),
            line: 0,
            records: 0,
            buf: String::new(),
            done: false,
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.records + 1, kind)
    }

    /// Parses the current line. `Ok(None)` for blank lines.
    fn parse_line(&self) -> Result<Option<Record>, ParseError> {
        let line = self.buf.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Ok(None);
        }
        let (key, payload) = line
            .split_once('\t')
            .ok_or_else(|| self.error(ParseErrorKind::InvalidLine { line: self.line }))?;

        // the line is already in memory, a buffer sized to it is enough
        let input = BufReader::with_capacity(payload.len().max(1), payload.as_bytes());
        let mut records = Records::buffered(input, self.identifier_tag.clone());
        match records.next() {
            Some(Ok(mut record)) => {
                record.set_source_id(key.to_string());
                Ok(Some(record))
            }
            Some(Err(mut err)) => {
                err.record = self.records + 1;
                if let Some(position) = err.position.as_mut() {
                    position.row = self.line - 1;
                }
                Err(err)
            }
            None => Err(self.error(ParseErrorKind::MissingRecord { line: self.line })),
        }
    }
}

impl<R: BufRead> Iterator for DelimitedRecords<R> {
    type Item = Result<Record, ParseError>;

    fn next(&mut self) -> Option<Result<Record, ParseError>> {
        while !self.done {
            self.buf.clear();
            match self.input.read_line(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    debug!("delimited input exhausted after {} lines", self.line);
                }
                Ok(_) => {
                    self.line += 1;
                    match self.parse_line() {
                        Ok(Some(record)) => {
                            self.records += 1;
                            return Some(Ok(record));
                        }
                        Ok(None) => (),
                        Err(err) => {
                            self.done = true;
                            return Some(Err(err));
                        }
                    }
                }
                Err(err) => {
                    self.done = true;
                    let kind = ParseErrorKind::Decode {
                        message: err.to_string(),
                    };
                    return Some(Err(self.error(kind)));
                }
            }
        }
        None
    }
}
