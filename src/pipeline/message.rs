//! Messages exchanged between producer and consumer, and the transports that carry them.

use std::{
    fmt,
    io::{BufRead, Write},
    thread,
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::{Error, ParseError, Record, Result};

/// Closed set of pipeline messages.
///
/// Encoded as JSON objects tagged by `"type"`, e.g. `{"type":"finished","records":2}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Start parsing `source` (worker only).
    Parse { source: String },
    Pause,
    Resume,
    Cancel,
    Record(Record),
    /// End of stream; `records` is the number of records delivered.
    Finished { records: u64 },
    Failed(ParseError),
    /// Acknowledges a `Cancel`.
    Cancelled,
}

impl Message {
    /// Messages travelling toward the producer.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Message::Parse { .. } | Message::Pause | Message::Resume | Message::Cancel
        )
    }

    /// Messages that end a job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Message::Finished { .. } | Message::Failed(_) | Message::Cancelled
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Parse { .. } => "parse",
            Message::Pause => "pause",
            Message::Resume => "resume",
            Message::Cancel => "cancel",
            Message::Record(_) => "record",
            Message::Finished { .. } => "finished",
            Message::Failed(_) => "failed",
            Message::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Outcome of a non-blocking send.
#[derive(Debug)]
pub enum Offer {
    Sent,
    /// The transport is saturated; the message is handed back untouched.
    Full(Message),
}

/// Sending half of a transport.
pub trait Outbox {
    /// Sends without blocking.
    fn offer(&mut self, msg: Message) -> Result<Offer>;

    /// Sends, waiting for room if needed.
    fn send(&mut self, msg: Message) -> Result<()>;
}

impl Outbox for Sender<Message> {
    fn offer(&mut self, msg: Message) -> Result<Offer> {
        match self.try_send(msg) {
            Ok(()) => Ok(Offer::Sent),
            Err(TrySendError::Full(msg)) => Ok(Offer::Full(msg)),
            Err(TrySendError::Disconnected(_)) => Err(Error::Disconnected),
        }
    }

    fn send(&mut self, msg: Message) -> Result<()> {
        Sender::send(self, msg).map_err(|_| Error::Disconnected)
    }
}

impl<O: Outbox + ?Sized> Outbox for &mut O {
    fn offer(&mut self, msg: Message) -> Result<Offer> {
        (**self).offer(msg)
    }

    fn send(&mut self, msg: Message) -> Result<()> {
        (**self).send(msg)
    }
}

/// Writes one JSON message per line, flushing after each.
///
/// Never reports `Offer::Full`; a pipe bounds the data in flight by blocking the writer.
#[derive(Debug)]
pub struct JsonLines<W> {
    writer: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(writer: W) -> JsonLines<W> {
        JsonLines { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, msg: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, msg)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Outbox for JsonLines<W> {
    fn offer(&mut self, msg: Message) -> Result<Offer> {
        self.write(&msg)?;
        Ok(Offer::Sent)
    }

    fn send(&mut self, msg: Message) -> Result<()> {
        self.write(&msg)
    }
}

/// Decodes JSON lines from `input` on a background thread.
///
/// The returned channel disconnects at end of input or on the first undecodable line.
pub fn spawn_reader<R>(input: R, capacity: usize) -> Result<Receiver<Message>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = bounded(capacity);
    thread::Builder::new()
        .name("message-reader".into())
        .spawn(move || {
            for line in input.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        error!("failed to read message: {}", err);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Message>(&line) {
                    Ok(msg) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        error!("undecodable message: {}", err);
                        break;
                    }
                }
            }
            debug!("message stream closed");
        })?;
    Ok(rx)
}
