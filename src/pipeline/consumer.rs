use std::collections::VecDeque;

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, error, info, warn};

use super::message::{Message, Outbox};
use crate::{config::PipelineConfig, context::Progress, Error, Record, Result, SinkError};

/// Destination of parsed records, e.g. a bulk loader.
pub trait RecordSink {
    /// Writes one batch, in order.
    fn write_batch(&mut self, batch: Vec<Record>) -> Result<(), SinkError>;

    /// Called once after the last batch of a clean run.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl RecordSink for Vec<Record> {
    fn write_batch(&mut self, batch: Vec<Record>) -> Result<(), SinkError> {
        self.extend(batch);
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn write_batch(&mut self, batch: Vec<Record>) -> Result<(), SinkError> {
        (**self).write_batch(batch)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Watermark transitions reported by [`Intake`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pressure {
    Normal,
    /// Just reached `high_water`.
    Saturated,
    /// Just fell to `low_water` after being saturated.
    Drained,
}

/// Consumer-side buffer in front of a [`RecordSink`].
#[derive(Debug)]
pub struct Intake<S> {
    sink: S,
    buffer: VecDeque<Record>,
    high_water: usize,
    low_water: usize,
    batch_size: usize,
    saturated: bool,
    batches: u64,
    written: u64,
}

impl<S: RecordSink> Intake<S> {
    pub fn new(sink: S, config: &PipelineConfig) -> Intake<S> {
        Intake {
            sink,
            buffer: VecDeque::with_capacity(config.high_water),
            high_water: config.high_water,
            low_water: config.low_water,
            batch_size: config.batch_size,
            saturated: false,
            batches: 0,
            written: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Buffers a record. Never writes to the sink.
    pub fn accept(&mut self, record: Record) -> Pressure {
        self.buffer.push_back(record);
        if !self.saturated && self.buffer.len() >= self.high_water {
            self.saturated = true;
            Pressure::Saturated
        } else {
            Pressure::Normal
        }
    }

    /// Whether a batch is worth writing now.
    pub fn should_drain(&self) -> bool {
        self.buffer.len() >= self.batch_size || (self.saturated && !self.buffer.is_empty())
    }

    /// Writes one batch of up to `batch_size` records.
    pub fn drain(&mut self) -> Result<Pressure, SinkError> {
        let n = self.batch_size.min(self.buffer.len());
        if n == 0 {
            return Ok(Pressure::Normal);
        }
        let batch: Vec<Record> = self.buffer.drain(..n).collect();
        self.sink.write_batch(batch)?;
        self.batches += 1;
        self.written += n as u64;

        if self.saturated && self.buffer.len() <= self.low_water {
            self.saturated = false;
            Ok(Pressure::Drained)
        } else {
            Ok(Pressure::Normal)
        }
    }

    /// Flushes every buffered record and finishes the sink.
    pub fn finish(mut self) -> Result<S, SinkError> {
        while !self.buffer.is_empty() {
            self.drain()?;
        }
        self.sink.finish()?;
        Ok(self.sink)
    }
}

/// Outcome of a clean run.
#[derive(Debug)]
pub struct Completion<S> {
    pub sink: S,
    pub records: u64,
    pub batches: u64,
    /// Number of times the producer was asked to pause.
    pub pauses: u64,
}

/// Receiving side of a pipeline.
#[derive(Debug)]
pub struct Consumer<S, O> {
    intake: Intake<S>,
    inbox: Receiver<Message>,
    control: O,
    progress: Progress,
    records: u64,
    pauses: u64,
}

impl<S, O> Consumer<S, O>
where
    S: RecordSink,
    O: Outbox,
{
    pub fn new(
        intake: Intake<S>,
        inbox: Receiver<Message>,
        control: O,
        progress: Progress,
    ) -> Self {
        Consumer {
            intake,
            inbox,
            control,
            progress,
            records: 0,
            pauses: 0,
        }
    }

    /// Receives until the producer's terminal message.
    pub fn run(mut self) -> Result<Completion<S>> {
        loop {
            let msg = if self.intake.should_drain() {
                match self.inbox.try_recv() {
                    Ok(msg) => msg,
                    Err(TryRecvError::Empty) => {
                        self.drain()?;
                        continue;
                    }
                    Err(TryRecvError::Disconnected) => return Err(Error::Disconnected),
                }
            } else {
                self.inbox.recv().map_err(|_| Error::Disconnected)?
            };

            match msg {
                Message::Record(record) => {
                    self.records += 1;
                    if self.intake.accept(record) == Pressure::Saturated {
                        debug!("intake saturated at {} records, pausing", self.intake.len());
                        self.pauses += 1;
                        self.signal(Message::Pause);
                    }
                }
                Message::Finished { records } => return self.complete(records),
                Message::Failed(err) => {
                    error!("producer failed: {}", err);
                    return Err(Error::Parse(err));
                }
                Message::Cancelled => {
                    info!("producer cancelled after {} records", self.records);
                    return Err(Error::Cancelled);
                }
                other => {
                    let err = Error::Protocol(format!(
                        "unexpected `{}` message on the data channel",
                        other
                    ));
                    error!("{}", err);
                    return Err(self.abandon(err));
                }
            }
        }
    }

    /// Sends `Pause` or `Resume`. The producer may already be gone after its terminal
    /// message, so a failed send is only logged.
    fn signal(&mut self, msg: Message) {
        let kind = msg.kind();
        if let Err(err) = self.control.send(msg) {
            warn!("could not send `{}` to the producer: {}", kind, err);
        }
    }

    fn drain(&mut self) -> Result<()> {
        let before = self.intake.written();
        match self.intake.drain() {
            Ok(pressure) => {
                self.progress.add(self.intake.written() - before);
                if pressure == Pressure::Drained {
                    debug!("intake drained to {} records, resuming", self.intake.len());
                    self.signal(Message::Resume);
                }
                Ok(())
            }
            Err(err) => {
                error!("sink failed after {} records: {}", self.intake.written(), err);
                Err(self.abandon(Error::Consumer(err.to_string())))
            }
        }
    }

    /// Cancels the producer and discards its messages up to the terminal one, so that
    /// nothing of this job is left on the data channel.
    fn abandon(&mut self, err: Error) -> Error {
        if let Err(send_err) = self.control.send(Message::Cancel) {
            warn!("could not cancel producer: {}", send_err);
            return err;
        }
        loop {
            match self.inbox.recv() {
                Ok(msg) if msg.is_terminal() => break,
                Ok(_) => (),
                Err(_) => break,
            }
        }
        err
    }

    fn complete(mut self, announced: u64) -> Result<Completion<S>> {
        if announced != self.records {
            return Err(Error::Protocol(format!(
                "producer announced {} records but {} arrived",
                announced, self.records
            )));
        }
        while !self.intake.is_empty() {
            let before = self.intake.written();
            self.intake.drain()?;
            self.progress.add(self.intake.written() - before);
        }
        let batches = self.intake.batches();
        let sink = self.intake.finish()?;

        self.progress.log();
        info!("finished: {} records in {} batches", self.records, batches);
        Ok(Completion {
            sink,
            records: self.records,
            batches,
            pauses: self.pauses,
        })
    }
}
