//! # Flow-controlled delivery of records
//!
//! A [`Producer`] pulls records from the parser and offers them to an [`Outbox`]. A
//! [`Consumer`] buffers them in an [`Intake`] and writes batches to a [`RecordSink`]. When the
//! intake reaches its high watermark the consumer sends `Pause`; once a drain brings it down
//! to the low watermark it sends `Resume`.
//!
//! [`Pipeline`] wires both ends together in one process over `crossbeam-channel`s;
//! [`worker`](crate::worker) does the same across a process boundary.

use std::{
    io::{BufReader, Read},
    panic, thread,
};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info};

pub mod consumer;
pub mod message;
pub mod producer;

pub use self::consumer::{Completion, Consumer, Intake, Pressure, RecordSink};
pub use self::message::{spawn_reader, JsonLines, Message, Offer, Outbox};
pub use self::producer::{Poll, Producer};

use crate::{
    config::{InputFormat, PipelineConfig},
    context::JobContext,
    DelimitedRecords, ParseError, Record, Records, Result,
};

/// Asks a running pipeline to stop.
///
/// The producer acknowledges with `Cancelled` and the run ends with `Error::Cancelled`.
#[derive(Debug, Clone)]
pub struct CancelHandle(Sender<Message>);

impl CancelHandle {
    /// Returns `false` if the pipeline is already gone.
    pub fn cancel(&self) -> bool {
        self.0.send(Message::Cancel).is_ok()
    }
}

/// In-process pipeline: producer on a scoped thread, consumer on the caller's thread.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    context: JobContext,
    data: (Sender<Message>, Receiver<Message>),
    control: (Sender<Message>, Receiver<Message>),
}

impl Pipeline {
    pub fn new(config: PipelineConfig, context: JobContext) -> Result<Pipeline> {
        config.validate()?;
        let context = context.with_progress_interval(config.progress_interval);
        let data = bounded(config.channel_capacity());
        let control = unbounded();
        Ok(Pipeline {
            config,
            context,
            data,
            control,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.control.0.clone())
    }

    /// Parses `input` in the configured format and delivers the records to `sink`.
    pub fn run<R, S>(self, input: R, sink: S) -> Result<Completion<S>>
    where
        R: Read + Send,
        S: RecordSink,
    {
        let tag = self.config.identifier_tag.clone();
        match self.config.format {
            InputFormat::Collection => {
                self.run_records(Records::with_identifier_tag(input, tag), sink)
            }
            InputFormat::Delimited => self.run_records(
                DelimitedRecords::with_identifier_tag(BufReader::new(input), tag),
                sink,
            ),
        }
    }

    /// Delivers records from any source, e.g. an already opened reader.
    pub fn run_records<I, S>(self, records: I, sink: S) -> Result<Completion<S>>
    where
        I: IntoIterator<Item = Result<Record, ParseError>>,
        I::IntoIter: Send,
        S: RecordSink,
    {
        let Pipeline {
            config,
            context,
            data: (data_tx, data_rx),
            control: (control_tx, control_rx),
        } = self;
        info!("{}: starting", context.name());

        let canceller = control_tx.clone();
        let producer = Producer::new(
            records.into_iter(),
            data_tx,
            control_rx,
            context.progress("parsed"),
        );
        let consumer = Consumer::new(
            Intake::new(sink, &config),
            data_rx,
            control_tx,
            context.progress("written"),
        );

        thread::scope(|s| {
            let handle = thread::Builder::new()
                .name("marc-producer".into())
                .spawn_scoped(s, move || producer.run())?;
            let outcome = consumer.run();
            if outcome.is_err() {
                // unblocks a producer still waiting for `Resume`
                let _ = canceller.send(Message::Cancel);
            }
            let produced = handle.join().unwrap_or_else(|e| panic::resume_unwind(e));
            match (&outcome, produced) {
                (Ok(completion), _) => info!(
                    "{}: delivered {} records in {} batches",
                    context.name(),
                    completion.records,
                    completion.batches
                ),
                (Err(_), Err(err)) => debug!("{}: producer stopped: {}", context.name(), err),
                (Err(_), Ok(poll)) => debug!("{}: producer ended with {:?}", context.name(), poll),
            }
            outcome
        })
    }
}
