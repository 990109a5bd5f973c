//! # Parsing in a separate process
//!
//! The worker side ([`serve`]) reads JSON-line control messages and answers each
//! `Parse { source }` with a stream of `Record` messages ending in one terminal message. The
//! parent side ([`WorkerProcess`]) drives a worker over its stdin and stdout with the same
//! [`Consumer`] used in process. The pipes are assumed reliable and ordered.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use crossbeam_channel::Receiver;
use log::{error, info, warn};

use crate::{
    config::{InputFormat, PipelineConfig},
    context::JobContext,
    pipeline::{
        spawn_reader, Completion, Consumer, Intake, JsonLines, Message, Outbox, Poll, Producer,
    },
    DelimitedRecords, Error, ParseError, ParseErrorKind, RecordSink, Records, Result,
};

/// Capacity of the channel behind the worker's control reader.
const CONTROL_CAPACITY: usize = 64;

/// Resolves a source locator into a byte stream.
pub trait SourceOpener {
    fn open(&self, source: &str) -> Result<Box<dyn Read + Send>>;
}

/// Opens sources as local file paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileOpener;

impl SourceOpener for FileOpener {
    fn open(&self, source: &str) -> Result<Box<dyn Read + Send>> {
        let file = File::open(source)?;
        Ok(Box::new(file))
    }
}

/// Worker loop. Returns the number of jobs served once `control_in` closes.
pub fn serve<R, W, O>(
    control_in: R,
    data_out: W,
    opener: &O,
    config: &PipelineConfig,
) -> Result<u64>
where
    R: BufRead + Send + 'static,
    W: Write,
    O: SourceOpener + ?Sized,
{
    config.validate()?;
    let control = spawn_reader(control_in, CONTROL_CAPACITY)?;
    let mut outbox = JsonLines::new(data_out);
    let mut jobs = 0;

    while let Ok(msg) = control.recv() {
        match msg {
            Message::Parse { source } => {
                jobs += 1;
                let poll = run_job(&source, &mut outbox, &control, opener, config)?;
                info!("job {} ({}) ended: {:?}", jobs, source, poll);
            }
            Message::Pause | Message::Resume | Message::Cancel => {
                warn!("ignoring `{}` outside a job", msg);
            }
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected `{}` message on the control channel",
                    other
                )))
            }
        }
    }
    info!("control input closed after {} jobs", jobs);
    Ok(jobs)
}

fn run_job<W, O>(
    source: &str,
    outbox: &mut JsonLines<W>,
    control: &Receiver<Message>,
    opener: &O,
    config: &PipelineConfig,
) -> Result<Poll>
where
    W: Write,
    O: SourceOpener + ?Sized,
{
    let context = JobContext::new(source).with_progress_interval(config.progress_interval);
    let input = match opener.open(source) {
        Ok(input) => input,
        Err(err) => {
            error!("cannot open {}: {}", source, err);
            let kind = ParseErrorKind::Decode {
                message: format!("cannot open {}: {}", source, err),
            };
            outbox.send(Message::Failed(ParseError::new(1, kind)))?;
            return Ok(Poll::Failed);
        }
    };
    info!("parsing {}", source);

    let tag = config.identifier_tag.as_str();
    let progress = context.progress("parsed");
    match config.format {
        InputFormat::Collection => Producer::new(
            Records::with_identifier_tag(input, tag),
            outbox,
            control.clone(),
            progress,
        )
        .run(),
        InputFormat::Delimited => Producer::new(
            DelimitedRecords::with_identifier_tag(BufReader::new(input), tag),
            outbox,
            control.clone(),
            progress,
        )
        .run(),
    }
}

/// Parent-side handle on a running worker process.
#[derive(Debug)]
pub struct WorkerProcess {
    child: Child,
    control: JsonLines<ChildStdin>,
    data: Receiver<Message>,
    config: PipelineConfig,
}

impl WorkerProcess {
    /// Starts `command` with piped stdin and stdout.
    pub fn spawn(mut command: Command, config: PipelineConfig) -> Result<WorkerProcess> {
        config.validate()?;
        let mut child = command.stdin(Stdio::piped()).stdout(Stdio::piped()).spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Protocol("worker stdin is not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Protocol("worker stdout is not piped".into()))?;
        let data = spawn_reader(BufReader::new(stdout), config.channel_capacity())?;
        info!("started worker process {}", child.id());
        Ok(WorkerProcess {
            child,
            control: JsonLines::new(stdin),
            data,
            config,
        })
    }

    /// Has the worker parse `source` and delivers the records to `sink`.
    ///
    /// A job that ends in an error leaves nothing behind on the data channel, so the same
    /// worker can take the next job.
    pub fn parse<S: RecordSink>(&mut self, source: &str, sink: S) -> Result<Completion<S>> {
        let context = JobContext::new(source).with_progress_interval(self.config.progress_interval);
        self.control.send(Message::Parse {
            source: source.to_string(),
        })?;
        Consumer::new(
            Intake::new(sink, &self.config),
            self.data.clone(),
            &mut self.control,
            context.progress("written"),
        )
        .run()
    }

    /// Closes the worker's stdin and waits for it to exit.
    pub fn finish(self) -> Result<ExitStatus> {
        let WorkerProcess {
            mut child, control, ..
        } = self;
        drop(control);
        let status = child.wait()?;
        if status.success() {
            Ok(status)
        } else {
            Err(Error::Protocol(format!("worker exited with {}", status)))
        }
    }
}
