use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, error, info, warn};

use super::message::{Message, Offer, Outbox};
use crate::{context::Progress, Error, ParseError, Record, Result};

/// Result of one producer step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Poll {
    /// One record was handed to the outbox.
    Delivered,
    /// Waiting for `Resume`; no input was pulled.
    Paused,
    Finished,
    Failed,
    Cancelled,
}

impl Poll {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Poll::Delivered | Poll::Paused)
    }
}

/// Pull loop on the parsing side.
///
/// Owns the record source (and with it the assembler) exclusively. Records leave through
/// the outbox; pause, resume and cancel arrive on the control channel.
#[derive(Debug)]
pub struct Producer<I, O> {
    source: Option<I>,
    outbox: O,
    control: Receiver<Message>,
    pending: Option<Message>,
    paused: bool,
    delivered: u64,
    progress: Progress,
    done: Option<Poll>,
}

impl<I, O> Producer<I, O>
where
    I: Iterator<Item = Result<Record, ParseError>>,
    O: Outbox,
{
    pub fn new(source: I, outbox: O, control: Receiver<Message>, progress: Progress) -> Self {
        Producer {
            source: Some(source),
            outbox,
            control,
            pending: None,
            paused: false,
            delivered: 0,
            progress,
            done: None,
        }
    }

    /// Records handed to the outbox so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Runs one step of the pull loop without blocking (terminal messages excepted).
    pub fn poll(&mut self) -> Result<Poll> {
        if let Some(done) = self.done {
            return Ok(done);
        }
        loop {
            match self.control.try_recv() {
                Ok(msg) => {
                    if let Some(done) = self.apply(msg)? {
                        return Ok(done);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if self.paused {
            return Ok(Poll::Paused);
        }

        let msg = match self.pending.take() {
            Some(msg) => msg,
            None => match self.source.as_mut().and_then(Iterator::next) {
                Some(Ok(record)) => Message::Record(record),
                Some(Err(err)) => {
                    error!("parse failed after {} records: {}", self.delivered, err);
                    return self.terminate(Message::Failed(err), Poll::Failed);
                }
                None => {
                    self.progress.log();
                    info!("source exhausted after {} records", self.delivered);
                    let records = self.delivered;
                    return self.terminate(Message::Finished { records }, Poll::Finished);
                }
            },
        };
        self.deliver(msg)
    }

    /// Loops over [`poll`](Self::poll) until the job ends, blocking on the control channel
    /// while paused.
    pub fn run(mut self) -> Result<Poll> {
        loop {
            match self.poll()? {
                Poll::Delivered => (),
                Poll::Paused => match self.control.recv() {
                    Ok(msg) => {
                        if let Some(done) = self.apply(msg)? {
                            return Ok(done);
                        }
                    }
                    Err(_) => {
                        warn!("control channel closed while paused, cancelling");
                        return self.cancel();
                    }
                },
                done => return Ok(done),
            }
        }
    }

    fn deliver(&mut self, msg: Message) -> Result<Poll> {
        match self.outbox.offer(msg)? {
            Offer::Sent => {
                self.delivered += 1;
                self.progress.add(1);
                Ok(Poll::Delivered)
            }
            Offer::Full(msg) => {
                debug!(
                    "outbox saturated, holding record {} until resumed",
                    self.delivered + 1
                );
                self.pending = Some(msg);
                self.paused = true;
                Ok(Poll::Paused)
            }
        }
    }

    fn apply(&mut self, msg: Message) -> Result<Option<Poll>> {
        match msg {
            Message::Pause => {
                if !self.paused {
                    debug!("paused after {} records", self.delivered);
                }
                self.paused = true;
                Ok(None)
            }
            Message::Resume => {
                if self.paused {
                    debug!("resumed after {} records", self.delivered);
                }
                self.paused = false;
                Ok(None)
            }
            Message::Cancel => self.cancel().map(Some),
            other => Err(Error::Protocol(format!(
                "unexpected `{}` message on the control channel",
                other
            ))),
        }
    }

    fn cancel(&mut self) -> Result<Poll> {
        info!("cancelled after {} records", self.delivered);
        self.source = None;
        self.pending = None;
        self.terminate(Message::Cancelled, Poll::Cancelled)
    }

    fn terminate(&mut self, msg: Message, poll: Poll) -> Result<Poll> {
        self.done = Some(poll);
        self.outbox.send(msg)?;
        Ok(poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::JobContext, ParseErrorKind, RecordBuilder};
    use crossbeam_channel::{bounded, unbounded, Sender};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn record(id: u64) -> Record {
        let mut builder = RecordBuilder::new();
        builder.set_identifier(id.to_string());
        builder.build()
    }

    fn ids(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|msg| match msg {
                Message::Record(r) => r.identifier().unwrap_or_default().to_string(),
                other => other.kind().to_string(),
            })
            .collect()
    }

    fn progress() -> Progress {
        JobContext::new("test").progress("parsed")
    }

    #[test]
    fn should_hold_record_while_saturated_and_resume_without_gaps() {
        let pulled = Cell::new(0);
        let source = (1..=5).map(|i| {
            pulled.set(pulled.get() + 1);
            Ok::<_, ParseError>(record(i))
        });
        let (data_tx, data_rx) = bounded(2);
        let (control_tx, control_rx) = unbounded();
        let mut producer = Producer::new(source, data_tx, control_rx, progress());

        assert_eq!(producer.poll().unwrap(), Poll::Delivered);
        assert_eq!(producer.poll().unwrap(), Poll::Delivered);
        // third record does not fit, it is held back
        assert_eq!(producer.poll().unwrap(), Poll::Paused);
        assert_eq!(pulled.get(), 3);
        assert_eq!(producer.poll().unwrap(), Poll::Paused);
        assert_eq!(pulled.get(), 3);

        let mut received: Vec<Message> = data_rx.try_iter().collect();
        control_tx.send(Message::Resume).unwrap();
        while !producer.poll().unwrap().is_terminal() {
            received.extend(data_rx.try_iter());
        }
        received.extend(data_rx.try_iter());

        assert_eq!(ids(&received), vec!["1", "2", "3", "4", "5", "finished"]);
        assert_eq!(received.last(), Some(&Message::Finished { records: 5 }));
        assert_eq!(producer.poll().unwrap(), Poll::Finished);
        assert!(data_rx.try_recv().is_err());
    }

    #[test]
    fn should_not_pull_input_after_pause() {
        let pulled = Cell::new(0);
        let source = (1..=3).map(|i| {
            pulled.set(pulled.get() + 1);
            Ok::<_, ParseError>(record(i))
        });
        let (data_tx, data_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();
        let mut producer = Producer::new(source, data_tx, control_rx, progress());

        assert_eq!(producer.poll().unwrap(), Poll::Delivered);
        control_tx.send(Message::Pause).unwrap();
        for _ in 0..3 {
            assert_eq!(producer.poll().unwrap(), Poll::Paused);
        }
        assert_eq!(pulled.get(), 1);
        assert_eq!(data_rx.len(), 1);

        control_tx.send(Message::Resume).unwrap();
        assert_eq!(producer.poll().unwrap(), Poll::Delivered);
        let received: Vec<Message> = data_rx.try_iter().collect();
        assert_eq!(ids(&received), vec!["1", "2"]);
    }

    #[test]
    fn should_stop_after_cancel_without_finished() {
        let source = (1..=10).map(|i| Ok::<_, ParseError>(record(i)));
        let (data_tx, data_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();
        let mut producer = Producer::new(source, data_tx, control_rx, progress());

        for _ in 0..4 {
            assert_eq!(producer.poll().unwrap(), Poll::Delivered);
        }
        control_tx.send(Message::Cancel).unwrap();
        assert_eq!(producer.poll().unwrap(), Poll::Cancelled);
        assert_eq!(producer.poll().unwrap(), Poll::Cancelled);

        let received: Vec<Message> = data_rx.try_iter().collect();
        assert_eq!(ids(&received), vec!["1", "2", "3", "4", "cancelled"]);
        assert_eq!(producer.delivered(), 4);
    }

    #[test]
    fn should_report_parse_failure_as_terminal_message() {
        let err = ParseError::new(2, ParseErrorKind::Truncated {
            open: crate::assembler::Element::Subfield,
        });
        let source = vec![Ok(record(1)), Err(err.clone()), Ok(record(3))].into_iter();
        let (data_tx, data_rx) = unbounded();
        let (_control_tx, control_rx): (Sender<Message>, _) = unbounded();

        let producer = Producer::new(source, data_tx, control_rx, progress());
        assert_eq!(producer.run().unwrap(), Poll::Failed);

        let received: Vec<Message> = data_rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1], Message::Failed(err));
    }

    #[test]
    fn should_cancel_when_control_closes_while_paused() {
        let source = (1..=10).map(|i| Ok::<_, ParseError>(record(i)));
        let (data_tx, data_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();
        control_tx.send(Message::Pause).unwrap();
        drop(control_tx);

        let producer = Producer::new(source, data_tx, control_rx, progress());
        assert_eq!(producer.run().unwrap(), Poll::Cancelled);
        assert_eq!(ids(&data_rx.try_iter().collect::<Vec<_>>()), vec!["cancelled"]);
    }

    #[test]
    fn should_reject_data_messages_on_control_channel() {
        let (data_tx, _data_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();
        control_tx.send(Message::Finished { records: 0 }).unwrap();
        let source = std::iter::empty::<Result<Record, ParseError>>();
        let mut producer = Producer::new(source, data_tx, control_rx, progress());
        assert!(matches!(producer.poll(), Err(Error::Protocol(_))));
    }
}
