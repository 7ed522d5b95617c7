//! 5.1 (ambient): the push-consumer capability `QueryEngine` delivers
//! features through.
//!
//! Grounded on the design note's "natural implementations" list (§9) and on
//! `stadiamaps-pmtiles-rs`'s channel-backed async directory walk, which uses
//! the same `mpsc::UnboundedSender` + `Stream` adapter shape for a producer
//! task that can't hand results back by return value.

use futures_util::stream::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::Error;
use crate::feature::Feature;

/// A push consumer for one query's results. At most one of `complete`/`error`
/// is ever called, and only after the last `next`.
pub trait Observer: Send + Sync {
    fn next(&self, features: Vec<Feature>);
    fn complete(&self);
    fn error(&self, err: Error);
}

/// One message delivered to a `ChannelObserver`'s paired receiver.
#[derive(Debug)]
pub enum Event {
    Next(Vec<Feature>),
    Complete,
    Error(Error),
}

/// An `Observer` that forwards every call onto an unbounded channel, for
/// callers who'd rather `while let Some(event) = rx.recv().await` than
/// implement a trait.
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<Event>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelObserver { sender }, receiver)
    }

    /// Wrap the receiver half as a `Stream<Item = Event>` for
    /// `QueryEngine::read_wig_data_stream`.
    pub fn into_stream(receiver: mpsc::UnboundedReceiver<Event>) -> impl Stream<Item = Event> {
        UnboundedReceiverStream::new(receiver)
    }
}

impl Observer for ChannelObserver {
    fn next(&self, features: Vec<Feature>) {
        // A dropped receiver means the caller stopped listening; there is
        // nothing further to deliver, so silently drop the event rather
        // than panicking the producer task.
        let _ = self.sender.send(Event::Next(features));
    }

    fn complete(&self) {
        let _ = self.sender.send(Event::Complete);
    }

    fn error(&self, err: Error) {
        let _ = self.sender.send(Event::Error(err));
    }
}
