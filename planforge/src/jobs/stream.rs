//! Server-sent-event style delivery of a job's events.

use futures::Stream;
use std::time::Duration;
use tokio::sync::mpsc;

use super::registry::{JobEvent, Subscription};

/// Comment frame sent when a stream has been idle for the keep-alive interval.
pub const KEEPALIVE_FRAME: &str = ": keep-alive\n\n";

/// One item delivered to a stream consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A recorded job event.
    Event(JobEvent),
    /// Nothing happened for one keep-alive interval.
    KeepAlive,
}

impl StreamItem {
    /// Renders the item as an SSE frame.
    #[must_use]
    pub fn to_sse(&self) -> String {
        match self {
            Self::Event(record) => record.event.to_sse(),
            Self::KeepAlive => KEEPALIVE_FRAME.to_string(),
        }
    }

    /// Returns true for `orchestration_complete` and `orchestration_failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Event(record) if record.event.is_terminal())
    }
}

/// A live view of one job: replayed history, then new events.
///
/// The stream ends after the terminal event. Dropping it unsubscribes
/// without affecting the run.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<JobEvent>,
    subscription: Subscription,
    keepalive: Duration,
    finished: bool,
}

impl EventStream {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<JobEvent>,
        subscription: Subscription,
        keepalive: Duration,
    ) -> Self {
        Self {
            receiver,
            subscription,
            keepalive,
            finished: false,
        }
    }

    /// Waits for the next item.
    ///
    /// Yields [`StreamItem::KeepAlive`] when no event arrives within the
    /// keep-alive interval. Returns `None` once the stream has finished.
    pub async fn next(&mut self) -> Option<StreamItem> {
        if self.finished {
            return None;
        }

        tokio::select! {
            biased;
            received = self.receiver.recv() => match received {
                Some(record) => {
                    if record.event.is_terminal() {
                        self.close();
                    }
                    Some(StreamItem::Event(record))
                }
                None => {
                    self.close();
                    None
                }
            },
            () = tokio::time::sleep(self.keepalive) => Some(StreamItem::KeepAlive),
        }
    }

    /// Stops the stream and detaches from the job.
    pub fn close(&mut self) {
        self.finished = true;
        self.subscription.unsubscribe();
    }

    /// Returns true once the terminal event was delivered or the stream was closed.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Adapts this into a [`futures::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = StreamItem> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next().await?;
            Some((item, stream))
        })
    }
}
