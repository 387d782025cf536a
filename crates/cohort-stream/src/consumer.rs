//! Single-consumer event loop over a live feed.
//!
//! [`consume`] reads events one at a time and applies them to an
//! aggregator it borrows exclusively. It stops on the first `error` event
//! (no retry, no reconnect), after the `report`, when the stream ends, or
//! when the shutdown future resolves, whichever comes first.

use std::future::Future;

use futures::{Stream, StreamExt};
use tracing::info;

use crate::aggregator::{Flow, LiveStreamAggregator};
use crate::error::StreamError;
use crate::event::{FeedEvent, decode_frame};

/// Why the consumer returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The report arrived.
    Reported,
    /// The stream ended without a report.
    Exhausted,
    /// Shutdown was requested.
    Cancelled,
}

/// Turn raw text frames into a stream of events, skipping blank lines.
pub fn frames<I>(lines: I) -> impl Stream<Item = FeedEvent>
where
    I: IntoIterator<Item = String>,
{
    futures::stream::iter(
        lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| decode_frame(&line)),
    )
}

/// Drive `aggregator` from `events` until the feed is done.
///
/// `on_update` is called after every applied event, so a caller can
/// publish snapshots as they change.
///
/// # Errors
///
/// Returns [`StreamError::Feed`] when the feed sends an `error` event.
pub async fn consume<S, C, F>(
    events: S,
    aggregator: &mut LiveStreamAggregator,
    shutdown: C,
    mut on_update: F,
) -> Result<ConsumeOutcome, StreamError>
where
    S: Stream<Item = FeedEvent>,
    C: Future<Output = ()>,
    F: FnMut(&LiveStreamAggregator),
{
    let mut events = std::pin::pin!(events);
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let next = tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("live feed consumer cancelled");
                aggregator.finish();
                return Ok(ConsumeOutcome::Cancelled);
            }
            next = events.next() => next,
        };

        let Some(event) = next else {
            info!("live feed ended");
            aggregator.finish();
            on_update(aggregator);
            return Ok(ConsumeOutcome::Exhausted);
        };

        let flow = aggregator.apply(event);
        on_update(aggregator);
        if flow? == Flow::Finished {
            return Ok(ConsumeOutcome::Reported);
        }
    }
}
