//! The stream loop: parse → mutate → route → render → deliver.
//!
//! One event is handled at a time. Deliveries for an event run
//! concurrently and the loop does not read the next line until all of them
//! have finished, so a slow target back-pressures the feed. Nothing that
//! goes wrong with a single line ends the loop; only the feed running dry
//! or a shutdown request does.
//!
//! # Duplicate suppression
//!
//! After a reconnect the feed may replay recent messages. Messages that
//! carry an id are checked against a bounded window of recently seen ids
//! and repeats are skipped before any mutation or delivery. Messages
//! without an id are always processed; every mutation is idempotent.
//!
//! # Registry failures
//!
//! A write aimed at a nation with no record is logged and the event is
//! still routed. If the registry itself is unavailable, during the write
//! or during routing, the rest of the event is skipped: nothing is
//! delivered, and the loop moves on. There is no retry queue.

use std::collections::{HashSet, VecDeque};
use std::future::Future;

use futures::{Stream, StreamExt};
use rwa_db::Registry;
use rwa_events::{Event, EventKind, EventParseError};

use crate::error::{DeliveryError, MutationError};
use crate::mutator::Mutator;
use crate::router::{Router, render};
use crate::shutdown::Shutdown;
use crate::subscription::ChannelSubscription;

/// Default number of message ids remembered.
pub const DEFAULT_DEDUP_WINDOW: usize = 1024;

/// One message from the feed transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    /// Transport-level id, when the feed provides one.
    pub id: Option<String>,
    /// The event text.
    pub text: String,
}

impl FeedMessage {
    /// A message without an id.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
        }
    }

    /// A message with an id.
    pub fn with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
        }
    }
}

/// A rendered event addressed to one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Display name of the channel.
    pub channel: String,
    /// Delivery target (a webhook URL).
    pub target: String,
    /// Rendered markdown.
    pub content: String,
}

/// Sends outbound messages.
pub trait Delivery: Send + Sync {
    /// Deliver one message.
    fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Bounded memory of recently seen message ids.
#[derive(Debug, Clone, Default)]
pub struct DedupWindow {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DedupWindow {
    /// Remember up to `capacity` ids. Zero disables suppression.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Record `id`, returning `false` if it is already in the window.
    pub fn observe(&mut self, id: &str) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(id.to_owned());
        self.seen.insert(id.to_owned());
        true
    }

    /// Number of ids currently remembered.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no ids are remembered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// What happened to one feed message.
#[derive(Debug)]
pub enum LineOutcome {
    /// The id was seen recently; nothing was done.
    Duplicate,
    /// The line could not be parsed and was dropped.
    Rejected(EventParseError),
    /// The registry was unavailable; the event was neither routed nor
    /// delivered.
    Skipped(EventKind),
    /// The event was processed.
    Handled(EventReport),
}

/// Summary of one processed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventReport {
    /// The event kind.
    pub kind: EventKind,
    /// Whether the registry write succeeded.
    pub mutated: bool,
    /// Channels that matched.
    pub matched: usize,
    /// Channels the message reached.
    pub delivered: usize,
    /// Matched channels that did not receive the message.
    pub failed: usize,
}

/// Why [`StreamLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The feed ended; the caller may reconnect.
    Exhausted,
    /// Shutdown was requested.
    Shutdown,
}

/// Running totals across the life of a [`StreamLoop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Messages read from the feed.
    pub messages: u64,
    /// Messages skipped as duplicates.
    pub duplicates: u64,
    /// Lines that failed to parse.
    pub rejected: u64,
    /// Events whose registry write failed.
    pub mutation_failures: u64,
    /// Events dropped because the registry was unavailable.
    pub skipped: u64,
    /// Successful deliveries.
    pub delivered: u64,
    /// Failed deliveries.
    pub delivery_failures: u64,
}

/// Drives events from a feed through the registry to the channels.
pub struct StreamLoop<'a, R, D> {
    mutator: Mutator<'a, R>,
    router: Router<'a, R>,
    delivery: &'a D,
    subscriptions: &'a [ChannelSubscription],
    dedup: DedupWindow,
    stats: StreamStats,
}

impl<'a, R: Registry, D: Delivery> StreamLoop<'a, R, D> {
    /// Create a loop over `registry`, delivering through `delivery` to the
    /// matching `subscriptions`.
    pub fn new(
        registry: &'a R,
        delivery: &'a D,
        subscriptions: &'a [ChannelSubscription],
    ) -> Self {
        Self {
            mutator: Mutator::new(registry),
            router: Router::new(registry),
            delivery,
            subscriptions,
            dedup: DedupWindow::new(DEFAULT_DEDUP_WINDOW),
            stats: StreamStats::default(),
        }
    }

    /// Set the duplicate-suppression window size. Zero disables it.
    #[must_use]
    pub fn with_dedup_window(mut self, capacity: usize) -> Self {
        self.dedup = DedupWindow::new(capacity);
        self
    }

    /// Totals so far.
    pub const fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Consume `feed` until it ends or `shutdown` fires.
    ///
    /// Shutdown is only observed between messages. The dedup window
    /// survives across calls, so replays after a reconnect are caught.
    pub async fn run<S>(&mut self, feed: S, shutdown: &Shutdown) -> StreamEnd
    where
        S: Stream<Item = FeedMessage>,
    {
        let mut feed = std::pin::pin!(feed);
        loop {
            let next = tokio::select! {
                biased;
                () = shutdown.wait() => {
                    tracing::info!("Shutdown requested, leaving stream loop");
                    return StreamEnd::Shutdown;
                }
                next = feed.next() => next,
            };
            let Some(message) = next else {
                tracing::warn!("Feed ended");
                return StreamEnd::Exhausted;
            };
            self.process(message).await;
        }
    }

    /// Handle one feed message end to end.
    pub async fn process(&mut self, message: FeedMessage) -> LineOutcome {
        self.stats.messages = self.stats.messages.saturating_add(1);

        if let Some(id) = message.id.as_deref() {
            if !self.dedup.observe(id) {
                tracing::debug!(id, "Skipping replayed message");
                self.stats.duplicates = self.stats.duplicates.saturating_add(1);
                return LineOutcome::Duplicate;
            }
        }

        let event = match Event::parse(&message.text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, raw = %message.text, "Dropping unparseable line");
                self.stats.rejected = self.stats.rejected.saturating_add(1);
                return LineOutcome::Rejected(e);
            }
        };
        tracing::info!(%event, "Event");

        let mutated = match self.mutator.apply(&event).await {
            Ok(()) => true,
            Err(e @ MutationError::RegistryUnavailable { .. }) => {
                tracing::error!(
                    error = %e,
                    raw = %event.raw(),
                    "Registry unavailable, skipping event"
                );
                self.stats.mutation_failures = self.stats.mutation_failures.saturating_add(1);
                return self.skip(&event);
            }
            Err(e) => {
                tracing::warn!(error = %e, raw = %event.raw(), "Registry update skipped");
                self.stats.mutation_failures = self.stats.mutation_failures.saturating_add(1);
                false
            }
        };

        let matched = match self.router.route(&event, self.subscriptions).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw = %event.raw(),
                    "Registry unavailable while routing, skipping event"
                );
                return self.skip(&event);
            }
        };
        let (delivered, failed) = self.deliver(&event, &matched).await;

        LineOutcome::Handled(EventReport {
            kind: event.kind(),
            mutated,
            matched: matched.len(),
            delivered,
            failed,
        })
    }

    fn skip(&mut self, event: &Event) -> LineOutcome {
        self.stats.skipped = self.stats.skipped.saturating_add(1);
        LineOutcome::Skipped(event.kind())
    }

    /// Fan the rendered event out to `channels`; returns (delivered, failed).
    async fn deliver(&mut self, event: &Event, channels: &[&ChannelSubscription]) -> (usize, usize) {
        if channels.is_empty() {
            return (0, 0);
        }

        let content = match render(event) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, raw = %event.raw(), "Cannot render event");
                self.count_deliveries(0, channels.len());
                return (0, channels.len());
            }
        };

        let messages: Vec<OutboundMessage> = channels
            .iter()
            .map(|channel| OutboundMessage {
                channel: channel.name.clone(),
                target: channel.target.clone(),
                content: content.clone(),
            })
            .collect();

        let results =
            futures::future::join_all(messages.iter().map(|m| self.delivery.deliver(m))).await;

        let mut delivered: usize = 0;
        for (message, result) in messages.iter().zip(results) {
            match result {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => tracing::error!(
                    channel = %message.channel,
                    error = %e,
                    raw = %event.raw(),
                    "Delivery failed"
                ),
            }
        }
        let failed = channels.len().saturating_sub(delivered);
        self.count_deliveries(delivered, failed);
        (delivered, failed)
    }

    fn count_deliveries(&mut self, delivered: usize, failed: usize) {
        let as_u64 = |n: usize| u64::try_from(n).unwrap_or(u64::MAX);
        self.stats.delivered = self.stats.delivered.saturating_add(as_u64(delivered));
        self.stats.delivery_failures = self.stats.delivery_failures.saturating_add(as_u64(failed));
    }
}
