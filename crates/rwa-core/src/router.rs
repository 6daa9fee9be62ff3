//! Matches events against channel subscriptions and renders them.
//!
//! The router runs after the mutator, so for a MOVE the registry already
//! holds the destination; the origin is taken from the event text.

use rwa_db::{DbError, Registry};
use rwa_events::{Event, EventKind};

use crate::error::RenderError;
use crate::subscription::{ChannelSubscription, RouteFacts};

/// Longest outbound message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Selects the channels that want each event.
pub struct Router<'a, R> {
    registry: &'a R,
}

impl<'a, R: Registry> Router<'a, R> {
    /// Create a router reading through `registry`.
    pub const fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// The subscriptions that match `event`, in input order.
    ///
    /// The actor's region is looked up at most once, and only if some
    /// channel filters on region. A nation with no record has no region.
    ///
    /// # Errors
    ///
    /// Returns the store error if a lookup fails. Nothing may be delivered
    /// for the event in that case, since region filters cannot be decided.
    pub async fn route<'s>(
        &self,
        event: &Event,
        subscriptions: &'s [ChannelSubscription],
    ) -> Result<Vec<&'s ChannelSubscription>, DbError> {
        let actor = event.actor();
        let needs_region = subscriptions
            .iter()
            .any(|s| s.filters_region() || s.endotarting);
        let region = if needs_region {
            self.registry.get_region(actor).await?
        } else {
            None
        };

        let is_move = event.kind() == EventKind::Move;
        let origin = if is_move { event.param(0) } else { None };

        let needs_membership = is_move
            && subscriptions.iter().any(|s| {
                s.endotarting && region.as_deref().is_some_and(|r| s.regions.contains(r))
            });
        let actor_is_member = needs_membership && self.registry.get_wa_status(actor).await?;

        let facts = RouteFacts {
            kind: event.kind(),
            region: region.as_deref(),
            origin,
            actor_is_member,
        };
        Ok(subscriptions.iter().filter(|s| s.accepts(&facts)).collect())
    }
}

/// Render an event as markdown for delivery.
///
/// # Errors
///
/// Returns [`RenderError::TooLong`] if the text exceeds
/// [`MAX_MESSAGE_CHARS`]. The text is never split or truncated.
pub fn render(event: &Event) -> Result<String, RenderError> {
    let text = event.render_markdown();
    let length = text.chars().count();
    if length > MAX_MESSAGE_CHARS {
        return Err(RenderError::TooLong {
            length,
            limit: MAX_MESSAGE_CHARS,
        });
    }
    Ok(text)
}
