//! Scroll-state tracking: which card did the user actually see?
//!
//! The panel reports two things: scroll-state transitions (drag start /
//! settle) and, at each settle, the visibility geometry of the rendered
//! range. This module reduces those into at-most-once view determinations.
//! All tracker fields live in one explicit state struct updated only by the
//! state machine; there are no loose shared timestamps or type strings.

use crate::cache::FeedCache;
use crate::feed::model::CardType;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// A card must cover at least this fraction of its own height to qualify.
pub const MINIMUM_VISIBLE_FRACTION: f32 = 0.5;

/// A viewport must rest longer than this before a settle counts as a view.
pub const MINIMUM_VIEW_TIME: Duration = Duration::from_millis(100);

/// Scroll state of the rendered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    Dragging,
}

/// Visibility of one rendered card at settle time.
///
/// `visible_fraction` is visible height over total height, in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct ViewportSample {
    pub card_index: usize,
    pub visible_fraction: f32,
}

/// A first-time impression of a promoted card, ready to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotedView {
    pub uuid: Uuid,
    pub creative_instance_id: String,
}

/// What one settle event amounted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettleOutcome {
    /// True exactly when the rest period exceeded [`MINIMUM_VIEW_TIME`];
    /// drives the session view counter regardless of card type.
    pub card_viewed: bool,
    /// Promoted cards whose `view_stat_sent` flag this settle transitioned.
    pub promoted_views: Vec<PromotedView>,
}

// ============================================================================
// Tracker
// ============================================================================

/// The `Idle ⇄ Dragging` state machine over one session's feed cache.
pub struct ViewportTracker {
    cache: FeedCache,
    state: ScrollState,
    /// Set when timing begins, consumed by the settle that evaluates it.
    view_start: Option<Instant>,
}

impl ViewportTracker {
    pub fn new(cache: FeedCache) -> Self {
        Self {
            cache,
            state: ScrollState::Idle,
            view_start: None,
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// `Idle → Dragging`. Starts the view timer unless one is already
    /// running.
    pub fn drag_started(&mut self, now: Instant) {
        self.state = ScrollState::Dragging;
        if self.view_start.is_none() {
            self.view_start = Some(now);
        }
    }

    /// `Dragging → Idle` (settle).
    ///
    /// Consumes the pending view timer, so a re-entrant settle on an
    /// unchanged viewport is a no-op: no double-counted view, no repeated
    /// promoted emission. Samples whose index no longer resolves to a card
    /// (the list shrank mid-settle) are skipped, never fatal.
    pub fn settled(&mut self, now: Instant, samples: &[ViewportSample]) -> SettleOutcome {
        self.state = ScrollState::Idle;

        let Some(start) = self.view_start.take() else {
            return SettleOutcome::default();
        };
        let duration = now.saturating_duration_since(start);
        if duration <= MINIMUM_VIEW_TIME {
            tracing::trace!(?duration, "Settle below view-time threshold");
            return SettleOutcome::default();
        }

        let mut outcome = SettleOutcome {
            card_viewed: true,
            promoted_views: Vec::new(),
        };

        for sample in samples {
            if sample.visible_fraction < MINIMUM_VISIBLE_FRACTION {
                continue;
            }
            let Some(card) = self.cache.card(sample.card_index) else {
                tracing::debug!(
                    index = sample.card_index,
                    "Visible index beyond card list, skipping"
                );
                continue;
            };
            if card.card_type != CardType::PromotedArticle {
                continue;
            }

            let Some(creative_instance_id) = card
                .items
                .first()
                .and_then(|wrapper| wrapper.item.creative_instance_id())
                .map(str::to_owned)
            else {
                tracing::warn!(card_id = %card.id, "Promoted card without creative instance id");
                continue;
            };

            // The flag transition gates the one-time emission.
            if self.cache.mark_view_stat_sent(card.id) {
                tracing::debug!(
                    card_id = %card.id,
                    creative_instance_id = %creative_instance_id,
                    "Qualifying promoted view"
                );
                outcome.promoted_views.push(PromotedView {
                    uuid: card.id,
                    creative_instance_id,
                });
            }
        }

        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================
