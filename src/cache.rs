//! Session-scoped feed cache.
//!
//! The cache outlives panel recreation (rotation, tab re-attach): the host
//! keeps one [`FeedCache`] handle per session and a recreated panel rebinds
//! to it instead of instantiating a second copy. Every mutation goes through
//! one mutex, so a reader observing `loaded == true` always sees the complete
//! card list, never a partially applied one.

use crate::feed::normalizer::Card;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// The published per-session feed state.
#[derive(Debug, Default)]
struct FeedState {
    /// Ordered, index-stable card list.
    cards: Vec<Card>,
    /// Transitions false→true exactly once per successful fetch; reset only
    /// by an explicit external [`FeedCache::clear`].
    loaded: bool,
    scroll_position: i32,
}

/// Cloneable handle to the single per-session [`FeedState`].
#[derive(Debug, Clone, Default)]
pub struct FeedCache {
    inner: Arc<Mutex<FeedState>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically install a freshly normalized card list and flip `loaded`.
    ///
    /// Returns false without touching anything if the cache is already
    /// loaded: a second publish in the same session would discard
    /// `view_stat_sent` history and re-trigger impressions. Re-publishing
    /// requires an explicit [`clear`](Self::clear) first.
    pub fn publish(&self, cards: Vec<Card>) -> bool {
        let mut state = self.lock();
        if state.loaded {
            tracing::debug!(
                existing = state.cards.len(),
                rejected = cards.len(),
                "Ignoring publish into an already-loaded session cache"
            );
            return false;
        }
        tracing::info!(cards = cards.len(), "Publishing normalized feed");
        state.cards = cards;
        state.loaded = true;
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn len(&self) -> usize {
        self.lock().cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().cards.is_empty()
    }

    /// Snapshot of one card; `None` if the index is out of range (the list
    /// may have been cleared between the caller's scan and this read).
    pub fn card(&self, index: usize) -> Option<Card> {
        self.lock().cards.get(index).cloned()
    }

    /// Snapshot of the full card list.
    pub fn cards(&self) -> Vec<Card> {
        self.lock().cards.clone()
    }

    pub fn set_scroll_position(&self, position: i32) {
        self.lock().scroll_position = position;
    }

    pub fn scroll_position(&self) -> i32 {
        self.lock().scroll_position
    }

    /// Flip a card's `view_stat_sent` flag false→true.
    ///
    /// Returns true only when this call performed the transition; a card that
    /// already reported its impression (or no longer exists) yields false, so
    /// the caller can gate the one-time emission on the return value alone.
    pub fn mark_view_stat_sent(&self, card_id: Uuid) -> bool {
        let mut state = self.lock();
        match state.cards.iter_mut().find(|c| c.id == card_id) {
            Some(card) if !card.view_stat_sent => {
                card.view_stat_sent = true;
                true
            }
            Some(_) => false,
            None => {
                tracing::debug!(card_id = %card_id, "View-stat mark for a vanished card, skipping");
                false
            }
        }
    }

    /// Attach enriched image bytes to a card's leading item.
    ///
    /// Returns false if the card has since been evicted; late completions for
    /// evicted cards are simply discarded.
    pub fn attach_image(&self, card_id: Uuid, bytes: Arc<[u8]>) -> bool {
        let mut state = self.lock();
        match state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .and_then(|c| c.items.first_mut())
        {
            Some(wrapper) => {
                wrapper.image = Some(bytes);
                true
            }
            None => {
                tracing::debug!(card_id = %card_id, "Image arrived for a vanished card, discarding");
                false
            }
        }
    }

    /// Attach a fetched ad payload to its display-ad card.
    ///
    /// Returns false if the card has since been evicted.
    pub fn attach_ad(&self, card_id: Uuid, ad: crate::feed::model::DisplayAd) -> bool {
        let mut state = self.lock();
        match state.cards.iter_mut().find(|c| c.id == card_id) {
            Some(card) => {
                card.ad = Some(ad);
                true
            }
            None => {
                tracing::debug!(card_id = %card_id, "Ad arrived for a vanished card, discarding");
                false
            }
        }
    }

    /// Attach fetched artwork to a card's ad payload.
    ///
    /// Returns false if the card was evicted or its ad never arrived; the ad
    /// renders without artwork in that case.
    pub fn attach_ad_image(&self, card_id: Uuid, bytes: Arc<[u8]>) -> bool {
        let mut state = self.lock();
        match state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id && c.ad.is_some())
        {
            Some(card) => {
                card.ad_image = Some(bytes);
                true
            }
            None => {
                tracing::debug!(card_id = %card_id, "Ad artwork arrived for a vanished ad, discarding");
                false
            }
        }
    }

    /// Explicit external reset (e.g., the feature was toggled off). The only
    /// path that takes `loaded` back to false.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.cards.clear();
        state.loaded = false;
        state.scroll_position = 0;
        tracing::info!("Session feed cache cleared");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FeedState> {
        // No await point ever holds this guard; poisoning can only come from
        // a panic inside this module.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================
