//! Converts a raw paginated feed into the uniform renderable card list.
//!
//! Normalization is a pure function of its input: it allocates fresh cards,
//! touches no shared state, and never mutates a previously published
//! `FeedState`. On fetch failure the caller must not call [`normalize`] at
//! all; the previously cached state remains the system of record.

use crate::feed::model::{CardType, DisplayAd, FeedItem, FeedItemMetadata, RawFeed};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Card Entities
// ============================================================================

/// One normalized, renderable feed entry.
#[derive(Debug, Clone)]
pub struct Card {
    /// Freshly generated per normalization run, unique within a feed state.
    pub id: Uuid,
    pub card_type: CardType,
    pub items: Vec<CardItem>,
    /// Payload for a `DisplayAd` card, attached by its side job after
    /// normalization. `None` (no fill yet, or no fill at all) is a valid
    /// state.
    pub ad: Option<DisplayAd>,
    /// Artwork for an attached ad, fetched after the payload lands.
    pub ad_image: Option<Arc<[u8]>>,
    /// Set true after the one-time promoted impression report for this card.
    pub view_stat_sent: bool,
}

impl Card {
    fn new(card_type: CardType, items: Vec<CardItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_type,
            items,
            ad: None,
            ad_image: None,
            view_stat_sent: false,
        }
    }

    /// Metadata of the card's leading item, the one whose artwork the
    /// enricher fetches.
    pub fn leading_metadata(&self) -> Option<FeedItemMetadata> {
        self.items.first().map(|wrapper| wrapper.item.metadata())
    }
}

/// A feed item paired with its optional enriched image payload.
///
/// Image bytes are shared (`Arc`) because the enricher memoizes artwork that
/// several cards may reference.
#[derive(Debug, Clone)]
pub struct CardItem {
    pub item: FeedItem,
    pub image: Option<Arc<[u8]>>,
}

impl CardItem {
    fn wrap(item: FeedItem) -> Self {
        Self { item, image: None }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Flatten a raw feed into the ordered card list.
///
/// Card 0 is always the featured item as a `Headline` card; every
/// `FeedPageItem` after it becomes one card, in page order. Ad slots are
/// emitted as empty `DisplayAd` cards here — scheduling their payload fetch
/// is the pipeline's job so normalization of subsequent cards is never
/// delayed.
pub fn normalize(raw: &RawFeed) -> Vec<Card> {
    let slots: usize = raw.pages.iter().map(|p| p.items.len()).sum();
    let mut cards = Vec::with_capacity(1 + slots);

    cards.push(Card::new(
        CardType::Headline,
        vec![CardItem::wrap(raw.featured_item.clone())],
    ));

    for page in &raw.pages {
        for slot in &page.items {
            let items = slot.items.iter().cloned().map(CardItem::wrap).collect();
            cards.push(Card::new(slot.card_type, items));
        }
    }

    tracing::debug!(
        cards = cards.len(),
        pages = raw.pages.len(),
        "Normalized feed"
    );
    cards
}

/// Ids of the cards whose type is `DisplayAd`, in feed order.
///
/// The pipeline schedules one non-blocking ad-fetch side job per returned id.
pub fn ad_slots(cards: &[Card]) -> Vec<Uuid> {
    cards
        .iter()
        .filter(|card| card.card_type == CardType::DisplayAd)
        .map(|card| card.id)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
