//! Best-effort async image attachment, one page of cards at a time.
//!
//! Enrichment is fully decoupled from normalization: it runs on background
//! tasks, fans out with bounded concurrency, and hands results back over the
//! pipeline channel so only the single event-loop consumer ever mutates the
//! published feed state. A card whose image request fails or misses simply
//! stays imageless; nothing propagates.

use crate::cache::FeedCache;
use crate::feed::fetcher::NewsController;
use crate::feed::model::{CardType, Image};
use crate::paginator;
use crate::pipeline::FeedEvent;
use futures::stream::{self, StreamExt};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Distinct artwork URLs memoized across pages.
const IMAGE_MEMO_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

pub struct ImageEnricher {
    controller: Arc<dyn NewsController>,
    /// URL → bytes memo; publishers reuse artwork across cards.
    memo: Mutex<LruCache<String, Arc<[u8]>>>,
    concurrency: usize,
}

impl ImageEnricher {
    pub fn new(controller: Arc<dyn NewsController>, concurrency: usize) -> Self {
        Self {
            controller,
            memo: Mutex::new(LruCache::new(IMAGE_MEMO_CAPACITY)),
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch artwork for every card of one page and emit an
    /// [`FeedEvent::ImageLoaded`] per success.
    ///
    /// One request per card's leading item. Display-ad cards are skipped
    /// here (their artwork is fetched once the ad payload lands), as are
    /// cards whose metadata carries no image reference.
    pub async fn enrich_page(
        &self,
        cache: &FeedCache,
        page: usize,
        events: &mpsc::Sender<FeedEvent>,
    ) {
        let cards = cache.cards();
        let bounds = paginator::page_bounds(page);
        let slice_end = bounds.end.min(cards.len());
        if bounds.start >= slice_end {
            return;
        }

        let jobs: Vec<(Uuid, Image)> = cards[bounds.start..slice_end]
            .iter()
            .filter(|card| card.card_type != CardType::DisplayAd)
            .filter_map(|card| {
                let image = card.leading_metadata()?.image?;
                Some((card.id, image))
            })
            .collect();

        tracing::debug!(page, jobs = jobs.len(), "Enriching page images");

        let results: Vec<(Uuid, Option<Arc<[u8]>>)> = stream::iter(jobs)
            .map(|(card_id, image)| async move {
                (card_id, self.fetch_image(&image).await)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (card_id, bytes) in results {
            let Some(bytes) = bytes else { continue };
            if let Err(e) = events
                .send(FeedEvent::ImageLoaded { card_id, bytes })
                .await
            {
                tracing::warn!(error = %e, "Image result dropped (event receiver gone)");
                return;
            }
        }
    }

    /// Memoized single-image fetch; also used for ad artwork once an ad
    /// payload has landed.
    pub(crate) async fn fetch_image(&self, image: &Image) -> Option<Arc<[u8]>> {
        let url = image.resolve().to_string();
        if let Some(hit) = self.memo(|memo| memo.get(&url).cloned()) {
            return Some(hit);
        }

        match self.controller.get_image_data(image).await {
            Ok(Some(bytes)) => {
                let bytes: Arc<[u8]> = Arc::from(bytes);
                self.memo(|memo| memo.put(url, bytes.clone()));
                Some(bytes)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Image fetch failed, card stays imageless");
                None
            }
        }
    }

    // No await point ever holds the memo guard; poisoning can only come from
    // a panic inside this module.
    fn memo<T>(&self, f: impl FnOnce(&mut LruCache<String, Arc<[u8]>>) -> T) -> T {
        let mut guard = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

// ============================================================================
// Tests
// ============================================================================
