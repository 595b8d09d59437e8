//! Pipeline orchestration: fetch → normalize → publish → enrich, plus the
//! scroll-driven engagement path.
//!
//! Stages run as background tasks connected by one [`FeedEvent`] channel.
//! The pipeline's event consumer is the sole writer of the session's
//! [`FeedCache`]: spawned work only computes and sends, never mutates
//! published state directly.

use crate::cache::FeedCache;
use crate::config::Config;
use crate::engagement::EngagementReporter;
use crate::enricher::ImageEnricher;
use crate::feed::fetcher::{FetchError, HttpNewsController, NewsController};
use crate::feed::model::{DisplayAd, Image};
use crate::feed::normalizer::{ad_slots, normalize, Card};
use crate::paginator;
use crate::storage::Database;
use crate::viewport::{SettleOutcome, ViewportSample, ViewportTracker};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

/// Backlog of background completions awaiting the single consumer.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Events
// ============================================================================

/// Completion of one background stage, marshaled to the event consumer.
#[derive(Debug)]
pub enum FeedEvent {
    /// Fetch + normalize finished; the card list is ready to publish.
    FeedLoaded { cards: Vec<Card> },
    /// Fetch failed; previously published state stays authoritative.
    FeedFailed { error: FetchError },
    /// An ad side job completed. `ad: None` is a valid no-fill state.
    AdLoaded {
        card_id: Uuid,
        ad: Option<DisplayAd>,
    },
    /// Artwork for a filled ad slot arrived.
    AdImageLoaded {
        card_id: Uuid,
        bytes: Arc<[u8]>,
    },
    /// Image enrichment produced artwork for one card.
    ImageLoaded {
        card_id: Uuid,
        bytes: Arc<[u8]>,
    },
}

/// What [`FeedPipeline::refresh`] decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A background fetch was started.
    Started,
    /// The session cache is already loaded; the panel rebound to it.
    Rebound,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct FeedPipeline {
    controller: Arc<dyn NewsController>,
    cache: FeedCache,
    enricher: Arc<ImageEnricher>,
    reporter: EngagementReporter,
    tracker: ViewportTracker,
    events_tx: mpsc::Sender<FeedEvent>,
    events_rx: mpsc::Receiver<FeedEvent>,
    prefetch_enabled: bool,
}

impl FeedPipeline {
    /// Wire a pipeline onto an existing session cache.
    ///
    /// A recreated panel passes the same `cache` handle it held before;
    /// state (including `view_stat_sent` history) carries over.
    pub fn new(
        controller: Arc<dyn NewsController>,
        cache: FeedCache,
        db: Database,
        config: &Config,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            enricher: Arc::new(ImageEnricher::new(
                controller.clone(),
                config.image_concurrency,
            )),
            reporter: EngagementReporter::new(db, controller.clone()),
            tracker: ViewportTracker::new(cache.clone()),
            controller,
            cache,
            events_tx,
            events_rx,
            prefetch_enabled: config.prefetch_enabled,
        }
    }

    /// Build a full pipeline from configuration: HTTP controller against
    /// `feed_url` (with the configured timeout and body cap), counters in
    /// `database_path`, and a fresh session cache.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let controller = Arc::new(HttpNewsController::new(
            reqwest::Client::new(),
            config.feed_url.clone(),
            config.request_timeout_secs.map(Duration::from_secs),
            config.max_feed_bytes,
        ));
        let db = Database::open(&config.database_path).await?;
        Ok(Self::new(controller, FeedCache::new(), db, config))
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn reporter(&self) -> &EngagementReporter {
        &self.reporter
    }

    // ========================================================================
    // Fetch Stage
    // ========================================================================

    /// Start a feed refresh unless the session cache already holds one.
    ///
    /// The fetch itself is fire-once with no retry; a failure arrives as
    /// [`FeedEvent::FeedFailed`] and leaves previous state untouched.
    pub fn refresh(&self) -> RefreshOutcome {
        if self.cache.is_loaded() {
            tracing::debug!(
                cards = self.cache.len(),
                "Session cache already loaded, rebinding instead of refetching"
            );
            return RefreshOutcome::Rebound;
        }

        let controller = self.controller.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // Normalization happens off the consumer too; only the publish
            // (inside the event handler) touches shared state.
            let event = match controller.get_feed().await {
                Ok(raw) => FeedEvent::FeedLoaded {
                    cards: normalize(&raw),
                },
                Err(error) => FeedEvent::FeedFailed { error },
            };
            if tx.send(event).await.is_err() {
                tracing::warn!("Feed result dropped (pipeline gone)");
            }
        });

        RefreshOutcome::Started
    }

    // ========================================================================
    // Event Consumption
    // ========================================================================

    /// Await and apply the next background completion.
    ///
    /// Returns false once the channel is closed. This is the single consumer
    /// through which every mutation of published feed state flows.
    pub async fn process_next(&mut self) -> Result<bool> {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply already-queued completions without blocking.
    pub async fn drain(&mut self) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await?;
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: FeedEvent) -> Result<()> {
        match event {
            FeedEvent::FeedLoaded { cards } => {
                let slots = ad_slots(&cards);
                if !self.cache.publish(cards) {
                    // A concurrent refresh lost the race; its cards are
                    // dropped wholesale rather than merged.
                    return Ok(());
                }
                self.reporter.session_started();
                for card_id in slots {
                    self.spawn_ad_job(card_id);
                }
                self.spawn_enrich(0);
            }
            FeedEvent::FeedFailed { error } => {
                tracing::warn!(
                    error = %error,
                    loaded = self.cache.is_loaded(),
                    "Feed fetch failed; keeping previously published state, no retry"
                );
            }
            FeedEvent::AdLoaded { card_id, ad } => match ad {
                Some(ad) => {
                    let image = ad.image.clone();
                    if self.cache.attach_ad(card_id, ad) {
                        if let Some(image) = image {
                            self.spawn_ad_image_job(card_id, image);
                        }
                    }
                }
                None => {
                    tracing::debug!(card_id = %card_id, "Ad slot unfilled");
                }
            },
            FeedEvent::AdImageLoaded { card_id, bytes } => {
                let _ = self.cache.attach_ad_image(card_id, bytes);
            }
            FeedEvent::ImageLoaded { card_id, bytes } => {
                // Late completions for evicted cards are discarded here.
                let _ = self.cache.attach_image(card_id, bytes);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Scroll Surface
    // ========================================================================

    /// The rendered list left its resting state.
    pub fn drag_started(&mut self) {
        self.tracker.drag_started(Instant::now());
    }

    /// The rendered list settled; `samples` describe the visible range.
    ///
    /// Drives the tracker's view determination and then the reporter's
    /// persistence and telemetry.
    pub async fn settled(&mut self, samples: &[ViewportSample]) -> Result<SettleOutcome> {
        let outcome = self.tracker.settled(Instant::now(), samples);
        self.reporter.record_settle(&outcome).await?;
        Ok(outcome)
    }

    /// Scroll offset moved; persists the position and evaluates the prefetch
    /// trigger (which only schedules work when `prefetch_enabled`).
    pub fn scrolled(&mut self, first_visible: usize, scroll_offset: i32) {
        self.cache.set_scroll_position(scroll_offset);

        if let Some(page) = paginator::prefetch_page(first_visible) {
            if self.prefetch_enabled {
                tracing::debug!(page, "Prefetch trigger fired, enriching next page");
                self.spawn_enrich(page);
            } else {
                tracing::trace!(page, "Prefetch trigger computed, hook disconnected");
            }
        }
    }

    // ========================================================================
    // Side Jobs
    // ========================================================================

    /// Non-blocking ad fetch for one display-ad slot. Failure degrades to an
    /// unfilled slot; nothing retries.
    fn spawn_ad_job(&self, card_id: Uuid) {
        let controller = self.controller.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let ad = match controller.get_display_ad().await {
                Ok(ad) => ad,
                Err(e) => {
                    tracing::warn!(card_id = %card_id, error = %e, "Ad fetch failed, slot stays empty");
                    None
                }
            };
            let _ = tx.send(FeedEvent::AdLoaded { card_id, ad }).await;
        });
    }

    /// Artwork fetch for an already-attached ad payload, memoized through the
    /// same enricher the feed images use.
    fn spawn_ad_image_job(&self, card_id: Uuid, image: Image) {
        let enricher = self.enricher.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            if let Some(bytes) = enricher.fetch_image(&image).await {
                let _ = tx.send(FeedEvent::AdImageLoaded { card_id, bytes }).await;
            }
        });
    }

    fn spawn_enrich(&self, page: usize) {
        let enricher = self.enricher.clone();
        let cache = self.cache.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            enricher.enrich_page(&cache, page, &tx).await;
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
