//! feedpanel - embeddable news-feed panel pipeline
//!
//! The crate models the lifecycle of a news panel hosted inside a larger
//! shell: fetch a structured feed over HTTP, normalize it into a flat card
//! list, publish it atomically into a session-scoped cache, enrich visible
//! pages with artwork, and report card views and promoted-content
//! impressions as the user scrolls.
//!
//! # Architecture
//!
//! - **feed**: wire model, HTTP controller, and the raw-feed -> card-list
//!   normalizer
//! - **cache**: session-scoped published feed state shared across panel
//!   recreations
//! - **enricher**: bounded-concurrency artwork fetching with an in-memory
//!   memo
//! - **paginator**: page math and the prefetch trigger
//! - **viewport**: drag/settle view-time and visibility determination
//! - **engagement**: durable view counters and telemetry forwarding
//! - **pipeline**: the event loop tying the stages together
//!
//! All background work funnels through one [`pipeline::FeedEvent`] channel;
//! its consumer is the only writer of published state.

pub mod cache;
pub mod config;
pub mod engagement;
pub mod enricher;
pub mod feed;
pub mod paginator;
pub mod pipeline;
pub mod storage;
pub mod viewport;

#[cfg(test)]
mod test_support;

pub use cache::FeedCache;
pub use config::Config;
pub use feed::fetcher::{FetchError, HttpNewsController, NewsController};
pub use feed::model::{CardType, DisplayAd, FeedItem, FeedItemMetadata, RawFeed};
pub use feed::normalizer::{Card, CardItem};
pub use pipeline::{FeedEvent, FeedPipeline, RefreshOutcome};
pub use storage::Database;
pub use viewport::{ScrollState, SettleOutcome, ViewportSample, ViewportTracker};
