//! Feed acquisition and normalization.
//!
//! Three submodules cover the front half of the pipeline:
//!
//! - [`model`] - Wire shapes the remote collaborator returns (tagged unions)
//! - [`fetcher`] - The [`NewsController`] contract plus its HTTP implementation
//! - [`normalizer`] - Pure raw-feed → card-list conversion

pub mod fetcher;
pub mod model;
pub mod normalizer;

pub use fetcher::{FetchError, HttpNewsController, NewsController};
pub use model::{CardType, DisplayAd, FeedItem, FeedItemMetadata, FeedPage, FeedPageItem, Image, RawFeed};
pub use normalizer::{ad_slots, normalize, Card, CardItem};
