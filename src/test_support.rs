//! Manual in-memory mock of the remote news controller.
//!
//! Manual rather than macro-generated: the contract mixes async requests with
//! sync one-way telemetry, and the tests want to inspect exactly what was
//! recorded.

use crate::feed::fetcher::{FetchError, NewsController};
use crate::feed::model::{DisplayAd, Image, RawFeed};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// [`NewsController`] double that serves a canned feed and records telemetry.
#[derive(Default)]
pub struct RecordingController {
    /// Serialized [`RawFeed`] JSON served by `get_feed`.
    pub feed_json: Mutex<Option<String>>,
    /// When set, `get_feed` fails with an HTTP 500.
    pub fail_feed: AtomicBool,
    /// Ad payload served by `get_display_ad` (`None` = no fill).
    pub ad: Mutex<Option<DisplayAd>>,
    /// Bytes served for every image request (`None` = miss).
    pub image_bytes: Mutex<Option<Vec<u8>>>,

    pub feed_calls: AtomicUsize,
    pub ad_calls: AtomicUsize,
    pub image_calls: AtomicUsize,

    pub promoted_views: Mutex<Vec<(String, String)>>,
    pub session_counts: Mutex<Vec<i16>>,
    pub sessions_started: AtomicUsize,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed_json(self, json: &str) -> Self {
        *self.feed_json.lock().unwrap() = Some(json.to_string());
        self
    }

    pub fn with_ad(self, ad: DisplayAd) -> Self {
        *self.ad.lock().unwrap() = Some(ad);
        self
    }

    pub fn with_image_bytes(self, bytes: Vec<u8>) -> Self {
        *self.image_bytes.lock().unwrap() = Some(bytes);
        self
    }

    pub fn failing(self) -> Self {
        self.fail_feed.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl NewsController for RecordingController {
    async fn get_feed(&self) -> Result<RawFeed, FetchError> {
        self.feed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_feed.load(Ordering::SeqCst) {
            return Err(FetchError::HttpStatus(500));
        }
        let json = self
            .feed_json
            .lock()
            .unwrap()
            .clone()
            .ok_or(FetchError::HttpStatus(404))?;
        serde_json::from_str(&json).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn get_display_ad(&self) -> Result<Option<DisplayAd>, FetchError> {
        self.ad_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ad.lock().unwrap().clone())
    }

    async fn get_image_data(&self, _image: &Image) -> Result<Option<Vec<u8>>, FetchError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.image_bytes.lock().unwrap().clone())
    }

    fn on_promoted_item_view(&self, uuid: &str, creative_instance_id: &str) {
        self.promoted_views
            .lock()
            .unwrap()
            .push((uuid.to_string(), creative_instance_id.to_string()));
    }

    fn on_session_card_views_count_changed(&self, count: i16) {
        self.session_counts.lock().unwrap().push(count);
    }

    fn on_interaction_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::SeqCst);
    }
}
