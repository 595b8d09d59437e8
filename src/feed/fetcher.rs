//! Remote news controller contract and its HTTP implementation.
//!
//! The pipeline never talks to the network directly; it goes through the
//! [`NewsController`] trait so tests (and embedders with their own transport)
//! can substitute an in-memory implementation.

use crate::feed::model::{DisplayAd, Image, RawFeed};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by controller requests.
///
/// The pipeline is fire-once: none of these trigger a retry. A failed feed
/// fetch leaves the previously published state authoritative; a failed image
/// or ad fetch degrades to "no image" / "no ad".
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Payload could not be decoded as the collaborator's schema
    #[error("Decode error: {0}")]
    Decode(String),
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

// ============================================================================
// Collaborator Contract
// ============================================================================

/// The remote feed/news controller consumed by the panel core.
///
/// The three `get_*` calls are asynchronous, fire-once requests. The three
/// `on_*` calls are one-way telemetry notifications; implementations must not
/// block the caller on them.
#[async_trait]
pub trait NewsController: Send + Sync + 'static {
    /// Fetch the raw paginated feed.
    async fn get_feed(&self) -> Result<RawFeed, FetchError>;

    /// Fetch the payload for one inline ad slot. `Ok(None)` (no fill) is a
    /// valid state, not an error.
    async fn get_display_ad(&self) -> Result<Option<DisplayAd>, FetchError>;

    /// Fetch the bytes behind an image reference. `Ok(None)` means the
    /// collaborator had nothing for this reference.
    async fn get_image_data(&self, image: &Image) -> Result<Option<Vec<u8>>, FetchError>;

    /// Report a one-time impression of a promoted card.
    fn on_promoted_item_view(&self, uuid: &str, creative_instance_id: &str);

    /// Throttled batch signal carrying the session's running view count.
    fn on_session_card_views_count_changed(&self, count: i16);

    /// The user has started engaging with the panel this session.
    fn on_interaction_session_started(&self);
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// [`NewsController`] over HTTP/JSON.
///
/// Request shape:
/// - `GET {base}/feed` → [`RawFeed`] JSON
/// - `GET {base}/display_ad` → [`DisplayAd`] JSON, or 204/404 for no fill
/// - `GET <image url>` → raw bytes, or 404 for a miss
/// - telemetry → fire-and-forget `POST {base}/events/...`
///
/// Requests are fire-once with no retry, and run without a timeout unless
/// one is configured. A failed fetch leaves whatever was previously
/// published in place.
pub struct HttpNewsController {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
    max_body_bytes: usize,
}

impl HttpNewsController {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
            max_body_bytes,
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let request = self.client.get(url).send();
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| FetchError::Timeout)?,
            None => request.await,
        }
        .map_err(FetchError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, self.max_body_bytes).await?;
        Ok(Some(bytes))
    }

    /// One-way event POST; completion is not awaited by the caller.
    fn post_event(&self, path: &str, body: serde_json::Value) {
        let url = format!("{}/events/{}", self.base_url, path);
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.post(&url).json(&body).send().await {
                tracing::warn!(url = %url, error = %e, "Telemetry event send failed");
            }
        });
    }
}

#[async_trait]
impl NewsController for HttpNewsController {
    async fn get_feed(&self) -> Result<RawFeed, FetchError> {
        let url = format!("{}/feed", self.base_url);
        let bytes = self
            .get_bytes(&url)
            .await?
            .ok_or(FetchError::HttpStatus(404))?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn get_display_ad(&self) -> Result<Option<DisplayAd>, FetchError> {
        let url = format!("{}/display_ad", self.base_url);
        match self.get_bytes(&url).await? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| FetchError::Decode(e.to_string())),
        }
    }

    async fn get_image_data(&self, image: &Image) -> Result<Option<Vec<u8>>, FetchError> {
        self.get_bytes(image.resolve()).await
    }

    fn on_promoted_item_view(&self, uuid: &str, creative_instance_id: &str) {
        self.post_event(
            "promoted_item_view",
            serde_json::json!({
                "uuid": uuid,
                "creative_instance_id": creative_instance_id,
            }),
        );
    }

    fn on_session_card_views_count_changed(&self, count: i16) {
        self.post_event("session_card_views", serde_json::json!({ "count": count }));
    }

    fn on_interaction_session_started(&self) {
        self.post_event("interaction_session_started", serde_json::json!({}));
    }
}

/// Read a response body up to `limit` bytes, streaming chunk by chunk so an
/// oversized payload is rejected before it is fully buffered.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_FEED: &str = r#"{
        "featured_item": { "article": { "data": { "title": "Top" } } },
        "pages": [
            { "items": [
                { "card_type": "headline", "items": [
                    { "article": { "data": { "title": "One" } } }
                ] }
            ] }
        ]
    }"#;

    fn controller(server: &MockServer) -> HttpNewsController {
        HttpNewsController::new(reqwest::Client::new(), server.uri(), None, 1024 * 1024)
    }

    #[tokio::test]
    async fn test_get_feed_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_FEED))
            .mount(&server)
            .await;

        let feed = controller(&server).get_feed().await.unwrap();
        assert_eq!(feed.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_get_feed_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        match controller(&server).get_feed().await.unwrap_err() {
            FetchError::HttpStatus(500) => {}
            e => panic!("Expected HttpStatus(500), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_get_feed_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_FEED)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let controller = HttpNewsController::new(
            reqwest::Client::new(),
            server.uri(),
            Some(Duration::from_millis(50)),
            1024 * 1024,
        );
        match controller.get_feed().await.unwrap_err() {
            FetchError::Timeout => {}
            e => panic!("Expected Timeout, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_get_feed_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        match controller(&server).get_feed().await.unwrap_err() {
            FetchError::Decode(_) => {}
            e => panic!("Expected Decode error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_get_display_ad_no_fill_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/display_ad"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let ad = controller(&server).get_display_ad().await.unwrap();
        assert!(ad.is_none());
    }

    #[tokio::test]
    async fn test_get_image_data_miss_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let image = Image::ImageUrl(format!("{}/img.jpg", server.uri()));
        let data = controller(&server).get_image_data(&image).await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_get_image_data_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(&[1u8, 2, 3][..]))
            .mount(&server)
            .await;

        let image = Image::PaddedImageUrl(format!("{}/img.jpg", server.uri()));
        let data = controller(&server).get_image_data(&image).await.unwrap();
        assert_eq!(data.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let small = HttpNewsController::new(reqwest::Client::new(), server.uri(), None, 16);
        match small.get_feed().await.unwrap_err() {
            FetchError::ResponseTooLarge => {}
            e => panic!("Expected ResponseTooLarge, got {:?}", e),
        }
    }
}
