//! Wire-level feed payload shapes.
//!
//! These types mirror the remote news controller's schema. The panel core
//! treats them as opaque tagged unions: it never owns the serialized layout,
//! it only deserializes whatever the collaborator hands back.

use serde::Deserialize;

// ============================================================================
// Card Types
// ============================================================================

/// Layout class of a rendered card, assigned by the feed composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// The single featured item at the top of the feed.
    Headline,
    /// Two headlines rendered side by side.
    HeadlinePaired,
    /// Items grouped under one category label.
    CategoryGroup,
    /// Items grouped under one publisher.
    PublisherGroup,
    /// A block of deal items.
    Deals,
    /// An inline display ad slot; its payload arrives via a separate request.
    DisplayAd,
    /// A sponsored article requiring a one-time impression report.
    PromotedArticle,
}

// ============================================================================
// Item Variants
// ============================================================================

/// One heterogeneous feed entry.
///
/// The `Unknown` arm is deliberately last and untagged: a tag this build does
/// not recognize still deserializes (capturing the raw value) instead of
/// failing the entire feed payload. Metadata dispatch treats it as empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedItem {
    Article {
        data: FeedItemMetadata,
    },
    PromotedArticle {
        data: FeedItemMetadata,
        creative_instance_id: String,
    },
    Deal {
        data: FeedItemMetadata,
        offers_category: String,
    },
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

impl FeedItem {
    /// Metadata common to every recognized variant.
    ///
    /// Exhaustive over the union tag; an unrecognized tag yields empty
    /// metadata and a logged warning rather than a crash.
    pub fn metadata(&self) -> FeedItemMetadata {
        match self {
            FeedItem::Article { data } => data.clone(),
            FeedItem::PromotedArticle { data, .. } => data.clone(),
            FeedItem::Deal { data, .. } => data.clone(),
            FeedItem::Unknown(value) => {
                tracing::warn!(
                    payload = %value,
                    "Unrecognized feed item variant, substituting empty metadata"
                );
                FeedItemMetadata::default()
            }
        }
    }

    /// The creative instance id, present only on promoted articles.
    pub fn creative_instance_id(&self) -> Option<&str> {
        match self {
            FeedItem::PromotedArticle {
                creative_instance_id,
                ..
            } => Some(creative_instance_id),
            _ => None,
        }
    }
}

/// Display metadata shared by all item variants.
///
/// Every field is defaultable: an empty metadata instance is a valid value
/// (it is what unrecognized variants resolve to).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedItemMetadata {
    pub title: String,
    pub description: String,
    pub publisher_name: String,
    pub category_name: String,
    pub image: Option<Image>,
}

// ============================================================================
// Image References
// ============================================================================

/// Reference to a card's artwork.
///
/// At most one of the two arms resolves to a URL for a given metadata
/// instance; the composer pads some images server-side and not others.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Image {
    PaddedImageUrl(String),
    ImageUrl(String),
}

impl Image {
    /// Whichever URL is present, padded preferred by construction.
    pub fn resolve(&self) -> &str {
        match self {
            Image::PaddedImageUrl(url) | Image::ImageUrl(url) => url,
        }
    }
}

// ============================================================================
// Display Ads
// ============================================================================

/// Payload for an inline display ad slot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplayAd {
    pub uuid: String,
    pub creative_instance_id: String,
    pub title: String,
    pub description: String,
    pub target_url: String,
    pub cta_text: String,
    pub dimensions: String,
    pub image: Option<Image>,
}

// ============================================================================
// Feed Structure
// ============================================================================

/// The raw paginated feed as returned by `NewsController::get_feed`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeed {
    pub featured_item: FeedItem,
    #[serde(default)]
    pub pages: Vec<FeedPage>,
}

/// One server-composed page of the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub items: Vec<FeedPageItem>,
}

/// One renderable slot within a page: a card type plus the items it wraps.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPageItem {
    pub card_type: CardType,
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_article_item() {
        let json = r#"{
            "article": {
                "data": {
                    "title": "Rustls audited",
                    "publisher_name": "LWN",
                    "image": { "image_url": "https://cdn.example/a.jpg" }
                }
            }
        }"#;
        let item: FeedItem = serde_json::from_str(json).unwrap();
        let meta = item.metadata();
        assert_eq!(meta.title, "Rustls audited");
        assert_eq!(meta.publisher_name, "LWN");
        assert_eq!(
            meta.image.unwrap().resolve(),
            "https://cdn.example/a.jpg"
        );
    }

    #[test]
    fn test_deserialize_promoted_article_carries_creative_id() {
        let json = r#"{
            "promoted_article": {
                "data": { "title": "Sponsored" },
                "creative_instance_id": "abc-123"
            }
        }"#;
        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.creative_instance_id(), Some("abc-123"));
    }

    #[test]
    fn test_unknown_variant_deserializes_and_yields_empty_metadata() {
        let json = r#"{ "hologram": { "data": { "title": "???" } } }"#;
        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert!(matches!(item, FeedItem::Unknown(_)));
        let meta = item.metadata();
        assert_eq!(meta.title, "");
        assert!(meta.image.is_none());
    }

    #[test]
    fn test_image_resolves_either_arm() {
        let padded = Image::PaddedImageUrl("https://cdn.example/p.jpg".into());
        let plain = Image::ImageUrl("https://cdn.example/i.jpg".into());
        assert_eq!(padded.resolve(), "https://cdn.example/p.jpg");
        assert_eq!(plain.resolve(), "https://cdn.example/i.jpg");
    }

    #[test]
    fn test_deserialize_full_feed() {
        let json = r#"{
            "featured_item": { "article": { "data": { "title": "Top story" } } },
            "pages": [
                { "items": [
                    { "card_type": "display_ad", "items": [] },
                    { "card_type": "headline", "items": [
                        { "article": { "data": { "title": "One" } } }
                    ] }
                ] }
            ]
        }"#;
        let feed: RawFeed = serde_json::from_str(json).unwrap();
        assert_eq!(feed.pages.len(), 1);
        assert_eq!(feed.pages[0].items.len(), 2);
        assert_eq!(feed.pages[0].items[0].card_type, CardType::DisplayAd);
    }

    #[test]
    fn test_card_type_snake_case_names() {
        let t: CardType = serde_json::from_str(r#""promoted_article""#).unwrap();
        assert_eq!(t, CardType::PromotedArticle);
        let t: CardType = serde_json::from_str(r#""category_group""#).unwrap();
        assert_eq!(t, CardType::CategoryGroup);
    }
}
