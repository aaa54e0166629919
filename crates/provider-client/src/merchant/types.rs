use serde::Serialize;

use crate::types::{GeoPoint, ProviderAttempt, RestaurantRecord};

/// Outcome of a full fallback chain. Always well-formed: an exhausted chain
/// reports `success = false` with the last error, never a raised failure.
#[derive(Debug, Clone, Serialize)]
pub struct MerchantSearchResult {
    pub success: bool,
    pub message: String,
    pub search_term: String,
    pub location: GeoPoint,
    pub restaurants: Vec<RestaurantRecord>,
    pub total_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub attempts: Vec<ProviderAttempt>,
}

impl MerchantSearchResult {
    #[must_use]
    pub fn found(
        term: &str,
        location: GeoPoint,
        restaurants: Vec<RestaurantRecord>,
        attempts: Vec<ProviderAttempt>,
    ) -> Self {
        let total = restaurants.len();
        Self {
            success: true,
            message: format!("Found {total} restaurants for '{term}'"),
            search_term: term.to_string(),
            location,
            restaurants,
            total_results: total,
            error: None,
            attempts,
        }
    }

    #[must_use]
    pub fn exhausted(
        term: &str,
        location: GeoPoint,
        error: Option<String>,
        attempts: Vec<ProviderAttempt>,
    ) -> Self {
        Self {
            success: false,
            message: format!("No restaurants found for '{term}'"),
            search_term: term.to_string(),
            location,
            restaurants: Vec::new(),
            total_results: 0,
            error,
            attempts,
        }
    }
}

/// Body of the card-stack search POST. Field names follow the marketplace
/// wire format, which uses kebab-case keys.
#[derive(Debug, Serialize)]
pub struct CardStackRequest {
    #[serde(rename = "supported-headers")]
    pub supported_headers: &'static [&'static str],
    #[serde(rename = "supported-cards")]
    pub supported_cards: &'static [&'static str],
    #[serde(rename = "supported-actions")]
    pub supported_actions: &'static [&'static str],
    #[serde(rename = "feed-feature-name")]
    pub feed_feature_name: &'static str,
    #[serde(rename = "faster-overrides")]
    pub faster_overrides: &'static str,
}

impl Default for CardStackRequest {
    fn default() -> Self {
        Self {
            supported_headers: &["OPERATION_HEADER"],
            supported_cards: &[
                "MERCHANT_LIST",
                "CATALOG_ITEM_LIST",
                "CATALOG_ITEM_LIST_V2",
                "CATALOG_ITEM_LIST_V3",
                "FEATURED_MERCHANT_LIST",
                "CATALOG_ITEM_CAROUSEL",
                "CATALOG_ITEM_CAROUSEL_V2",
                "CATALOG_ITEM_CAROUSEL_V3",
                "BIG_BANNER_CAROUSEL",
                "IMAGE_BANNER",
                "MERCHANT_LIST_WITH_ITEMS_CAROUSEL",
                "SMALL_BANNER_CAROUSEL",
                "NEXT_CONTENT",
                "MERCHANT_CAROUSEL",
                "MERCHANT_TILE_CAROUSEL",
                "SIMPLE_MERCHANT_CAROUSEL",
                "INFO_CARD",
                "MERCHANT_LIST_V2",
                "ROUND_IMAGE_CAROUSEL",
                "BANNER_GRID",
                "MEDIUM_IMAGE_BANNER",
                "MEDIUM_BANNER_CAROUSEL",
                "RELATED_SEARCH_CAROUSEL",
                "ADS_BANNER",
            ],
            supported_actions: &[
                "catalog-item",
                "item-details",
                "merchant",
                "page",
                "card-content",
                "last-restaurants",
                "webmiddleware",
                "reorder",
                "search",
                "groceries",
                "home-tab",
            ],
            feed_feature_name: "",
            faster_overrides: "",
        }
    }
}
