use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Canonical merchant record shared by every search strategy.
///
/// `id` and `name` are mandatory; raw entries missing either are dropped
/// whole during normalization rather than partially included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "image")]
    pub image_url: String,
    #[serde(rename = "distance")]
    pub distance_label: String,
    pub rating: Option<f64>,
    pub category: String,
    #[serde(rename = "delivery_fee")]
    pub delivery_fee_label: String,
    #[serde(rename = "delivery_time")]
    pub delivery_time_label: String,
    pub available: bool,
    #[serde(rename = "deeplink")]
    pub deeplink_url: String,
}

/// One strategy invocation in a fallback chain, recorded for logging and
/// fallback decisions only. Not persisted.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderAttempt {
    pub strategy: &'static str,
    pub succeeded: bool,
    pub result_count: usize,
}
