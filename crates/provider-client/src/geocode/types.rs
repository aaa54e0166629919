use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::GeoPoint;

/// A resolved address with its coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct GeocodedAddress {
    pub original_address: String,
    pub formatted_address: String,
    pub point: GeoPoint,
}

/// Address details resolved from a coordinate pair.
#[derive(Debug, Clone, Serialize)]
pub struct ReverseAddress {
    pub point: GeoPoint,
    pub formatted_address: String,
    pub components: Value,
}

/// One candidate from the Nominatim search API. Coordinates arrive as
/// strings on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl NominatimPlace {
    pub(crate) fn point(&self) -> Option<GeoPoint> {
        let latitude = self.lat.parse::<f64>().ok()?;
        let longitude = self.lon.parse::<f64>().ok()?;
        Some(GeoPoint::new(latitude, longitude))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NominatimReverse {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Value,
}
