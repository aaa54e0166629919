use serde::Serialize;

use crate::types::GeoPoint;

/// A resolved trip endpoint: the rider-facing nickname plus the formatted
/// address and coordinates it geocoded to. Current-location pickups carry
/// no coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct RideEndpoint {
    pub nickname: String,
    pub formatted_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<GeoPoint>,
}

/// A ready-to-open ride request: the native app deeplink plus the
/// web-compatible universal link.
#[derive(Debug, Clone, Serialize)]
pub struct RideLink {
    pub origin: RideEndpoint,
    pub destination: RideEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoint: Option<RideEndpoint>,
    pub deeplink: String,
    pub universal_link: String,
}
