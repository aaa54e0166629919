use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use super::types::{RideEndpoint, RideLink};
use crate::geocode::{GeocodeClient, GeocodeError};
use crate::types::GeoPoint;

const APP_SCHEME: &str = "uber://riderequest";
const UNIVERSAL_BASE: &str = "https://m.uber.com/looking";
const WEB_BASE: &str = "https://m.uber.com/ul/";

const CURRENT_LOCATION_PHRASES: &[&str] = &[
    "current location",
    "my location",
    "here",
    "where i am",
    "minha localização",
    "minha localizacao",
    "aqui",
];

#[derive(Debug, Error)]
pub enum RideLinkError {
    #[error("could not resolve {endpoint}: {source}")]
    Geocode {
        endpoint: String,
        source: GeocodeError,
    },
}

/// Builds app deeplinks and universal links for a ride request, geocoding
/// every named endpoint through the shared geocoder.
pub struct RideLinkBuilder<'a> {
    geocoder: &'a GeocodeClient,
}

impl<'a> RideLinkBuilder<'a> {
    #[must_use]
    pub fn new(geocoder: &'a GeocodeClient) -> Self {
        Self { geocoder }
    }

    #[instrument(name = "rides.build_link", skip(self))]
    pub async fn build(
        &self,
        origin: &str,
        destination: &str,
        waypoint: Option<&str>,
        product_id: Option<&str>,
        bias: Option<GeoPoint>,
    ) -> Result<RideLink, RideLinkError> {
        let origin_endpoint = if is_current_location(origin) {
            RideEndpoint {
                nickname: "Current Location".to_string(),
                formatted_address: "Current Location".to_string(),
                point: None,
            }
        } else {
            self.resolve(origin, bias, "origin").await?
        };

        let destination_endpoint = self.resolve(destination, bias, "destination").await?;

        let waypoint_endpoint = match waypoint {
            // A waypoint that fails to geocode is carried by name only.
            Some(stop) => match self.resolve(stop, bias, "waypoint").await {
                Ok(endpoint) => Some(endpoint),
                Err(_) => Some(RideEndpoint {
                    nickname: stop.to_string(),
                    formatted_address: stop.to_string(),
                    point: None,
                }),
            },
            None => None,
        };

        let deeplink = app_deeplink(&origin_endpoint, &destination_endpoint, product_id);
        let universal_link = universal_link(&origin_endpoint, &destination_endpoint);

        Ok(RideLink {
            origin: origin_endpoint,
            destination: destination_endpoint,
            waypoint: waypoint_endpoint,
            deeplink,
            universal_link,
        })
    }

    async fn resolve(
        &self,
        address: &str,
        bias: Option<GeoPoint>,
        endpoint: &str,
    ) -> Result<RideEndpoint, RideLinkError> {
        let resolved = self
            .geocoder
            .geocode(address, bias)
            .await
            .map_err(|source| RideLinkError::Geocode {
                endpoint: format!("{endpoint} '{address}'"),
                source,
            })?;
        Ok(RideEndpoint {
            nickname: address.to_string(),
            formatted_address: resolved.formatted_address,
            point: Some(resolved.point),
        })
    }
}

fn is_current_location(origin: &str) -> bool {
    let normalized = origin.trim().to_lowercase();
    CURRENT_LOCATION_PHRASES
        .iter()
        .any(|phrase| normalized == *phrase)
}

fn app_deeplink(origin: &RideEndpoint, destination: &RideEndpoint, product_id: Option<&str>) -> String {
    let dropoff = destination
        .point
        .unwrap_or(GeoPoint::new(0.0, 0.0));
    let mut link = match origin.point {
        Some(pickup) => format!(
            "{APP_SCHEME}?pickup[latitude]={}&pickup[longitude]={}&pickup[nickname]={}&pickup[formatted_address]={}&dropoff[latitude]={}&dropoff[longitude]={}&dropoff[nickname]={}&dropoff[formatted_address]={}",
            pickup.latitude,
            pickup.longitude,
            urlencoding::encode(&origin.nickname),
            urlencoding::encode(&origin.formatted_address),
            dropoff.latitude,
            dropoff.longitude,
            urlencoding::encode(&destination.nickname),
            urlencoding::encode(&destination.formatted_address),
        ),
        None => format!(
            "{APP_SCHEME}?pickup=my_location&dropoff[latitude]={}&dropoff[longitude]={}&dropoff[nickname]={}&dropoff[formatted_address]={}",
            dropoff.latitude,
            dropoff.longitude,
            urlencoding::encode(&destination.nickname),
            urlencoding::encode(&destination.formatted_address),
        ),
    };
    if let Some(product) = product_id {
        link.push_str("&product_id=");
        link.push_str(product);
    }
    link
}

fn universal_link(origin: &RideEndpoint, destination: &RideEndpoint) -> String {
    let drop = encoded_stop(destination);
    match origin.point {
        Some(_) => {
            let pickup = encoded_stop(origin);
            format!("{UNIVERSAL_BASE}?pickup={pickup}&drop[0]={drop}")
        }
        None => format!("{UNIVERSAL_BASE}?pickup=my_location&drop[0]={drop}"),
    }
}

fn encoded_stop(endpoint: &RideEndpoint) -> String {
    let point = endpoint.point.unwrap_or(GeoPoint::new(0.0, 0.0));
    let region = endpoint
        .formatted_address
        .rsplit(',')
        .next()
        .map(str::trim)
        .unwrap_or("");
    let payload = json!({
        "latitude": point.latitude,
        "longitude": point.longitude,
        "addressLine1": endpoint.nickname,
        "addressLine2": region,
    });
    urlencoding::encode(&payload.to_string()).into_owned()
}

/// Plain web fallback when neither the app nor the universal flow applies.
#[must_use]
pub fn web_link(origin: &str, destination: &str) -> String {
    format!(
        "{WEB_BASE}?action=setPickup&pickup[formatted_address]={}&dropoff[formatted_address]={}",
        urlencoding::encode(origin),
        urlencoding::encode(destination)
    )
}
