use std::time::Duration as StdDuration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument};

use super::types::{GeocodedAddress, NominatimPlace, NominatimReverse, ReverseAddress};
use crate::types::GeoPoint;

const SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
const REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const USER_AGENT: &str = "AssistantBackend/1.0 (personal assistant geocoder)";
const CANDIDATE_LIMIT: usize = 5;
const BIAS_BOX_DEGREES: f64 = 0.1;
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);

#[derive(Debug, Clone, Error)]
pub enum GeocodeError {
    #[error("no coordinates found for address: {0}")]
    NotFound(String),
    #[error("geocoding request failed: {0}")]
    Http(String),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error("failed to decode geocoding response: {0}")]
    Decode(String),
}

/// Free-text address resolution with optional location biasing. Multiple
/// candidates are requested so the one nearest a bias point can be chosen.
#[derive(Debug)]
pub struct GeocodeClient {
    http: Client,
}

impl Default for GeocodeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodeClient {
    #[must_use]
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");
        Self { http }
    }

    #[instrument(name = "geocode.search", skip(self))]
    pub async fn geocode(
        &self,
        address: &str,
        bias: Option<GeoPoint>,
    ) -> Result<GeocodedAddress, GeocodeError> {
        let mut params = vec![
            ("q", address.to_string()),
            ("format", "json".to_string()),
            ("limit", CANDIDATE_LIMIT.to_string()),
            ("addressdetails", "1".to_string()),
        ];
        if let Some(bias) = bias {
            params.push((
                "viewbox",
                format!(
                    "{},{},{},{}",
                    bias.longitude - BIAS_BOX_DEGREES,
                    bias.latitude - BIAS_BOX_DEGREES,
                    bias.longitude + BIAS_BOX_DEGREES,
                    bias.latitude + BIAS_BOX_DEGREES
                ),
            ));
            params.push(("bounded", "1".to_string()));
        }

        let response = self
            .http
            .get(SEARCH_URL)
            .query(&params)
            .send()
            .await
            .map_err(|error| GeocodeError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|error| GeocodeError::Decode(error.to_string()))?;
        if places.is_empty() {
            return Err(GeocodeError::NotFound(address.to_string()));
        }

        let candidates: Vec<(GeoPoint, Option<String>)> = places
            .iter()
            .filter_map(|place| place.point().map(|point| (point, place.display_name.clone())))
            .collect();
        if candidates.is_empty() {
            return Err(GeocodeError::Decode(format!(
                "no parsable coordinates for address: {address}"
            )));
        }

        let (point, display_name) = pick_candidate(&candidates, bias);
        debug!(address, %point, "address resolved");
        Ok(GeocodedAddress {
            original_address: address.to_string(),
            formatted_address: display_name.unwrap_or_else(|| address.to_string()),
            point,
        })
    }

    #[instrument(name = "geocode.reverse", skip(self))]
    pub async fn reverse(&self, point: GeoPoint) -> Result<ReverseAddress, GeocodeError> {
        let params = [
            ("lat", point.latitude.to_string()),
            ("lon", point.longitude.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ];

        let response = self
            .http
            .get(REVERSE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|error| GeocodeError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let reverse: NominatimReverse = response
            .json()
            .await
            .map_err(|error| GeocodeError::Decode(error.to_string()))?;
        let formatted = reverse
            .display_name
            .ok_or_else(|| GeocodeError::NotFound(point.to_string()))?;

        Ok(ReverseAddress {
            point,
            formatted_address: formatted,
            components: reverse.address,
        })
    }
}

/// Without a bias point the upstream ranking wins; with one, the candidate
/// nearest the bias point wins.
fn pick_candidate(
    candidates: &[(GeoPoint, Option<String>)],
    bias: Option<GeoPoint>,
) -> (GeoPoint, Option<String>) {
    let Some(bias) = bias else {
        return candidates[0].clone();
    };

    let mut best = candidates[0].clone();
    let mut best_distance = haversine_km(best.0, bias);
    for candidate in &candidates[1..] {
        let distance = haversine_km(candidate.0, bias);
        if distance < best_distance {
            best = candidate.clone();
            best_distance = distance;
        }
    }
    best
}

/// Great-circle distance between two points in kilometers.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * EARTH_RADIUS_KM
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAO_PAULO: GeoPoint = GeoPoint::new(-23.5505, -46.6333);
    const RIO: GeoPoint = GeoPoint::new(-22.9068, -43.1729);
    const SALVADOR: GeoPoint = GeoPoint::new(-12.9714, -38.5014);

    #[test]
    fn haversine_matches_known_distances() {
        let sp_rio = haversine_km(SAO_PAULO, RIO);
        assert!((sp_rio - 360.0).abs() < 15.0, "got {sp_rio}");
        assert!(haversine_km(SAO_PAULO, SAO_PAULO).abs() < f64::EPSILON);
    }

    #[test]
    fn bias_selects_the_nearest_candidate() {
        let candidates = vec![
            (RIO, Some("Rio branch".to_string())),
            (SALVADOR, Some("Salvador branch".to_string())),
            (SAO_PAULO, Some("São Paulo branch".to_string())),
        ];
        let (point, name) = pick_candidate(&candidates, Some(GeoPoint::new(-23.6, -46.7)));
        assert_eq!(point, SAO_PAULO);
        assert_eq!(name.as_deref(), Some("São Paulo branch"));
    }

    #[test]
    fn without_bias_the_first_candidate_wins() {
        let candidates = vec![
            (RIO, Some("first".to_string())),
            (SAO_PAULO, Some("second".to_string())),
        ];
        let (point, name) = pick_candidate(&candidates, None);
        assert_eq!(point, RIO);
        assert_eq!(name.as_deref(), Some("first"));
    }

    #[test]
    fn string_coordinates_parse() {
        let place = NominatimPlace {
            lat: "-23.5505".to_string(),
            lon: "-46.6333".to_string(),
            display_name: None,
        };
        assert_eq!(place.point(), Some(SAO_PAULO));

        let broken = NominatimPlace {
            lat: "not-a-number".to_string(),
            lon: "-46.6333".to_string(),
            display_name: None,
        };
        assert_eq!(broken.point(), None);
    }
}
