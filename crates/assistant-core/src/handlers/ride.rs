use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use provider_client::rides::RideLinkBuilder;
use regex::Regex;
use serde_json::json;
use tracing::info;

use super::wrap_handler;
use crate::services::providers::{ProviderEntry, ProviderRegistry};
use crate::state::{AppContext, DomainRequest, HandlerDescriptor, HandlerInvoke, HandlerResult};

const CURRENT_LOCATION: &str = "current location";

static PROVIDERS: Lazy<ProviderRegistry> = Lazy::new(|| {
    ProviderRegistry::new(
        vec![
            ProviderEntry::new("uber", "Uber", &["uber", "ride", "trip", "taxi", "car"]),
            ProviderEntry::unavailable("99", "99", &["99"]),
        ],
        "uber",
    )
});

static FROM_TO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:from|de)\s+(.+?)\s+(?:to|para|pra|até|ate)\s+(.+)$")
        .expect("trip pattern")
});
static TO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:to|para|pra|até|ate)\s+(.+)$").expect("destination pattern"));

#[must_use]
pub fn providers() -> &'static ProviderRegistry {
    &PROVIDERS
}

#[must_use]
pub fn descriptor() -> HandlerDescriptor {
    HandlerDescriptor::new(
        "ride_sharing",
        "Handles transportation requests across ride sharing platforms (Uber, 99, etc.)",
        &[
            "uber",
            "ride",
            "trip",
            "transport",
            "go to",
            "pick me up",
            "take me to",
            "travel",
            "taxi",
            "car",
            "99",
            "cabify",
        ],
        &[
            "multi-platform rides",
            "location extraction",
            "deeplink creation",
            "transportation planning",
        ],
        false,
        HandlerInvoke::Ready(wrap_handler(handle)),
    )
}

/// Split a trip request into pickup and drop-off. Absent an explicit
/// origin the rider's current location is assumed.
#[must_use]
pub fn parse_trip(text: &str) -> Option<(String, String)> {
    if let Some(captures) = FROM_TO_RE.captures(text) {
        let origin = clean_endpoint(captures.get(1).map_or("", |m| m.as_str()));
        let destination = clean_endpoint(captures.get(2).map_or("", |m| m.as_str()));
        if !origin.is_empty() && !destination.is_empty() {
            return Some((origin, destination));
        }
    }
    if let Some(captures) = TO_RE.captures(text) {
        let destination = clean_endpoint(captures.get(1).map_or("", |m| m.as_str()));
        if !destination.is_empty() {
            return Some((CURRENT_LOCATION.to_string(), destination));
        }
    }
    None
}

fn clean_endpoint(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_string()
}

async fn handle(context: Arc<AppContext>, request: DomainRequest) -> Result<HandlerResult> {
    let provider = match PROVIDERS.select(None) {
        Ok(provider) => provider,
        Err(error) => {
            return Ok(HandlerResult::failure(
                format!(
                    "Ride sharing is unavailable right now. Services on file: {}.",
                    PROVIDERS
                        .entries()
                        .iter()
                        .map(|entry| entry.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                Some(error.to_string()),
            ));
        }
    };

    let Some((origin, destination)) = parse_trip(&request.text) else {
        return Ok(HandlerResult::failure(
            "Where would you like to go? Try something like 'take me to the airport' or \
'uber from home to the office'.",
            Some("no destination found in request".to_string()),
        ));
    };

    info!(provider = provider.id, %origin, %destination, "building ride link");

    let builder = RideLinkBuilder::new(&context.providers.geocode);
    match builder
        .build(&origin, &destination, None, None, request.location)
        .await
    {
        Ok(link) => {
            let message = format!(
                "{} ride request created: {} → {}. Open the link on your phone to confirm the trip.",
                provider.name, link.origin.formatted_address, link.destination.formatted_address
            );
            let data = json!({
                "type": "ride_link",
                "provider": provider.id,
                "deeplink": link.deeplink,
                "universal_link": link.universal_link,
                "origin": link.origin,
                "destination": link.destination,
            });
            Ok(HandlerResult::ok_with_data(message, data))
        }
        Err(error) => Ok(HandlerResult::failure(
            format!("I couldn't pin down the locations for that trip: {error}"),
            Some(error.to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_only_assumes_current_location() {
        let (origin, destination) = parse_trip("take me to the airport").unwrap();
        assert_eq!(origin, CURRENT_LOCATION);
        assert_eq!(destination, "the airport");
    }

    #[test]
    fn explicit_origin_and_destination_are_split() {
        let (origin, destination) = parse_trip("uber from Avenida Paulista to Congonhas").unwrap();
        assert_eq!(origin, "Avenida Paulista");
        assert_eq!(destination, "Congonhas");
    }

    #[test]
    fn portuguese_prepositions_work() {
        let (origin, destination) = parse_trip("me leva para o aeroporto?").unwrap();
        assert_eq!(origin, CURRENT_LOCATION);
        assert_eq!(destination, "o aeroporto");
    }

    #[test]
    fn no_destination_is_none() {
        assert!(parse_trip("I need a car").is_none());
    }

    #[test]
    fn default_ride_provider_is_uber() {
        assert_eq!(providers().select(None).unwrap().id, "uber");
        assert!(!providers().get("99").unwrap().is_available());
    }
}
