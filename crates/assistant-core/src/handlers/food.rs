use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use serde_json::json;
use tracing::info;

use super::wrap_handler;
use crate::services::interpreter::SearchQuery;
use crate::services::providers::{ProviderEntry, ProviderRegistry, ProviderSelectionError};
use crate::state::{AppContext, DomainRequest, HandlerDescriptor, HandlerInvoke, HandlerResult};

const RESULT_LIMIT: usize = 50;
const PREVIEW_COUNT: usize = 5;

/// Delivery platforms this handler can talk to. Rappi is registered but
/// switched off until its search integration lands.
static PROVIDERS: Lazy<ProviderRegistry> = Lazy::new(|| {
    ProviderRegistry::new(
        vec![
            ProviderEntry::new(
                "ifood",
                "iFood",
                &["ifood", "comida", "restaurante", "delivery", "entrega"],
            ),
            ProviderEntry::unavailable("rappi", "Rappi", &["rappi"]),
        ],
        "ifood",
    )
});

#[must_use]
pub fn providers() -> &'static ProviderRegistry {
    &PROVIDERS
}

#[must_use]
pub fn descriptor() -> HandlerDescriptor {
    HandlerDescriptor::new(
        "food_delivery",
        "Searches restaurants and food options across delivery platforms (iFood, Rappi, etc.)",
        &[
            "ifood",
            "food",
            "restaurant",
            "pizza",
            "hamburguer",
            "sushi",
            "comida",
            "restaurante",
            "pedir",
            "delivery",
            "entrega",
            "almoço",
            "jantar",
            "lanche",
            "rappi",
        ],
        &[
            "multi-platform food search",
            "restaurant discovery",
            "mobile deeplinks",
            "location-based search",
        ],
        false,
        HandlerInvoke::Ready(wrap_handler(handle)),
    )
}

async fn handle(context: Arc<AppContext>, request: DomainRequest) -> Result<HandlerResult> {
    let provider = match PROVIDERS.select(None) {
        Ok(provider) => provider,
        Err(error) => {
            return Ok(HandlerResult::failure(
                format!(
                    "Food delivery is unavailable right now. Services on file: {}.",
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

    let query = SearchQuery::derive(&request.text, request.location, RESULT_LIMIT);
    info!(
        food_type = %query.food_type,
        location = %query.location,
        provider = provider.id,
        "interpreted food query"
    );

    let outcome = context
        .providers
        .merchant
        .search(&query.food_type, query.location, query.limit)
        .await;

    if !outcome.success || outcome.restaurants.is_empty() {
        return Ok(HandlerResult::failure(
            format!(
                "Não encontrei restaurantes de {} na sua região. Que tal tentar outro tipo de comida?",
                query.food_type
            ),
            outcome.error,
        ));
    }

    let mut message = format!(
        "Encontrei {} opções de {} para você!\n",
        outcome.total_results, query.food_type
    );
    for restaurant in outcome.restaurants.iter().take(PREVIEW_COUNT) {
        let rating = restaurant
            .rating
            .map_or_else(|| "sem nota".to_string(), |rating| format!("⭐ {rating:.1}"));
        let _ = writeln!(
            message,
            "• {} — {} | {} | {} | {}",
            restaurant.name,
            rating,
            restaurant.distance_label,
            restaurant.delivery_fee_label,
            restaurant.delivery_time_label
        );
    }
    if outcome.total_results > PREVIEW_COUNT {
        let _ = writeln!(
            message,
            "... e mais {} opções disponíveis!",
            outcome.total_results - PREVIEW_COUNT
        );
    }

    let data = json!({
        "type": "restaurant_list",
        "provider": provider.id,
        "food_type": query.food_type,
        "query": {
            "original_query": query.raw_text,
            "location": query.location,
        },
        "total_count": outcome.total_results,
        "restaurants": outcome.restaurants,
    });

    Ok(HandlerResult::ok_with_data(message.trim_end(), data))
}

/// Search on one named platform, bypassing the default selection. Unknown
/// platforms produce a typed failure naming the alternatives.
pub async fn search_by_provider(
    context: &AppContext,
    provider_id: &str,
    request: &DomainRequest,
) -> HandlerResult {
    let provider = match PROVIDERS.get(provider_id) {
        Ok(provider) if provider.is_available() => provider,
        Ok(provider) => {
            return HandlerResult::failure(
                format!(
                    "{} is currently unavailable. Available services: {}.",
                    provider.name,
                    PROVIDERS.available_ids().join(", ")
                ),
                Some(
                    ProviderSelectionError::Unavailable {
                        requested: provider_id.to_string(),
                        available: PROVIDERS.available_ids(),
                    }
                    .to_string(),
                ),
            );
        }
        Err(error) => {
            return HandlerResult::failure(
                format!(
                    "I don't know the service '{provider_id}'. Available services: {}.",
                    PROVIDERS.available_ids().join(", ")
                ),
                Some(error.to_string()),
            );
        }
    };

    let query = SearchQuery::derive(&request.text, request.location, RESULT_LIMIT);
    let outcome = context
        .providers
        .merchant
        .search(&query.food_type, query.location, query.limit)
        .await;

    if outcome.success {
        HandlerResult::ok_with_data(
            format!(
                "Found {} {} options on {}.",
                outcome.total_results, query.food_type, provider.name
            ),
            json!({
                "type": "restaurant_list",
                "provider": provider.id,
                "food_type": query.food_type,
                "total_count": outcome.total_results,
                "restaurants": outcome.restaurants,
            }),
        )
    } else {
        HandlerResult::failure(
            format!("No {} results on {}.", query.food_type, provider.name),
            outcome.error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_is_ifood_and_available() {
        let provider = providers().select(None).unwrap();
        assert_eq!(provider.id, "ifood");
        assert!(provider.is_available());
    }

    #[test]
    fn rappi_is_registered_but_off() {
        let rappi = providers().get("rappi").unwrap();
        assert!(!rappi.is_available());
        // An explicit preference for it still lands on the default.
        assert_eq!(providers().select(Some("rappi")).unwrap().id, "ifood");
    }

    #[tokio::test]
    async fn unknown_provider_fails_with_the_alternatives() {
        let context = AppContext::new(provider_client::ProviderClients::new());
        let request = DomainRequest::from_text("pizza");
        let result = search_by_provider(&context, "glovo", &request).await;
        assert!(!result.success);
        assert!(result.message.contains("ifood"));
    }

    #[tokio::test]
    async fn disabled_provider_fails_without_searching() {
        let context = AppContext::new(provider_client::ProviderClients::new());
        let request = DomainRequest::from_text("pizza");
        let result = search_by_provider(&context, "rappi", &request).await;
        assert!(!result.success);
        assert!(result.message.contains("unavailable"));
    }
}
