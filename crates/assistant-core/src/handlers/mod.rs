use std::future::Future;
use std::sync::Arc;

use anyhow::Result;

use crate::state::{
    AppContext, DomainRequest, HandlerDescriptor, HandlerFn, HandlerInvoke, HandlerRegistry,
    HandlerResult,
};

pub mod calendar;
pub mod email;
pub mod food;
pub mod ride;

/// Build the process-wide handler registry. Order matters: it defines
/// classifier tie-break precedence and the agents listing.
#[must_use]
pub fn register_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::default();
    registry.insert(ride::descriptor());
    registry.insert(food::descriptor());
    registry.insert(email::descriptor());
    registry.insert(calendar::descriptor());

    // Planned integrations stay visible as explicit not-implemented
    // entries instead of null handlers.
    registry.insert(HandlerDescriptor::new(
        "travel",
        "Flight search, bookings, and travel planning across airlines.",
        &[
            "flight", "voo", "viagem", "airplane", "avião", "booking", "reserva", "airport",
            "aeroporto", "passagem", "destination", "destino", "hotel",
        ],
        &["flight search", "bookings", "itinerary planning"],
        false,
        HandlerInvoke::NotImplemented,
    ));
    registry.insert(HandlerDescriptor::new(
        "reminders",
        "Creates and manages reminders for important dates and events.",
        &[
            "reminder", "lembrete", "remind", "lembrar", "alert", "alerta", "notification",
            "notificação",
        ],
        &["create reminders", "list reminders", "cancel reminders"],
        false,
        HandlerInvoke::NotImplemented,
    ));
    registry
}

pub(crate) fn wrap_handler<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(Arc<AppContext>, DomainRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResult>> + Send + 'static,
{
    Arc::new(move |context, request| Box::pin(handler(context, request)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_all_domains_in_order() {
        let registry = register_handlers();
        let ids: Vec<_> = registry.summaries().iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                "ride_sharing",
                "food_delivery",
                "email",
                "calendar",
                "travel",
                "reminders"
            ]
        );
    }

    #[test]
    fn credentialed_handlers_are_flagged() {
        let registry = register_handlers();
        assert!(registry.get("email").unwrap().requires_auth);
        assert!(registry.get("calendar").unwrap().requires_auth);
        assert!(!registry.get("food_delivery").unwrap().requires_auth);
    }

    #[test]
    fn future_integrations_are_visible_but_not_implemented() {
        let registry = register_handlers();
        assert!(!registry.get("travel").unwrap().is_implemented());
        assert!(!registry.get("reminders").unwrap().is_implemented());
        assert!(registry.get("ride_sharing").unwrap().is_implemented());
    }
}
