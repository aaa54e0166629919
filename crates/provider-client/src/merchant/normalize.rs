use serde_json::Value;
use tracing::debug;

use super::deeplink::deeplink_from_action;
use crate::types::RestaurantRecord;

const IMAGE_CDN: &str = "https://static-images.ifood.com.br/image/upload";
const MERCHANT_CARD_TYPE: &str = "MERCHANT_LIST_V2";

/// Convert a raw card-stack payload into canonical restaurant records.
///
/// Walks `sections[] → cards[cardType=MERCHANT_LIST_V2] → data.contents[]`
/// keeping only entries marked available. A malformed payload or entry is
/// skipped, never an error; the output is at most as long as the available
/// entry count and re-normalizing the same payload yields identical records.
#[must_use]
pub fn normalize(payload: &Value) -> Vec<RestaurantRecord> {
    let Some(sections) = payload.get("sections").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for section in sections {
        if section.get("type").and_then(Value::as_str) != Some("CARDS") {
            continue;
        }
        let Some(cards) = section.get("cards").and_then(Value::as_array) else {
            continue;
        };
        for card in cards {
            if card.get("cardType").and_then(Value::as_str) != Some(MERCHANT_CARD_TYPE) {
                continue;
            }
            let Some(contents) = card
                .get("data")
                .and_then(|data| data.get("contents"))
                .and_then(Value::as_array)
            else {
                continue;
            };
            for entry in contents {
                if entry.get("available").and_then(Value::as_bool) != Some(true) {
                    continue;
                }
                match parse_merchant(entry) {
                    Some(record) => records.push(record),
                    None => debug!("dropping merchant entry without id or name"),
                }
            }
        }
    }
    records
}

fn parse_merchant(entry: &Value) -> Option<RestaurantRecord> {
    let id = entry.get("id").and_then(Value::as_str).unwrap_or_default();
    let name = entry.get("name").and_then(Value::as_str).unwrap_or_default();
    if id.is_empty() || name.is_empty() {
        return None;
    }

    let delivery = entry.get("deliveryInfo");
    let fee = delivery
        .and_then(|info| info.get("fee"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let time_min = delivery
        .and_then(|info| info.get("timeMinMinutes"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let time_max = delivery
        .and_then(|info| info.get("timeMaxMinutes"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let distance = entry
        .get("distance")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let action = entry.get("action").and_then(Value::as_str).unwrap_or("");

    Some(RestaurantRecord {
        id: id.to_string(),
        name: name.to_string(),
        image_url: format_image_url(
            entry.get("imageUrl").and_then(Value::as_str).unwrap_or(""),
        ),
        distance_label: distance_label(distance),
        rating: entry.get("userRating").and_then(Value::as_f64),
        category: entry
            .get("mainCategory")
            .and_then(Value::as_str)
            .unwrap_or("Restaurante")
            .to_string(),
        delivery_fee_label: fee_label(fee),
        delivery_time_label: time_label(time_min, time_max),
        available: true,
        deeplink_url: deeplink_from_action(action, id, name),
    })
}

/// Fee arrives in cents; zero or missing means free delivery.
fn fee_label(fee: f64) -> String {
    if fee > 0.0 {
        format!("R$ {:.2}", fee / 100.0).replace('.', ",")
    } else {
        "Grátis".to_string()
    }
}

/// Missing bounds mean the merchant wants to be asked.
fn time_label(min: i64, max: i64) -> String {
    if min > 0 && max > 0 {
        format!("{min}-{max} min")
    } else {
        "Consultar".to_string()
    }
}

fn distance_label(distance: f64) -> String {
    if distance > 0.0 {
        format!("{distance:.1} km")
    } else {
        "N/A".to_string()
    }
}

/// Normalize merchant image references against the static-images CDN.
#[must_use]
pub fn format_image_url(image_url: &str) -> String {
    if image_url.is_empty() {
        return String::new();
    }
    if let Some(rest) = image_url.strip_prefix(":resolution") {
        return format!("{IMAGE_CDN}/t_medium{rest}");
    }
    if image_url.starts_with("http") {
        return image_url.to_string();
    }
    format!("{IMAGE_CDN}/t_medium/{image_url}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn merchant_payload(contents: Vec<Value>) -> Value {
        json!({
            "sections": [{
                "type": "CARDS",
                "cards": [{
                    "cardType": "MERCHANT_LIST_V2",
                    "data": {"contents": contents}
                }]
            }]
        })
    }

    #[test]
    fn empty_and_malformed_payloads_yield_empty_lists() {
        assert!(normalize(&json!({})).is_empty());
        assert!(normalize(&json!(null)).is_empty());
        assert!(normalize(&json!({"sections": "oops"})).is_empty());
        assert!(normalize(&json!({"sections": [{"type": "CARDS", "cards": 42}]})).is_empty());
    }

    #[test]
    fn entries_missing_id_or_name_are_dropped_whole() {
        let payload = merchant_payload(vec![
            json!({"id": "", "name": "Sem Id", "available": true}),
            json!({"id": "abc", "available": true}),
            json!({"id": "ok-1", "name": "Cantina", "available": true}),
        ]);
        let records = normalize(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "ok-1");
        assert_eq!(records[0].name, "Cantina");
    }

    #[test]
    fn unavailable_entries_are_skipped() {
        let payload = merchant_payload(vec![
            json!({"id": "closed", "name": "Fechado", "available": false}),
            json!({"id": "open", "name": "Aberto", "available": true}),
        ]);
        let records = normalize(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "open");
    }

    #[test]
    fn labels_follow_the_fee_time_and_distance_rules() {
        let payload = merchant_payload(vec![json!({
            "id": "m1",
            "name": "Pizzaria Bairro",
            "available": true,
            "deliveryInfo": {"fee": 799, "timeMinMinutes": 30, "timeMaxMinutes": 40},
            "distance": 2.35,
            "userRating": 4.6,
            "mainCategory": "Pizza",
        })]);
        let record = &normalize(&payload)[0];
        assert_eq!(record.delivery_fee_label, "R$ 7,99");
        assert_eq!(record.delivery_time_label, "30-40 min");
        assert_eq!(record.distance_label, "2.3 km");
        assert_eq!(record.rating, Some(4.6));
        assert_eq!(record.category, "Pizza");
    }

    #[test]
    fn missing_fee_and_bounds_use_the_free_and_inquire_labels() {
        let payload = merchant_payload(vec![json!({
            "id": "m2",
            "name": "Marmitex",
            "available": true,
        })]);
        let record = &normalize(&payload)[0];
        assert_eq!(record.delivery_fee_label, "Grátis");
        assert_eq!(record.delivery_time_label, "Consultar");
        assert_eq!(record.distance_label, "N/A");
        assert_eq!(record.rating, None);
        assert_eq!(record.category, "Restaurante");
    }

    #[test]
    fn normalization_is_idempotent() {
        let payload = merchant_payload(vec![json!({
            "id": "m3",
            "name": "Sushi Leste",
            "available": true,
            "deliveryInfo": {"fee": 0, "timeMinMinutes": 20, "timeMaxMinutes": 35},
        })]);
        assert_eq!(normalize(&payload), normalize(&payload));
    }

    #[test]
    fn image_urls_are_rewritten_against_the_cdn() {
        assert_eq!(format_image_url(""), "");
        assert_eq!(
            format_image_url(":resolution/logosgde/abc.png"),
            "https://static-images.ifood.com.br/image/upload/t_medium/logosgde/abc.png"
        );
        assert_eq!(
            format_image_url("https://elsewhere.example/logo.png"),
            "https://elsewhere.example/logo.png"
        );
        assert_eq!(
            format_image_url("logosgde/abc.png"),
            "https://static-images.ifood.com.br/image/upload/t_medium/logosgde/abc.png"
        );
    }
}
