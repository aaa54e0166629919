use std::collections::HashMap;

/// Build a mobile deeplink from a structured action descriptor.
///
/// Preferred form preserves the merchant identifier and slug carried by the
/// action; entries without a usable action fall back to the id + URL-encoded
/// name form.
#[must_use]
pub fn deeplink_from_action(action: &str, merchant_id: &str, merchant_name: &str) -> String {
    if let Some((_, query)) = action.split_once("merchant?") {
        let params: HashMap<&str, String> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| {
                let decoded = urlencoding::decode(value)
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_else(|_| value.to_string());
                (key, decoded)
            })
            .collect();

        if let (Some(identifier), Some(slug)) = (params.get("identifier"), params.get("slug")) {
            return format!(
                "ifood://restaurant/{identifier}?slug={}",
                urlencoding::encode(slug)
            );
        }
        if let Some(identifier) = params.get("identifier") {
            return format!(
                "ifood://restaurant/{identifier}?name={}",
                urlencoding::encode(merchant_name)
            );
        }
    }

    mobile_deeplink(merchant_id, merchant_name)
}

/// Basic app deeplink for a merchant.
#[must_use]
pub fn mobile_deeplink(merchant_id: &str, merchant_name: &str) -> String {
    format!(
        "ifood://restaurant/{merchant_id}?name={}",
        urlencoding::encode(merchant_name)
    )
}

/// Web URL for a merchant when a page slug is known.
#[must_use]
pub fn web_link(merchant_id: &str, merchant_name: &str, slug: Option<&str>) -> String {
    match slug {
        Some(slug) => format!("https://www.ifood.com.br/delivery/{slug}"),
        None => mobile_deeplink(merchant_id, merchant_name),
    }
}
