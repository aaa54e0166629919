use once_cell::sync::Lazy;
use provider_client::types::GeoPoint;
use regex::Regex;

/// Default search location when neither explicit coordinates nor a city
/// mention resolve: São Paulo (IBGE reference point).
pub const DEFAULT_LOCATION: GeoPoint = GeoPoint::new(-23.598_261_4, -46.690_165_3);
pub const DEFAULT_FOOD_TAG: &str = "restaurante";

pub struct FoodMapping {
    pub tag: &'static str,
    pub variants: &'static [&'static str],
}

/// Canonical food tags and their free-text variants. Scan order defines
/// tie-break precedence and must stay stable for reproducible results.
pub static FOOD_TABLE: &[FoodMapping] = &[
    FoodMapping {
        tag: "pizza",
        variants: &["pizza", "pizzaria", "pizzas", "margherita", "calabresa"],
    },
    FoodMapping {
        tag: "hamburguer",
        variants: &[
            "hamburguer",
            "hamburger",
            "burger",
            "lanche",
            "sanduiche",
            "x-burger",
            "x-salada",
            "big mac",
            "whopper",
        ],
    },
    FoodMapping {
        tag: "sushi",
        variants: &[
            "sushi", "japonesa", "japones", "temaki", "sashimi", "yakisoba", "udon", "ramen",
            "hossomaki",
        ],
    },
    FoodMapping {
        tag: "italiana",
        variants: &[
            "italiana",
            "italiano",
            "macarrao",
            "pasta",
            "lasanha",
            "espaguete",
            "nhoque",
            "risotto",
        ],
    },
    FoodMapping {
        tag: "chinesa",
        variants: &[
            "chinesa",
            "chines",
            "yakisoba",
            "frango xadrez",
            "rolinho primavera",
        ],
    },
    FoodMapping {
        tag: "mexicana",
        variants: &[
            "mexicana",
            "mexicano",
            "burrito",
            "taco",
            "nachos",
            "quesadilla",
        ],
    },
    FoodMapping {
        tag: "brasileira",
        variants: &[
            "brasileira",
            "brasileiro",
            "feijoada",
            "churrasco",
            "picanha",
            "farofa",
            "coxinha",
            "pao de acucar",
        ],
    },
    FoodMapping {
        tag: "doce",
        variants: &[
            "doce",
            "sobremesa",
            "açai",
            "acai",
            "sorvete",
            "bolo",
            "torta",
            "pudim",
            "brigadeiro",
        ],
    },
    FoodMapping {
        tag: "cafe",
        variants: &["cafe", "café", "cafeteria", "cappuccino", "expresso", "latte"],
    },
    FoodMapping {
        tag: "saudavel",
        variants: &[
            "saudavel",
            "saudável",
            "vegetariana",
            "vegetariano",
            "vegana",
            "vegano",
            "salada",
            "fitness",
            "light",
        ],
    },
    FoodMapping {
        tag: "frango",
        variants: &["frango", "chicken", "galeto", "asa", "coxa"],
    },
    FoodMapping {
        tag: "carne",
        variants: &["carne", "beef", "bife", "picanha", "alcatra", "maminha"],
    },
    FoodMapping {
        tag: "peixe",
        variants: &["peixe", "fish", "salmao", "salmão", "bacalhau", "tilapia"],
    },
    FoodMapping {
        tag: "fast food",
        variants: &["fast food", "lanchonete", "delivery", "rapido", "rápido"],
    },
];

pub struct CityEntry {
    pub name: &'static str,
    pub point: GeoPoint,
    pub aliases: &'static [&'static str],
}

/// Major cities with coordinates and spoken aliases, in precedence order.
pub static CITY_TABLE: &[CityEntry] = &[
    CityEntry {
        name: "sao paulo",
        point: GeoPoint::new(-23.5505, -46.6333),
        aliases: &["sp", "sampa", "são paulo"],
    },
    CityEntry {
        name: "rio de janeiro",
        point: GeoPoint::new(-22.9068, -43.1729),
        aliases: &["rio", "rj", "cidade maravilhosa"],
    },
    CityEntry {
        name: "belo horizonte",
        point: GeoPoint::new(-19.9167, -43.9345),
        aliases: &["bh", "belô"],
    },
    CityEntry {
        name: "brasilia",
        point: GeoPoint::new(-15.7942, -47.8822),
        aliases: &["bsb", "df", "brasília"],
    },
    CityEntry {
        name: "salvador",
        point: GeoPoint::new(-12.9714, -38.5014),
        aliases: &["ssa", "bahia"],
    },
    CityEntry {
        name: "fortaleza",
        point: GeoPoint::new(-3.7319, -38.5267),
        aliases: &["ce", "ceará"],
    },
    CityEntry {
        name: "recife",
        point: GeoPoint::new(-8.0476, -34.8770),
        aliases: &["pe", "pernambuco"],
    },
    CityEntry {
        name: "porto alegre",
        point: GeoPoint::new(-30.0346, -51.2177),
        aliases: &["poa", "rs"],
    },
];

/// Filler words skipped when falling back to raw tokens. Includes generic
/// food words so the fallback lands on the distinguishing term.
static STOP_WORDS: &[&str] = &[
    "o",
    "que",
    "tem",
    "para",
    "comer",
    "onde",
    "posso",
    "pedir",
    "quero",
    "gostaria",
    "de",
    "um",
    "uma",
    "algum",
    "alguma",
    "disponivel",
    "disponível",
    "próximo",
    "proximo",
    "perto",
    "aqui",
    "ai",
    "aí",
    "me",
    "da",
    "do",
    "na",
    "no",
    "em",
    "por",
    "favor",
    "pfv",
    "agora",
    "hoje",
    "delivery",
    "entrega",
    "comida",
];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern"));

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["em", "no", "na", "de", "da", "do"]
        .iter()
        .map(|preposition| {
            Regex::new(&format!(r"\b{preposition}\s+(\w+)")).expect("location pattern")
        })
        .collect()
});

/// Map free text to a canonical food tag.
///
/// The variant table is scanned first; otherwise the first meaningful token
/// (not a stop word, longer than two characters) wins, and `restaurante`
/// closes the fallback.
#[must_use]
pub fn food_type(text: &str) -> String {
    let normalized = text.to_lowercase();

    for mapping in FOOD_TABLE {
        for variant in mapping.variants {
            if normalized.contains(variant) {
                return mapping.tag.to_string();
            }
        }
    }

    for token in WORD_RE.find_iter(&normalized) {
        let word = token.as_str();
        if word.chars().count() > 2 && !STOP_WORDS.contains(&word) {
            return word.to_string();
        }
    }

    DEFAULT_FOOD_TAG.to_string()
}

/// Resolve a city mention to coordinates, or `None` when the text names no
/// known place (callers then apply `DEFAULT_LOCATION`).
#[must_use]
pub fn location(text: &str) -> Option<GeoPoint> {
    let normalized = text.to_lowercase();

    for city in CITY_TABLE {
        if normalized.contains(city.name) {
            return Some(city.point);
        }
        for alias in city.aliases {
            if normalized.contains(alias) {
                return Some(city.point);
            }
        }
    }

    for pattern in LOCATION_PATTERNS.iter() {
        if let Some(capture) = pattern.captures(&normalized) {
            let token = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
            for city in CITY_TABLE {
                if city.name.contains(token) || city.aliases.contains(&token) {
                    return Some(city.point);
                }
            }
        }
    }

    None
}

/// A fully-resolved search request. Coordinates are always populated before
/// this is handed downstream.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub raw_text: String,
    pub food_type: String,
    pub location: GeoPoint,
    pub limit: usize,
}

impl SearchQuery {
    /// Derive a query from user text plus optional explicit coordinates.
    /// Explicit coordinates win over a city mention, which wins over the
    /// default location.
    #[must_use]
    pub fn derive(text: &str, explicit: Option<GeoPoint>, limit: usize) -> Self {
        let resolved = explicit
            .or_else(|| location(text))
            .unwrap_or(DEFAULT_LOCATION);
        Self {
            raw_text: text.to_string(),
            food_type: food_type(text),
            location: resolved,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_variants_win_over_token_fallback() {
        assert_eq!(food_type("Quero pizza agora"), "pizza");
        assert_eq!(food_type("Onde posso pedir sushi em São Paulo?"), "sushi");
        assert_eq!(food_type("me vê um x-salada"), "hamburguer");
    }

    #[test]
    fn unknown_food_falls_back_to_first_meaningful_token() {
        assert_eq!(food_type("comida estranha xyz"), "estranha");
    }

    #[test]
    fn all_stop_words_fall_back_to_the_default_tag() {
        assert_eq!(food_type("o que tem para comer aqui"), DEFAULT_FOOD_TAG);
        assert_eq!(food_type(""), DEFAULT_FOOD_TAG);
    }

    #[test]
    fn table_order_breaks_ties() {
        // "picanha" appears under both brasileira and carne; the earlier
        // table entry wins.
        assert_eq!(food_type("picanha no ponto"), "brasileira");
    }

    #[test]
    fn city_names_resolve_directly() {
        let salvador = location("restaurantes em Salvador").unwrap();
        assert!((salvador.latitude - -12.9714).abs() < 1e-9);
        assert!((salvador.longitude - -38.5014).abs() < 1e-9);
    }

    #[test]
    fn aliases_resolve_too() {
        let rio = location("pizza no rio").unwrap();
        assert!((rio.latitude - -22.9068).abs() < 1e-9);
    }

    #[test]
    fn unknown_locations_return_none() {
        assert_eq!(location("comida boa"), None);
    }

    #[test]
    fn derived_queries_always_carry_coordinates() {
        let explicit = SearchQuery::derive("pizza", Some(GeoPoint::new(-19.9, -43.9)), 10);
        assert!((explicit.location.latitude - -19.9).abs() < 1e-9);

        let from_city = SearchQuery::derive("pizza em salvador", None, 10);
        assert!((from_city.location.latitude - -12.9714).abs() < 1e-9);

        let fallback = SearchQuery::derive("pizza", None, 10);
        assert!((fallback.location.latitude - DEFAULT_LOCATION.latitude).abs() < 1e-9);
        assert_eq!(fallback.food_type, "pizza");
        assert_eq!(fallback.limit, 10);
    }
}
