use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::error::AssistantError;

/// One concrete service behind a domain handler (a delivery platform, a
/// ride-sharing platform).
pub struct ProviderEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    available: AtomicBool,
}

impl ProviderEntry {
    #[must_use]
    pub fn new(id: &'static str, name: &'static str, keywords: &'static [&'static str]) -> Self {
        Self {
            id,
            name,
            keywords,
            available: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn unavailable(
        id: &'static str,
        name: &'static str,
        keywords: &'static [&'static str],
    ) -> Self {
        let entry = Self::new(id, name, keywords);
        entry.available.store(false, Ordering::Relaxed);
        entry
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    pub fn set_available(&self, value: bool) {
        self.available.store(value, Ordering::Relaxed);
    }

    #[must_use]
    pub fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id,
            name: self.name,
            keywords: self.keywords,
            available: self.is_available(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub available: bool,
}

#[derive(Debug, Clone, Error)]
pub enum ProviderSelectionError {
    /// The chosen provider exists but is switched off; never silently
    /// succeed with a broken provider.
    #[error("provider '{requested}' is unavailable; available: {available:?}")]
    Unavailable {
        requested: String,
        available: Vec<&'static str>,
    },
    #[error("provider '{requested}' is not registered; available: {available:?}")]
    NotFound {
        requested: String,
        available: Vec<&'static str>,
    },
}

impl From<ProviderSelectionError> for AssistantError {
    fn from(error: ProviderSelectionError) -> Self {
        match error {
            ProviderSelectionError::Unavailable { .. } => {
                AssistantError::UpstreamUnavailable(error.to_string())
            }
            ProviderSelectionError::NotFound {
                requested,
                available,
            } => AssistantError::ProviderNotFound {
                requested,
                available,
            },
        }
    }
}

/// Providers for one domain, with a configured default. Selection rules:
/// a known, available explicit preference wins; anything else falls back to
/// the default; an unavailable default is reported, never papered over.
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
    default_id: &'static str,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(entries: Vec<ProviderEntry>, default_id: &'static str) -> Self {
        Self {
            entries,
            default_id,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    #[must_use]
    pub fn available_ids(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|entry| entry.is_available())
            .map(|entry| entry.id)
            .collect()
    }

    pub fn select(&self, explicit: Option<&str>) -> Result<&ProviderEntry, ProviderSelectionError> {
        if let Some(requested) = explicit {
            if let Some(entry) = self.entries.iter().find(|entry| entry.id == requested) {
                if entry.is_available() {
                    return Ok(entry);
                }
            }
            // Unknown or unavailable preference falls through to the default.
        }

        let default = self
            .entries
            .iter()
            .find(|entry| entry.id == self.default_id)
            .ok_or_else(|| ProviderSelectionError::NotFound {
                requested: self.default_id.to_string(),
                available: self.available_ids(),
            })?;
        if !default.is_available() {
            return Err(ProviderSelectionError::Unavailable {
                requested: self.default_id.to_string(),
                available: self.available_ids(),
            });
        }
        Ok(default)
    }

    /// Strict lookup for explicit per-provider operations; unknown ids get
    /// a typed failure naming the alternatives.
    pub fn get(&self, id: &str) -> Result<&ProviderEntry, ProviderSelectionError> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ProviderSelectionError::NotFound {
                requested: id.to_string(),
                available: self.available_ids(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(
            vec![
                ProviderEntry::new("ifood", "iFood", &["ifood", "comida"]),
                ProviderEntry::unavailable("rappi", "Rappi", &["rappi"]),
            ],
            "ifood",
        )
    }

    #[test]
    fn explicit_available_preference_wins() {
        let registry = registry();
        assert_eq!(registry.select(Some("ifood")).unwrap().id, "ifood");
    }

    #[test]
    fn unknown_preference_falls_back_to_default() {
        let registry = registry();
        assert_eq!(registry.select(Some("99food")).unwrap().id, "ifood");
    }

    #[test]
    fn unavailable_preference_falls_back_to_default() {
        let registry = registry();
        assert_eq!(registry.select(Some("rappi")).unwrap().id, "ifood");
    }

    #[test]
    fn unavailable_default_is_reported_not_masked() {
        let registry = registry();
        registry.get("ifood").unwrap().set_available(false);
        let error = registry.select(None).err().expect("selection should fail");
        match error {
            ProviderSelectionError::Unavailable {
                requested,
                available,
            } => {
                assert_eq!(requested, "ifood");
                assert!(available.is_empty());
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn selection_errors_map_into_the_taxonomy() {
        let not_found: AssistantError = ProviderSelectionError::NotFound {
            requested: "glovo".to_string(),
            available: vec!["ifood"],
        }
        .into();
        assert!(matches!(
            not_found,
            AssistantError::ProviderNotFound { .. }
        ));

        let unavailable: AssistantError = ProviderSelectionError::Unavailable {
            requested: "ifood".to_string(),
            available: vec![],
        }
        .into();
        assert!(matches!(unavailable, AssistantError::UpstreamUnavailable(_)));
    }

    #[test]
    fn strict_lookup_lists_alternatives() {
        let registry = registry();
        let error = registry.get("glovo").err().expect("lookup should fail");
        match error {
            ProviderSelectionError::NotFound {
                requested,
                available,
            } => {
                assert_eq!(requested, "glovo");
                assert_eq!(available, vec!["ifood"]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
