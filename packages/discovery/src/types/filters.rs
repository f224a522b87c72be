use serde::{Deserialize, Serialize};

/// Caller-supplied discovery filters
///
/// Immutable value: every `with_*` / `without_*` call returns a new filter set,
/// so a session's filters can be merged with the current radius without
/// touching the caller's copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type_id: Option<String>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_distance_km(&self, km: u32) -> Self {
        Self {
            max_distance_km: Some(km),
            ..self.clone()
        }
    }

    pub fn with_age_range(&self, min_age: Option<u32>, max_age: Option<u32>) -> Self {
        Self {
            min_age,
            max_age,
            ..self.clone()
        }
    }

    pub fn with_event_type(&self, event_type_id: impl Into<String>) -> Self {
        Self {
            event_type_id: Some(event_type_id.into()),
            ..self.clone()
        }
    }

    pub fn without_event_type(&self) -> Self {
        Self {
            event_type_id: None,
            ..self.clone()
        }
    }

    /// Whether an age satisfies the inclusive age range.
    ///
    /// Users without a known age only match when no age bound is set.
    pub fn matches_age(&self, age: Option<u32>) -> bool {
        match (self.min_age, self.max_age, age) {
            (None, None, _) => true,
            (_, _, None) => false,
            (min, max, Some(age)) => {
                min.map_or(true, |min| age >= min) && max.map_or(true, |max| age <= max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_does_not_mutate_original() {
        let base = SearchFilters::new().with_event_type("birthday");
        let merged = base.with_max_distance_km(150);

        assert_eq!(base.max_distance_km, None);
        assert_eq!(merged.max_distance_km, Some(150));
        assert_eq!(merged.event_type_id.as_deref(), Some("birthday"));
        assert_eq!(merged.without_event_type().event_type_id, None);
    }

    #[test]
    fn test_matches_age() {
        let any = SearchFilters::new();
        assert!(any.matches_age(None));
        assert!(any.matches_age(Some(99)));

        let adults = SearchFilters::new().with_age_range(Some(18), Some(30));
        assert!(adults.matches_age(Some(18)));
        assert!(adults.matches_age(Some(30)));
        assert!(!adults.matches_age(Some(31)));
        assert!(!adults.matches_age(None));
    }

    #[test]
    fn test_wire_format() {
        let filters = SearchFilters::new()
            .with_max_distance_km(50)
            .with_event_type("condolence");
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"maxDistanceKm": 50, "eventTypeId": "condolence"})
        );
    }
}
