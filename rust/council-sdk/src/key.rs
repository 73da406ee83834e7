//! Cache keys for list and detail queries.

use crate::filter::{FilterValue, NormalizedFilters};
use std::fmt;

/// Identity of a cached query.
///
/// Detail ids are held in their wire form, so `42` and `"42"` address the
/// same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    List {
        resource: String,
        filters: NormalizedFilters,
    },
    Detail {
        resource: String,
        id: String,
    },
}

impl CacheKey {
    pub fn list(resource: impl Into<String>, filters: NormalizedFilters) -> Self {
        CacheKey::List {
            resource: resource.into(),
            filters,
        }
    }

    pub fn detail(resource: impl Into<String>, id: &FilterValue) -> Self {
        CacheKey::Detail {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            CacheKey::List { resource, .. } | CacheKey::Detail { resource, .. } => resource,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, CacheKey::List { .. })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::List { resource, filters } => write!(f, "{}[{}]", resource, filters),
            CacheKey::Detail { resource, id } => write!(f, "{}#{}", resource, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filters;
    use std::collections::HashSet;

    #[test]
    fn test_logically_equal_filters_share_a_key() {
        let plain = CacheKey::list("departments", Filters::new().normalize());
        let ghost = CacheKey::list(
            "departments",
            Filters::new().with("DepartmentId", None::<i64>).normalize(),
        );

        let mut keys = HashSet::new();
        keys.insert(plain.clone());
        keys.insert(ghost.clone());
        assert_eq!(plain, ghost);
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_detail_ids_compare_by_wire_form() {
        let numeric = CacheKey::detail("committees", &FilterValue::Integer(42));
        let text = CacheKey::detail("committees", &FilterValue::Text("42".to_string()));
        assert_eq!(numeric, text);
        assert_eq!(numeric.to_string(), "committees#42");
    }

    #[test]
    fn test_list_and_detail_never_collide() {
        let list = CacheKey::list("rooms", Filters::new().normalize());
        let detail = CacheKey::detail("rooms", &FilterValue::Integer(1));
        assert_ne!(list, detail);
        assert_eq!(list.resource(), detail.resource());
        assert!(list.is_list());
        assert!(!detail.is_list());
    }

    #[test]
    fn test_display_lists_filters_in_key_order() {
        let key = CacheKey::list(
            "meetings",
            Filters::new().with("Year", 2024).with("CouncilId", 3).normalize(),
        );
        assert_eq!(key.to_string(), "meetings[CouncilId=3&Year=2024]");
    }
}
