//! Filter sets for list queries.
//!
//! Callers build a [`Filters`] value freely, including keys they want
//! unset. [`Filters::normalize`] drops every absent, `null` or empty-string
//! entry and orders the rest by key, so the result is what goes on the wire
//! and what identifies the query in the cache.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A scalar filter or identifier value.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl FilterValue {
    /// `0`, `0.0`, `NaN`, `false` and `""`.
    pub fn is_falsy(&self) -> bool {
        match self {
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::Integer(n) => *n == 0,
            FilterValue::Float(f) => *f == 0.0 || f.is_nan(),
            FilterValue::Bool(b) => !b,
        }
    }

    /// Converts a JSON scalar. `null`, arrays and objects yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(FilterValue::Text(s.clone())),
            Value::Bool(b) => Some(FilterValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FilterValue::Integer)
                .or_else(|| n.as_f64().map(FilterValue::from_f64)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Finite floats with no fractional part become [`FilterValue::Integer`],
    /// matching how they are written on the wire.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value < i64::MAX as f64
        {
            FilterValue::Integer(value as i64)
        } else {
            FilterValue::Float(value)
        }
    }

    /// Parses a command-line style value: booleans, integers, floats, then text.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => return FilterValue::Bool(true),
            "false" => return FilterValue::Bool(false),
            _ => {}
        }
        if let Ok(n) = raw.parse::<i64>() {
            return FilterValue::Integer(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return FilterValue::from_f64(f);
            }
        }
        FilterValue::Text(raw.to_string())
    }

    fn is_empty_text(&self) -> bool {
        matches!(self, FilterValue::Text(s) if s.is_empty())
    }

    fn canonical(&self) -> Self {
        match self {
            FilterValue::Float(f) => FilterValue::from_f64(*f),
            other => other.clone(),
        }
    }
}

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FilterValue::Text(a), FilterValue::Text(b)) => a == b,
            (FilterValue::Integer(a), FilterValue::Integer(b)) => a == b,
            (FilterValue::Float(a), FilterValue::Float(b)) => a.to_bits() == b.to_bits(),
            (FilterValue::Bool(a), FilterValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FilterValue {}

impl Hash for FilterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FilterValue::Text(s) => s.hash(state),
            FilterValue::Integer(n) => n.hash(state),
            FilterValue::Float(f) => f.to_bits().hash(state),
            FilterValue::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => write!(f, "{}", s),
            FilterValue::Integer(n) => write!(f, "{}", n),
            FilterValue::Float(x) => write!(f, "{}", x),
            FilterValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Conversion into an optional [`FilterValue`]. `None` means "unset".
pub trait IntoFilterValue {
    fn into_filter_value(self) -> Option<FilterValue>;
}

impl IntoFilterValue for FilterValue {
    fn into_filter_value(self) -> Option<FilterValue> {
        Some(self)
    }
}

impl IntoFilterValue for &str {
    fn into_filter_value(self) -> Option<FilterValue> {
        Some(FilterValue::Text(self.to_string()))
    }
}

impl IntoFilterValue for String {
    fn into_filter_value(self) -> Option<FilterValue> {
        Some(FilterValue::Text(self))
    }
}

impl IntoFilterValue for &String {
    fn into_filter_value(self) -> Option<FilterValue> {
        Some(FilterValue::Text(self.clone()))
    }
}

impl IntoFilterValue for bool {
    fn into_filter_value(self) -> Option<FilterValue> {
        Some(FilterValue::Bool(self))
    }
}

impl IntoFilterValue for f64 {
    fn into_filter_value(self) -> Option<FilterValue> {
        Some(FilterValue::from_f64(self))
    }
}

impl IntoFilterValue for f32 {
    fn into_filter_value(self) -> Option<FilterValue> {
        Some(FilterValue::from_f64(f64::from(self)))
    }
}

macro_rules! impl_into_filter_value_lossless {
    ($($ty:ty),*) => {
        $(
            impl IntoFilterValue for $ty {
                fn into_filter_value(self) -> Option<FilterValue> {
                    Some(FilterValue::Integer(i64::from(self)))
                }
            }
        )*
    };
}

impl_into_filter_value_lossless!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_into_filter_value_wide {
    ($($ty:ty),*) => {
        $(
            impl IntoFilterValue for $ty {
                fn into_filter_value(self) -> Option<FilterValue> {
                    Some(
                        i64::try_from(self)
                            .map(FilterValue::Integer)
                            .unwrap_or_else(|_| FilterValue::Text(self.to_string())),
                    )
                }
            }
        )*
    };
}

impl_into_filter_value_wide!(u64, usize, isize);

impl IntoFilterValue for &Value {
    fn into_filter_value(self) -> Option<FilterValue> {
        FilterValue::from_json(self)
    }
}

impl IntoFilterValue for Value {
    fn into_filter_value(self) -> Option<FilterValue> {
        FilterValue::from_json(&self)
    }
}

impl<T: IntoFilterValue> IntoFilterValue for Option<T> {
    fn into_filter_value(self) -> Option<FilterValue> {
        self.and_then(IntoFilterValue::into_filter_value)
    }
}

/// Caller-side filter set. Keeps every assignment, including unsets, in
/// insertion order until [`normalize`](Filters::normalize) is called.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    entries: Vec<(String, Option<FilterValue>)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl IntoFilterValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl IntoFilterValue) {
        self.entries.push((key.into(), value.into_filter_value()));
    }

    /// Reads the top-level members of a JSON object. Anything else is empty.
    pub fn from_json(value: &Value) -> Self {
        let entries = value
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.clone(), FilterValue::from_json(v)))
                    .collect()
            })
            .unwrap_or_default();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Later assignments win; assigning an absent or empty value removes
    /// the key entirely.
    pub fn normalize(&self) -> NormalizedFilters {
        let mut normalized = BTreeMap::new();
        for (key, value) in &self.entries {
            match value {
                Some(v) if !v.is_empty_text() => {
                    normalized.insert(key.clone(), v.canonical());
                }
                _ => {
                    normalized.remove(key);
                }
            }
        }
        NormalizedFilters(normalized)
    }
}

impl<K, V> FromIterator<(K, V)> for Filters
where
    K: Into<String>,
    V: IntoFilterValue,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.insert(k, v);
        }
        filters
    }
}

/// Filters with unset entries removed, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedFilters(BTreeMap<String, FilterValue>);

impl NormalizedFilters {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    /// Query-string pairs in key order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl fmt::Display for NormalizedFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, "&")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}
