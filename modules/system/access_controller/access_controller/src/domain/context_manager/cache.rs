//! Per-subject context cache shared by the push and decision paths.

use std::collections::BTreeMap;

use access_controller_sdk::{ContextType, ContextValue, CtxSubject};
use dashmap::DashMap;

type Key = (CtxSubject, ContextType);

/// Concurrent map of cached [`ContextValue`]s keyed by (subject, type).
///
/// Each operation locks a single entry. Lookups of a value that already
/// carries the requested scopes take only the shard read lock. Readers get
/// clones, so a decision works on a snapshot that a concurrent push cannot
/// tear.
#[derive(Default)]
pub struct ContextCache {
    values: DashMap<Key, ContextValue>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the value for (subject, type), created with placeholders
    /// for `scopes` on first reference.
    pub fn get_or_placeholder(
        &self,
        subject: &CtxSubject,
        context_type: &ContextType,
        scopes: &[String],
    ) -> ContextValue {
        let key = (subject.clone(), context_type.clone());
        if let Some(value) = self.values.get(&key)
            && scopes.iter().all(|scope| value.values.contains_key(scope))
        {
            return value.value().clone();
        }

        let mut entry = self
            .values
            .entry(key)
            .or_insert_with(|| {
                ContextValue::placeholder(context_type.clone(), subject.clone(), scopes)
            });
        entry.ensure_scopes(scopes);
        entry.value().clone()
    }

    /// Merge pushed scopes into the value for (subject, type), creating it if absent.
    pub fn merge(
        &self,
        subject: &CtxSubject,
        context_type: &ContextType,
        scopes: BTreeMap<String, serde_json::Value>,
        resource_id: Option<String>,
    ) -> ContextValue {
        let mut entry = self
            .values
            .entry((subject.clone(), context_type.clone()))
            .or_insert_with(|| {
                ContextValue::placeholder(context_type.clone(), subject.clone(), std::iter::empty())
            });
        entry.merge(scopes, resource_id);
        entry.value().clone()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn scopes(items: &[(&str, &str)]) -> BTreeMap<String, serde_json::Value> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), json!(v)))
            .collect()
    }

    #[test]
    fn first_reference_creates_placeholder() {
        let cache = ContextCache::new();
        let subject = CtxSubject::new("alice");
        let posture = ContextType::new("device-posture");

        let value = cache.get_or_placeholder(&subject, &posture, &["risk".to_owned()]);
        assert!(!value.is_delivered());
        assert_eq!(cache.get_or_placeholder(&subject, &posture, &[]), value);
    }

    #[test]
    fn disjoint_merges_commute() {
        let subject = CtxSubject::new("alice");
        let posture = ContextType::new("device-posture");
        let first = scopes(&[("risk", "low")]);
        let second = scopes(&[("os", "linux")]);

        let a = ContextCache::new();
        a.merge(&subject, &posture, first.clone(), None);
        a.merge(&subject, &posture, second.clone(), None);

        let b = ContextCache::new();
        b.merge(&subject, &posture, second, None);
        b.merge(&subject, &posture, first, None);

        let a = a.get_or_placeholder(&subject, &posture, &[]);
        assert_eq!(a, b.get_or_placeholder(&subject, &posture, &[]));
        assert_eq!(a.get_str("risk"), Some("low"));
    }

    #[test]
    fn merge_keeps_scopes_missing_from_event() {
        let cache = ContextCache::new();
        let subject = CtxSubject::new("alice");
        let posture = ContextType::new("device-posture");

        cache.merge(&subject, &posture, scopes(&[("risk", "low"), ("os", "linux")]), None);
        let value = cache.merge(&subject, &posture, scopes(&[("risk", "high")]), None);

        assert_eq!(value.get_str("risk"), Some("high"));
        assert_eq!(value.get_str("os"), Some("linux"));
    }

    #[test]
    fn subjects_are_isolated() {
        let cache = ContextCache::new();
        let posture = ContextType::new("device-posture");
        cache.merge(&CtxSubject::new("alice"), &posture, scopes(&[("risk", "low")]), None);

        let bob = cache.get_or_placeholder(&CtxSubject::new("bob"), &posture, &["risk".to_owned()]);
        assert!(!bob.is_delivered());
    }

    #[test]
    fn new_scope_extends_cached_value() {
        let cache = ContextCache::new();
        let subject = CtxSubject::new("alice");
        let posture = ContextType::new("device-posture");
        cache.merge(&subject, &posture, scopes(&[("risk", "low")]), None);

        let value = cache.get_or_placeholder(&subject, &posture, &["os".to_owned()]);

        assert_eq!(value.get_str("risk"), Some("low"));
        assert!(value.values.contains_key("os"));
        assert_eq!(value.get("os"), None);
    }
}
