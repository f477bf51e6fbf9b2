//! # Drift and Late-Initialization Primitives
//!
//! Desired parameters are sparse trees of optional values. An unset desired
//! value never overrides what the provider reports, so every comparison and
//! copy between desired and observed state goes through these helpers.

use std::collections::BTreeSet;

/// Unset desired values match anything; set values must be equal
pub fn optional_matches<T: PartialEq>(desired: &Option<T>, observed: &Option<T>) -> bool {
    match desired {
        None => true,
        Some(value) => observed.as_ref() == Some(value),
    }
}

/// Order-independent set equality
pub fn set_matches<T: Ord>(desired: &[T], observed: &[T]) -> bool {
    desired.iter().collect::<BTreeSet<_>>() == observed.iter().collect::<BTreeSet<_>>()
}

/// Copy an observed value into an unset field; returns whether it changed
pub fn late_init<T: Clone>(field: &mut Option<T>, observed: Option<&T>) -> bool {
    match (field.as_ref(), observed) {
        (None, Some(value)) => {
            *field = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Fill unset fields from another value of the same type
///
/// Used to merge `initProvider` into `forProvider` for the create call.
pub trait FillUnset {
    fn fill_unset(&mut self, from: &Self);
}

pub fn fill_option<T: Clone>(field: &mut Option<T>, from: &Option<T>) {
    if field.is_none() {
        field.clone_from(from);
    }
}

pub fn fill_string(field: &mut String, from: &str) {
    if field.is_empty() {
        from.clone_into(field);
    }
}

pub fn fill_vec<T: Clone>(field: &mut Vec<T>, from: &[T]) {
    if field.is_empty() {
        *field = from.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_matches() {
        assert!(optional_matches::<i64>(&None, &None));
        assert!(optional_matches(&None, &Some(10)));
        assert!(optional_matches(&Some(10), &Some(10)));
        assert!(!optional_matches(&Some(10), &Some(20)));
        assert!(!optional_matches(&Some(10), &None));
    }

    #[test]
    fn test_set_matches_ignores_order() {
        assert!(set_matches(&["a", "b"], &["b", "a"]));
        assert!(!set_matches(&["a"], &["a", "b"]));
        assert!(set_matches::<&str>(&[], &[]));
    }

    #[test]
    fn test_late_init_never_overwrites() {
        let mut unset: Option<bool> = None;
        assert!(late_init(&mut unset, Some(&true)));
        assert_eq!(unset, Some(true));

        let mut set = Some(false);
        assert!(!late_init(&mut set, Some(&true)));
        assert_eq!(set, Some(false));

        let mut nothing_observed: Option<bool> = None;
        assert!(!late_init(&mut nothing_observed, None));
    }

    #[test]
    fn test_fill_helpers_only_touch_unset_fields() {
        let mut name = String::new();
        fill_string(&mut name, "from-init");
        assert_eq!(name, "from-init");
        fill_string(&mut name, "other");
        assert_eq!(name, "from-init");

        let mut limit = Some(1);
        fill_option(&mut limit, &Some(2));
        assert_eq!(limit, Some(1));

        let mut orgs: Vec<String> = Vec::new();
        fill_vec(&mut orgs, &["o1".to_string()]);
        assert_eq!(orgs, vec!["o1".to_string()]);
    }
}
