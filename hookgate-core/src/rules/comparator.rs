//! Comparators applied to extracted property values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::property::PropertyValue;
use crate::error::{HookGateError, Result};

/// The value a trigger compares against.
///
/// `key` selects the list inside a header or query multimap and is ignored
/// for scalar properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Multimap key (header name or query parameter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Value to compare with.
    #[serde(default)]
    pub value: String,
}

impl Target {
    /// Target for a scalar property.
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }

    /// Target for a multimap property.
    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    fn key_str(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }
}

/// How an extracted value is tested against a [`Target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Scalar equals `target.value`.
    Equal,
    /// Scalar differs from `target.value`.
    NotEqual,
    /// Scalar contains `target.value`, or the multimap list at `target.key`
    /// holds an entry equal to `target.value`.
    Contains,
    /// `target.value` does not contain the scalar, or the multimap list at
    /// `target.key` holds no entry equal to `target.value`.
    NotContains,
}

impl Comparator {
    /// Returns the configuration tag for this comparator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
        }
    }

    /// Returns `true` if the comparator is defined on multimaps.
    pub fn supports_multimap(&self) -> bool {
        matches!(self, Self::Contains | Self::NotContains)
    }

    /// Compares `value` with `target`.
    ///
    /// # Errors
    ///
    /// Returns [`HookGateError::UnsupportedComparator`] when `value` has a
    /// shape this comparator does not handle, including a missing value.
    ///
    /// # Example
    ///
    /// ```
    /// use hookgate_core::rules::{Comparator, PropertyValue, Target};
    ///
    /// let value = PropertyValue::Scalar("/hooks/github".into());
    /// let matched = Comparator::Contains
    ///     .compare(&Target::value("github"), Some(&value))
    ///     .unwrap();
    /// assert!(matched);
    /// ```
    pub fn compare(&self, target: &Target, value: Option<&PropertyValue>) -> Result<bool> {
        match (self, value) {
            (Self::Equal, Some(PropertyValue::Scalar(v))) => Ok(*v == target.value),
            (Self::NotEqual, Some(PropertyValue::Scalar(v))) => Ok(*v != target.value),
            (Self::Contains, Some(PropertyValue::Scalar(v))) => Ok(v.contains(&target.value)),
            // Operands are reversed relative to `Contains`.
            (Self::NotContains, Some(PropertyValue::Scalar(v))) => {
                Ok(!target.value.contains(v.as_str()))
            }
            (Self::Contains, Some(PropertyValue::MultiMap(map))) => {
                Ok(list_contains(map.get(target.key_str()), &target.value))
            }
            (Self::NotContains, Some(PropertyValue::MultiMap(map))) => {
                Ok(!list_contains(map.get(target.key_str()), &target.value))
            }
            (_, other) => Err(HookGateError::UnsupportedComparator {
                comparator: self.as_str(),
                shape: other.map_or("nil", PropertyValue::shape),
            }),
        }
    }
}

fn list_contains(list: Option<&Vec<String>>, wanted: &str) -> bool {
    list.is_some_and(|values| values.iter().any(|v| v == wanted))
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MultiMap;

    fn scalar(v: &str) -> PropertyValue {
        PropertyValue::Scalar(v.to_string())
    }

    fn headers() -> PropertyValue {
        let mut map = MultiMap::new();
        map.insert("HeaderKey".into(), vec!["HeaderValue".into()]);
        PropertyValue::MultiMap(map)
    }

    // ===========================================
    // equal / not_equal tests
    // ===========================================

    #[test]
    fn test_equal_scalar() {
        let target = Target::value("/x");
        assert!(Comparator::Equal.compare(&target, Some(&scalar("/x"))).unwrap());
        assert!(!Comparator::Equal.compare(&target, Some(&scalar("/y"))).unwrap());
    }

    #[test]
    fn test_not_equal_scalar() {
        let target = Target::value("GET");
        assert!(!Comparator::NotEqual.compare(&target, Some(&scalar("GET"))).unwrap());
        assert!(Comparator::NotEqual.compare(&target, Some(&scalar("POST"))).unwrap());
    }

    #[test]
    fn test_equal_rejects_multimap() {
        let target = Target::keyed("HeaderKey", "HeaderValue");
        let err = Comparator::Equal.compare(&target, Some(&headers())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported comparator equal for value of type multimap"
        );
        assert!(Comparator::NotEqual.compare(&target, Some(&headers())).is_err());
    }

    // ===========================================
    // contains / not_contains tests
    // ===========================================

    #[test]
    fn test_contains_scalar_substring() {
        let target = Target::value("github");
        assert!(
            Comparator::Contains
                .compare(&target, Some(&scalar("/hooks/github/push")))
                .unwrap()
        );
        assert!(!Comparator::Contains.compare(&target, Some(&scalar("/hooks"))).unwrap());
    }

    #[test]
    fn test_not_contains_scalar_operands_reversed() {
        // Checks whether the target contains the value, not the other way round.
        let target = Target::value("/hooks/github");
        assert!(!Comparator::NotContains.compare(&target, Some(&scalar("github"))).unwrap());
        assert!(!Comparator::NotContains.compare(&target, Some(&scalar("/hooks/github"))).unwrap());
        assert!(Comparator::NotContains.compare(&target, Some(&scalar("gitlab"))).unwrap());

        // A value that contains the target is still "not contained" by it.
        let target = Target::value("github");
        assert!(
            Comparator::NotContains
                .compare(&target, Some(&scalar("/hooks/github")))
                .unwrap()
        );
    }

    #[test]
    fn test_contains_multimap() {
        let target = Target::keyed("HeaderKey", "HeaderValue");
        assert!(Comparator::Contains.compare(&target, Some(&headers())).unwrap());
        assert!(!Comparator::NotContains.compare(&target, Some(&headers())).unwrap());
    }

    #[test]
    fn test_contains_multimap_exact_element_only() {
        let target = Target::keyed("HeaderKey", "Header");
        assert!(!Comparator::Contains.compare(&target, Some(&headers())).unwrap());
        assert!(Comparator::NotContains.compare(&target, Some(&headers())).unwrap());
    }

    #[test]
    fn test_contains_multimap_missing_key() {
        let target = Target::keyed("Other", "HeaderValue");
        assert!(!Comparator::Contains.compare(&target, Some(&headers())).unwrap());
        assert!(Comparator::NotContains.compare(&target, Some(&headers())).unwrap());
    }

    #[test]
    fn test_missing_value_is_error() {
        let target = Target::value("x");
        for comparator in [
            Comparator::Equal,
            Comparator::NotEqual,
            Comparator::Contains,
            Comparator::NotContains,
        ] {
            let err = comparator.compare(&target, None).unwrap_err();
            assert!(matches!(
                err,
                HookGateError::UnsupportedComparator { shape: "nil", .. }
            ));
        }
    }

    #[test]
    fn test_comparator_tags() {
        let parsed: Comparator = serde_json::from_str("\"not_contains\"").unwrap();
        assert_eq!(parsed, Comparator::NotContains);
        assert_eq!(parsed.to_string(), "not_contains");
        assert!(serde_json::from_str::<Comparator>("\"regex\"").is_err());
    }
}
