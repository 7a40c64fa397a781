//! Single-property triggers.

use serde::{Deserialize, Serialize};

use super::comparator::{Comparator, Target};
use super::property::Property;
use crate::error::{Result, ValidationError};
use crate::request::InboundRequest;

/// Trigger as written in a rule file, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Property to extract.
    pub property: Property,
    /// How to compare.
    pub comparator: Comparator,
    /// What to compare with.
    #[serde(default)]
    pub value: Target,
}

/// A validated predicate over one request property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    name: String,
    property: Property,
    comparator: Comparator,
    target: Target,
}

impl Trigger {
    /// Validates and builds a trigger.
    ///
    /// Path, host and method need a non-empty target value. Header and query
    /// need a non-empty key and value and only accept `contains` or
    /// `not_contains`. Header keys are matched case-insensitively.
    ///
    /// # Example
    ///
    /// ```
    /// use hookgate_core::rules::{Comparator, Property, Target, Trigger};
    ///
    /// let ok = Trigger::new("gh", Property::Header, Comparator::Contains,
    ///     Target::keyed("X-GitHub-Event", "push"));
    /// assert!(ok.is_ok());
    ///
    /// let bad = Trigger::new("gh", Property::Header, Comparator::Equal,
    ///     Target::keyed("X-GitHub-Event", "push"));
    /// assert!(bad.is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        property: Property,
        comparator: Comparator,
        mut target: Target,
    ) -> std::result::Result<Self, ValidationError> {
        match property {
            Property::Path | Property::Host | Property::Method => {
                if target.value.is_empty() {
                    return Err(ValidationError::EmptyRuleValue);
                }
            }
            Property::Header | Property::Query => {
                let key_missing = target.key.as_deref().is_none_or(str::is_empty);
                if key_missing || target.value.is_empty() {
                    return Err(ValidationError::EmptyRuleValue);
                }
                if !comparator.supports_multimap() {
                    return Err(ValidationError::UnsupportedComparatorForProperty {
                        comparator: comparator.as_str().to_string(),
                        property: property.as_str().to_string(),
                    });
                }
            }
            Property::Body => {}
        }

        if property == Property::Header {
            target.key = target.key.map(|k| k.to_ascii_lowercase());
        }

        Ok(Self {
            name: name.into(),
            property,
            comparator,
            target,
        })
    }

    /// Evaluates the trigger against `req`.
    ///
    /// # Errors
    ///
    /// Propagates comparator shape errors, for example on a `body` trigger.
    pub fn matches(&self, req: &InboundRequest) -> Result<bool> {
        let value = self.property.extract(req);
        self.comparator.compare(&self.target, value.as_ref())
    }

    /// Trigger name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inspected property.
    pub fn property(&self) -> Property {
        self.property
    }

    /// Bound comparator.
    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    /// Comparison target.
    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl TryFrom<TriggerConfig> for Trigger {
    type Error = ValidationError;

    fn try_from(config: TriggerConfig) -> std::result::Result<Self, Self::Error> {
        Self::new(config.name, config.property, config.comparator, config.value)
    }
}
