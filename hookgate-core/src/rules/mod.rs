//! Declarative request matching.
//!
//! Rules are loaded in two phases: rule files deserialize into plain
//! `*Config` records, then a single validation pass resolves them into
//! immutable [`Rule`]s. Matching only ever sees resolved values.
//!
//! - [`Comparator`] compares one extracted [`PropertyValue`] with a [`Target`]
//! - [`Trigger`] binds a [`Property`], a comparator and a target
//! - [`TriggerSet`] combines triggers with `and`/`or`
//! - [`Rule`] binds a trigger set to an [`Action`]

mod comparator;
mod property;
mod rule;
mod trigger;
mod trigger_set;

pub use comparator::{Comparator, Target};
pub use property::{MultiMap, Property, PropertyValue};
pub use rule::{
    Action, ActionConfig, DeliveryMode, Rule, RuleConfig, resolve_rules, select_rule,
};
pub use trigger::{Trigger, TriggerConfig};
pub use trigger_set::{Evaluation, Operator, TriggerSet, TriggerSetConfig};
