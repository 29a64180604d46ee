//! Typed targeting conditions.
//!
//! A condition is one of a closed set of kinds, each reading a single field of the
//! [`EvaluationContext`]. Operands are checked against their operator when a flag is
//! registered, so evaluation never sees an ill-formed condition.

use crate::error::FlagError;
use fstone_domain::version::compare_versions;
use fstone_domain::{AttributeValue, EvaluationContext};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Compares `user_attributes.values[attribute]`.
    UserAttribute { attribute: String, operator: Operator, value: AttributeValue },
    DeviceType { operator: Operator, value: AttributeValue },
    Browser { operator: Operator, value: AttributeValue },
    Location { operator: Operator, value: AttributeValue },
    /// Inclusive window over the context timestamp (Unix milliseconds); open ends allowed.
    TimeRange {
        #[serde(default)]
        start: Option<i64>,
        #[serde(default)]
        end: Option<i64>,
    },
}

impl Condition {
    pub fn attribute(
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self::UserAttribute { attribute: attribute.into(), operator, value: value.into() }
    }

    pub fn device(operator: Operator, value: impl Into<AttributeValue>) -> Self {
        Self::DeviceType { operator, value: value.into() }
    }

    pub fn browser(operator: Operator, value: impl Into<AttributeValue>) -> Self {
        Self::Browser { operator, value: value.into() }
    }

    pub fn location(operator: Operator, value: impl Into<AttributeValue>) -> Self {
        Self::Location { operator, value: value.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserAttribute { .. } => "user_attribute",
            Self::DeviceType { .. } => "device_type",
            Self::Browser { .. } => "browser",
            Self::Location { .. } => "location",
            Self::TimeRange { .. } => "time_range",
        }
    }

    #[must_use]
    pub const fn is_time_based(&self) -> bool {
        matches!(self, Self::TimeRange { .. })
    }

    /// Rejects operator/operand combinations that can never match.
    ///
    /// # Errors
    /// Returns [`FlagError::InvalidCondition`] describing the offending condition.
    pub fn validate(&self) -> Result<(), FlagError> {
        match self {
            Self::UserAttribute { attribute, .. } if attribute.trim().is_empty() => {
                Err(invalid("user_attribute condition needs an attribute name".to_owned()))
            },
            Self::UserAttribute { operator, value, .. }
            | Self::DeviceType { operator, value }
            | Self::Browser { operator, value }
            | Self::Location { operator, value } => check_operand(self.kind(), *operator, value),
            Self::TimeRange { start: None, end: None } => {
                Err(invalid("time_range needs a start or an end".to_owned()))
            },
            Self::TimeRange { start: Some(start), end: Some(end) } if start > end => {
                Err(invalid(format!("time_range start {start} is after end {end}")))
            },
            Self::TimeRange { .. } => Ok(()),
        }
    }

    /// Evaluates against `ctx`; `now` substitutes a missing (zero) context timestamp.
    #[must_use]
    pub fn matches(&self, ctx: &EvaluationContext, now: i64) -> bool {
        match self {
            Self::UserAttribute { attribute, operator, value } => {
                apply(ctx.user_attributes.values.get(attribute), *operator, value)
            },
            Self::DeviceType { operator, value } => text_field(ctx.device_type.as_deref(), *operator, value),
            Self::Browser { operator, value } => text_field(ctx.browser.as_deref(), *operator, value),
            Self::Location { operator, value } => text_field(ctx.location.as_deref(), *operator, value),
            Self::TimeRange { start, end } => {
                let at = if ctx.timestamp > 0 { ctx.timestamp } else { now };
                start.is_none_or(|s| at >= s) && end.is_none_or(|e| at <= e)
            },
        }
    }
}

fn invalid(message: String) -> FlagError {
    FlagError::InvalidCondition { message: message.into(), context: None }
}

fn check_operand(kind: &str, operator: Operator, value: &AttributeValue) -> Result<(), FlagError> {
    let fits = match operator {
        Operator::Equals | Operator::NotEquals => true,
        Operator::Contains => matches!(value, AttributeValue::Text(_)),
        Operator::GreaterThan | Operator::LessThan => {
            matches!(value, AttributeValue::Number(_) | AttributeValue::Text(_))
        },
        Operator::In | Operator::NotIn => matches!(value, AttributeValue::List(_)),
    };
    if fits { Ok(()) } else { Err(invalid(format!("{kind}: operator {operator} does not accept {value:?}"))) }
}

fn text_field(actual: Option<&str>, operator: Operator, expected: &AttributeValue) -> bool {
    let actual = actual.map(|s| AttributeValue::Text(s.to_owned()));
    apply(actual.as_ref(), operator, expected)
}

/// A missing value fails every operator except the negated ones.
fn apply(actual: Option<&AttributeValue>, operator: Operator, expected: &AttributeValue) -> bool {
    let Some(actual) = actual else {
        return matches!(operator, Operator::NotEquals | Operator::NotIn);
    };

    match operator {
        Operator::Equals => equals(actual, expected),
        Operator::NotEquals => !equals(actual, expected),
        Operator::Contains => contains(actual, expected),
        Operator::GreaterThan => ordering(actual, expected) == Some(Ordering::Greater),
        Operator::LessThan => ordering(actual, expected) == Some(Ordering::Less),
        Operator::In => member_of(actual, expected),
        Operator::NotIn => !member_of(actual, expected),
    }
}

fn equals(actual: &AttributeValue, expected: &AttributeValue) -> bool {
    match (actual, expected) {
        (AttributeValue::Text(a), AttributeValue::Text(e)) => a.eq_ignore_ascii_case(e),
        _ => actual == expected,
    }
}

fn contains(actual: &AttributeValue, expected: &AttributeValue) -> bool {
    let AttributeValue::Text(needle) = expected else {
        return false;
    };
    match actual {
        AttributeValue::Text(haystack) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        AttributeValue::List(items) => items.iter().any(|item| item.eq_ignore_ascii_case(needle)),
        _ => false,
    }
}

/// Numbers compare numerically, text compares as dotted versions.
fn ordering(actual: &AttributeValue, expected: &AttributeValue) -> Option<Ordering> {
    match (actual, expected) {
        (AttributeValue::Number(a), AttributeValue::Number(e)) => a.partial_cmp(e),
        (AttributeValue::Text(a), AttributeValue::Text(e)) => Some(compare_versions(a, e)),
        _ => None,
    }
}

fn member_of(actual: &AttributeValue, expected: &AttributeValue) -> bool {
    let AttributeValue::List(allowed) = expected else {
        return false;
    };
    match actual {
        AttributeValue::Text(value) => allowed.iter().any(|a| a.eq_ignore_ascii_case(value)),
        AttributeValue::List(values) => {
            values.iter().any(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v)))
        },
        AttributeValue::Bool(_) | AttributeValue::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> AttributeValue {
        AttributeValue::List(items.iter().map(|s| (*s).to_owned()).collect())
    }

    #[test]
    fn deserializes_tagged_conditions() {
        let condition: Condition = serde_json::from_value(serde_json::json!({
            "type": "user_attribute",
            "attribute": "plan",
            "operator": "in",
            "value": ["pro", "team"]
        }))
        .unwrap();
        assert_eq!(condition, Condition::attribute("plan", Operator::In, list(&["pro", "team"])));

        let unknown = serde_json::from_value::<Condition>(serde_json::json!({
            "type": "moon_phase",
            "operator": "equals",
            "value": "full"
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn validation_rejects_mismatched_operands() {
        assert!(Condition::device(Operator::In, "mobile").validate().is_err());
        assert!(Condition::device(Operator::In, list(&["mobile"])).validate().is_ok());
        assert!(Condition::attribute("", Operator::Equals, "x").validate().is_err());
        assert!(Condition::attribute("age", Operator::GreaterThan, true).validate().is_err());
        assert!(Condition::TimeRange { start: None, end: None }.validate().is_err());
        assert!(Condition::TimeRange { start: Some(10), end: Some(5) }.validate().is_err());
        assert!(Condition::TimeRange { start: Some(5), end: None }.validate().is_ok());
    }

    #[test]
    fn text_fields() {
        let ctx = EvaluationContext::for_user("u1")
            .with_device("Mobile")
            .with_browser("Firefox")
            .with_location("UA");

        assert!(Condition::device(Operator::Equals, "mobile").matches(&ctx, 0));
        assert!(Condition::browser(Operator::Contains, "fox").matches(&ctx, 0));
        assert!(Condition::location(Operator::NotIn, list(&["US", "CA"])).matches(&ctx, 0));
        assert!(!Condition::location(Operator::In, list(&["US", "CA"])).matches(&ctx, 0));
    }

    #[test]
    fn missing_fields_only_pass_negations() {
        let ctx = EvaluationContext::anonymous();
        assert!(!Condition::device(Operator::Equals, "desktop").matches(&ctx, 0));
        assert!(Condition::device(Operator::NotEquals, "desktop").matches(&ctx, 0));
        assert!(Condition::attribute("plan", Operator::NotIn, list(&["free"])).matches(&ctx, 0));
    }

    #[test]
    fn numeric_and_version_ordering() {
        let ctx = EvaluationContext::for_user("u1")
            .with_attribute("age", 30_i64)
            .with_attribute("app_version", "2.10.1")
            .with_attribute("roles", list(&["admin", "editor"]));

        assert!(Condition::attribute("age", Operator::GreaterThan, 18_i64).matches(&ctx, 0));
        assert!(!Condition::attribute("age", Operator::LessThan, 18_i64).matches(&ctx, 0));
        assert!(Condition::attribute("app_version", Operator::GreaterThan, "2.9").matches(&ctx, 0));
        assert!(!Condition::attribute("age", Operator::GreaterThan, "18").matches(&ctx, 0));
        assert!(Condition::attribute("roles", Operator::Contains, "admin").matches(&ctx, 0));
        assert!(Condition::attribute("roles", Operator::In, list(&["editor"])).matches(&ctx, 0));
    }

    #[test]
    fn time_windows_use_context_or_now() {
        let window = Condition::TimeRange { start: Some(1_000), end: Some(2_000) };
        assert!(window.matches(&EvaluationContext::anonymous().at(1_500), 0));
        assert!(!window.matches(&EvaluationContext::anonymous().at(2_001), 0));
        assert!(window.matches(&EvaluationContext::anonymous(), 2_000));
    }
}
