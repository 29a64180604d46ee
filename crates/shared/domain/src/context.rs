use crate::constants::ANONYMOUS_USER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed user attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AttributeValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAttributes {
    pub groups: Vec<String>,
    pub values: BTreeMap<String, AttributeValue>,
}

impl UserAttributes {
    #[must_use]
    pub fn in_any_group(&self, groups: &[String]) -> bool {
        self.groups.iter().any(|g| groups.contains(g))
    }
}

/// Per-call input to flag evaluation. Never persisted by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationContext {
    pub user_id: Option<String>,
    pub user_attributes: UserAttributes,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub location: Option<String>,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl EvaluationContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), ..Self::default() }
    }

    /// The id used for rollout bucketing.
    #[must_use]
    pub fn bucket_key(&self) -> &str {
        self.user_id.as_deref().unwrap_or(ANONYMOUS_USER)
    }

    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_attributes.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.user_attributes.values.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_device(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    #[must_use]
    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = Some(browser.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub const fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_contexts_bucket_as_anonymous() {
        assert_eq!(EvaluationContext::anonymous().bucket_key(), "anonymous");
        assert_eq!(EvaluationContext::for_user("u1").bucket_key(), "u1");
    }

    #[test]
    fn attribute_values_are_untagged() {
        let ctx = EvaluationContext::for_user("u1")
            .with_attribute("plan", "pro")
            .with_attribute("seats", 12_i64)
            .with_attribute("trial", false);
        let json = serde_json::to_value(&ctx.user_attributes.values).unwrap();
        assert_eq!(json, serde_json::json!({ "plan": "pro", "seats": 12.0, "trial": false }));
    }

    #[test]
    fn group_membership() {
        let ctx = EvaluationContext::for_user("u1").with_groups(["beta_testers"]);
        assert!(ctx.user_attributes.in_any_group(&["beta_testers".to_owned()]));
        assert!(!ctx.user_attributes.in_any_group(&["staff".to_owned()]));
    }
}
