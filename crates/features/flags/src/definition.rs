use crate::condition::Condition;
use crate::error::FlagError;
use fstone_domain::RolloutStrategy;
use serde::{Deserialize, Serialize};

/// Targeting options supplied when a flag is registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagOptions {
    pub rollout_percentage: Option<f64>,
    pub user_groups: Vec<String>,
    pub conditions: Vec<Condition>,
    pub description: String,
}

impl FlagOptions {
    /// Options mirroring a feature's rollout strategy: gradual → percentage, beta → groups.
    #[must_use]
    pub fn from_strategy(strategy: &RolloutStrategy) -> Self {
        match strategy {
            RolloutStrategy::Gradual { percentage } => {
                Self { rollout_percentage: Some(percentage.unwrap_or(0.0)), ..Self::default() }
            },
            RolloutStrategy::Beta { user_groups } => {
                Self { user_groups: user_groups.clone(), ..Self::default() }
            },
            RolloutStrategy::Immediate | RolloutStrategy::Manual => Self::default(),
        }
    }

    #[must_use]
    pub const fn percentage(mut self, percentage: f64) -> Self {
        self.rollout_percentage = Some(percentage);
        self
    }

    #[must_use]
    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// A stored flag: the committed switch plus its targeting rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagDefinition {
    pub id: String,
    pub enabled: bool,
    pub rollout_percentage: Option<f64>,
    pub user_groups: Vec<String>,
    pub conditions: Vec<Condition>,
    pub description: String,
    /// Unix milliseconds of the last change.
    pub updated_at: i64,
}

impl FlagDefinition {
    pub fn new(id: impl Into<String>, enabled: bool, options: FlagOptions) -> Self {
        Self {
            id: id.into(),
            enabled,
            rollout_percentage: options.rollout_percentage,
            user_groups: options.user_groups,
            conditions: options.conditions,
            description: options.description,
            updated_at: 0,
        }
    }

    /// # Errors
    /// [`FlagError::Internal`] for an empty id, [`FlagError::InvalidPercentage`] for a
    /// percentage outside `0..=100`, [`FlagError::InvalidCondition`] for a malformed condition.
    pub fn validate(&self) -> Result<(), FlagError> {
        if self.id.trim().is_empty() {
            return Err(FlagError::from("flag id must not be empty"));
        }

        if let Some(p) = self.rollout_percentage
            && !(0.0..=100.0).contains(&p)
        {
            return Err(FlagError::InvalidPercentage {
                message: format!("{}: {p}", self.id).into(),
                context: None,
            });
        }

        for (index, condition) in self.conditions.iter().enumerate() {
            condition.validate().map_err(|err| match err {
                FlagError::InvalidCondition { message, .. } => FlagError::InvalidCondition {
                    message: format!("{} condition #{index}: {message}", self.id).into(),
                    context: None,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_time_based(&self) -> bool {
        self.conditions.iter().any(Condition::is_time_based)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;

    #[test]
    fn options_follow_strategy() {
        let gradual = FlagOptions::from_strategy(&RolloutStrategy::gradual(25.0));
        assert_eq!(gradual.rollout_percentage, Some(25.0));

        let beta = FlagOptions::from_strategy(&RolloutStrategy::beta(["beta_testers"]));
        assert_eq!(beta.user_groups, vec!["beta_testers"]);

        assert_eq!(FlagOptions::from_strategy(&RolloutStrategy::Manual), FlagOptions::default());
    }

    #[test]
    fn percentage_bounds() {
        let ok = FlagDefinition::new("f", true, FlagOptions::default().percentage(100.0));
        assert!(ok.validate().is_ok());

        let too_high = FlagDefinition::new("f", true, FlagOptions::default().percentage(101.0));
        assert!(matches!(too_high.validate(), Err(FlagError::InvalidPercentage { .. })));

        let nan = FlagDefinition::new("f", true, FlagOptions::default().percentage(f64::NAN));
        assert!(nan.validate().is_err());
    }

    #[test]
    fn condition_errors_name_the_index() {
        let def = FlagDefinition::new(
            "f",
            true,
            FlagOptions::default()
                .condition(Condition::device(Operator::Equals, "mobile"))
                .condition(Condition::device(Operator::In, "mobile")),
        );
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("#1"), "{err}");
    }

    #[test]
    fn tolerant_deserialization() {
        let def: FlagDefinition = serde_json::from_value(serde_json::json!({
            "id": "dark_mode",
            "enabled": true,
            "owner": "ui-team"
        }))
        .unwrap();
        assert!(def.enabled);
        assert!(def.conditions.is_empty());
        assert_eq!(def.rollout_percentage, None);
    }
}
