use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Who sees a feature once it is committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RolloutStrategy {
    /// Everyone, as soon as the feature is enabled.
    #[default]
    Immediate,
    /// A deterministic share of users, bucketed by user and feature id.
    Gradual {
        #[serde(default)]
        percentage: Option<f64>,
    },
    /// Members of at least one of the listed groups.
    Beta {
        #[serde(default)]
        user_groups: Vec<String>,
    },
    /// Never offered automatically; an operator enables it explicitly.
    Manual,
}

impl RolloutStrategy {
    #[must_use]
    pub const fn gradual(percentage: f64) -> Self {
        Self::Gradual { percentage: Some(percentage) }
    }

    pub fn beta<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Beta { user_groups: groups.into_iter().map(Into::into).collect() }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Gradual { .. } => "gradual",
            Self::Beta { .. } => "beta",
            Self::Manual => "manual",
        }
    }
}

/// A version constraint a feature places on a host component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRequirement {
    pub component: String,
    #[serde(default = "default_min_version")]
    pub min_version: String,
    #[serde(default)]
    pub max_version: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_min_version() -> String {
    "0".to_owned()
}

const fn default_required() -> bool {
    true
}

impl CompatibilityRequirement {
    /// A mandatory requirement with no upper bound.
    pub fn required(component: impl Into<String>, min_version: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            min_version: min_version.into(),
            max_version: None,
            required: true,
        }
    }

    /// An advisory requirement: failing it only produces a warning.
    pub fn optional(component: impl Into<String>, min_version: impl Into<String>) -> Self {
        Self { required: false, ..Self::required(component, min_version) }
    }

    #[must_use]
    pub fn up_to(mut self, max_version: impl Into<String>) -> Self {
        self.max_version = Some(max_version.into());
        self
    }
}

/// Qualitative cost bucket.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImpactLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// Budget weight: low = 1, medium = 2, high = 3.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceImpact {
    pub cpu: ImpactLevel,
    pub memory: ImpactLevel,
    pub network: ImpactLevel,
}

impl PerformanceImpact {
    #[must_use]
    pub const fn new(cpu: ImpactLevel, memory: ImpactLevel, network: ImpactLevel) -> Self {
        Self { cpu, memory, network }
    }
}

/// A named, versioned capability with dependencies and a rollout strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub compatibility_requirements: Vec<CompatibilityRequirement>,
    #[serde(default)]
    pub rollout_strategy: RolloutStrategy,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub beta: bool,
    #[serde(default)]
    pub performance_impact: PerformanceImpact,
}

fn default_version() -> String {
    "1.0.0".to_owned()
}

impl Feature {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: default_version(),
            dependencies: Vec::new(),
            compatibility_requirements: Vec::new(),
            rollout_strategy: RolloutStrategy::Immediate,
            enabled: false,
            beta: false,
            performance_impact: PerformanceImpact::default(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Adds a dependency edge; duplicates are ignored.
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    #[must_use]
    pub fn requires(mut self, requirement: CompatibilityRequirement) -> Self {
        self.compatibility_requirements.push(requirement);
        self
    }

    #[must_use]
    pub fn rollout(mut self, strategy: RolloutStrategy) -> Self {
        self.rollout_strategy = strategy;
        self
    }

    #[must_use]
    pub const fn beta(mut self) -> Self {
        self.beta = true;
        self
    }

    #[must_use]
    pub const fn impact(mut self, cpu: ImpactLevel, memory: ImpactLevel, network: ImpactLevel) -> Self {
        self.performance_impact = PerformanceImpact::new(cpu, memory, network);
        self
    }

    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn depends_on_id(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_deduplicates_dependencies() {
        let feature = Feature::new("advanced_search", "Advanced search")
            .depends_on("enhanced_navigation")
            .depends_on("enhanced_navigation");
        assert_eq!(feature.dependencies, vec!["enhanced_navigation"]);
        assert!(feature.depends_on_id("enhanced_navigation"));
    }

    #[test]
    fn strategy_is_internally_tagged() {
        let json = serde_json::to_value(RolloutStrategy::gradual(25.0)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "gradual", "percentage": 25.0 }));

        let beta: RolloutStrategy =
            serde_json::from_value(serde_json::json!({ "type": "beta" })).unwrap();
        assert_eq!(beta, RolloutStrategy::Beta { user_groups: Vec::new() });
    }

    #[test]
    fn feature_deserializes_with_defaults() {
        let feature: Feature =
            serde_json::from_value(serde_json::json!({ "id": "dark_mode", "unknown": 1 })).unwrap();
        assert_eq!(feature.version, "1.0.0");
        assert_eq!(feature.rollout_strategy, RolloutStrategy::Immediate);
        assert!(!feature.enabled);
        assert_eq!(feature.performance_impact.cpu, ImpactLevel::Low);
    }

    #[test]
    fn requirement_defaults_to_required() {
        let req: CompatibilityRequirement =
            serde_json::from_value(serde_json::json!({ "component": "webgl" })).unwrap();
        assert!(req.required);
        assert_eq!(req.min_version, "0");
        assert_eq!(CompatibilityRequirement::optional("touch", "1").up_to("2").max_version.as_deref(), Some("2"));
    }

    #[test]
    fn impact_weights() {
        assert_eq!(ImpactLevel::Low.weight() + ImpactLevel::High.weight(), 4);
        assert_eq!("medium".parse::<ImpactLevel>().unwrap(), ImpactLevel::Medium);
    }
}
