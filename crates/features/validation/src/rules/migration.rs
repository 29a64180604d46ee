use crate::error::ValidationError;
use crate::rule::{RuleMetadata, ValidationRule};
use fstone_domain::{MigrationState, SystemSnapshot, ValidationIssue};

#[fstone_derive::validation_rule(
    id = "migration-completion",
    category = "migration",
    severity = "error",
    description = "Enabled features have completed their data migrations"
)]
#[derive(Debug, Default)]
pub struct MigrationCompletionRule;

impl ValidationRule for MigrationCompletionRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        Ok(snapshot
            .migration_required
            .iter()
            .filter(|id| snapshot.is_enabled(id))
            .filter_map(|id| {
                let state = snapshot.migrations.get(id).copied();
                (state != Some(MigrationState::Completed)).then(|| {
                    let state = state.map_or_else(|| "never run".to_owned(), |s| s.to_string());
                    self.issue(format!("{id} is enabled but its migrations are {state}"))
                        .with_features([id.as_str()])
                        .with_suggestion(format!("Re-run the migrations of {id} or disable it"))
                })
            })
            .collect())
    }
}
