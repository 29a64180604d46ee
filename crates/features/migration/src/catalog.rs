//! Migrations shipped with the built-in feature catalog.

use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::task::{MigrationTask, TaskSpec};
use async_trait::async_trait;
use fstone_domain::constants::{ACCESSIBILITY, DARK_MODE, PERSONALIZED_DASHBOARD};
use fstone_domain::{MigrationPriority, MigrationResult};
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const DARK_MODE_COLOR_SCHEME: &str = "dark-mode-color-scheme";
pub const DASHBOARD_LAYOUT_V2: &str = "dashboard-layout-v2";
pub const DASHBOARD_WIDGET_PREFERENCES: &str = "dashboard-widget-preferences";
pub const ACCESSIBILITY_FONT_SCALING: &str = "accessibility-font-scaling";

const DASHBOARD: &str = "dashboard";
const DASHBOARD_BACKUP: &str = "dashboard_v1";
const DASHBOARD_COLUMNS: usize = 2;

/// Every built-in task, ready for [`crate::MigrationOrchestrator::register_task`].
#[must_use]
pub fn builtin_tasks() -> Vec<Arc<dyn MigrationTask>> {
    vec![
        Arc::new(ColorSchemeMigration::default()),
        Arc::new(DashboardLayoutMigration::default()),
        Arc::new(WidgetPreferencesMigration::default()),
        Arc::new(FontScalingMigration::default()),
    ]
}

/// `preferences.theme` becomes `preferences.color_scheme`, keeping `legacy_theme`.
#[derive(Debug)]
pub struct ColorSchemeMigration {
    spec: TaskSpec,
}

impl Default for ColorSchemeMigration {
    fn default() -> Self {
        Self {
            spec: TaskSpec::new(DARK_MODE_COLOR_SCHEME, DARK_MODE)
                .describe("Move the theme preference to a color scheme")
                .priority(MigrationPriority::High)
                .reversible(),
        }
    }
}

#[async_trait]
impl MigrationTask for ColorSchemeMigration {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn execute(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        let prefs = &mut ctx.snapshot.preferences;
        let done = MigrationResult::success(&self.spec.id, "Color scheme migrated");
        if prefs.contains_key("color_scheme") {
            return Ok(done.with_change("color_scheme already present"));
        }

        let Some(theme) = prefs.remove("theme") else {
            prefs.insert("color_scheme".to_owned(), json!("auto"));
            return Ok(done.with_change("color_scheme defaulted to auto"));
        };
        let scheme = match theme.as_str() {
            Some("dark") => "dark",
            Some("light") => "light",
            _ => "auto",
        };
        prefs.insert("color_scheme".to_owned(), json!(scheme));
        prefs.insert("legacy_theme".to_owned(), theme);
        Ok(done.with_change(format!("theme -> color_scheme={scheme}")))
    }

    async fn rollback(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        let prefs = &mut ctx.snapshot.preferences;
        let scheme = prefs.remove("color_scheme");
        if let Some(theme) = prefs.remove("legacy_theme").or(scheme) {
            prefs.insert("theme".to_owned(), theme);
        }
        Ok(MigrationResult::success(&self.spec.id, "Theme preference restored").with_change("color_scheme -> theme"))
    }
}

/// Converts the v1 dashboard (a list of widget ids) into the v2 grid layout.
#[derive(Debug)]
pub struct DashboardLayoutMigration {
    spec: TaskSpec,
}

impl Default for DashboardLayoutMigration {
    fn default() -> Self {
        Self {
            spec: TaskSpec::new(DASHBOARD_LAYOUT_V2, PERSONALIZED_DASHBOARD)
                .describe("Convert the dashboard to the two-column v2 layout")
                .priority(MigrationPriority::Critical)
                .reversible(),
        }
    }
}

#[async_trait]
impl MigrationTask for DashboardLayoutMigration {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn validate(&self, ctx: &MigrationContext) -> Result<bool, MigrationError> {
        Ok(match ctx.snapshot.customizations.get(DASHBOARD) {
            None => true,
            Some(layout) if is_v2(layout) => true,
            Some(Value::Array(widgets)) => widgets.iter().all(|w| widget_id(w).is_some()),
            Some(_) => false,
        })
    }

    async fn execute(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        let custom = &mut ctx.snapshot.customizations;
        let done = MigrationResult::success(&self.spec.id, "Dashboard layout migrated");
        let widgets = match custom.get(DASHBOARD) {
            None => return Ok(done.with_change("no dashboard to migrate")),
            Some(layout) if is_v2(layout) => return Ok(done.with_change("dashboard already v2")),
            Some(Value::Array(widgets)) => widgets.clone(),
            Some(_) => return Err(MigrationError::task_failed("unrecognized dashboard layout")),
        };

        let mut placed = Vec::with_capacity(widgets.len());
        for (index, widget) in widgets.iter().enumerate() {
            let id = widget_id(widget)
                .ok_or_else(|| MigrationError::task_failed(format!("widget #{index} has no id")))?;
            placed.push(json!({
                "id": id,
                "column": index % DASHBOARD_COLUMNS,
                "row": index / DASHBOARD_COLUMNS,
            }));
        }

        let count = placed.len();
        custom.insert(DASHBOARD_BACKUP.to_owned(), Value::Array(widgets));
        custom.insert(
            DASHBOARD.to_owned(),
            json!({ "version": 2, "columns": DASHBOARD_COLUMNS, "widgets": placed }),
        );
        Ok(done.with_change(format!("{count} widgets placed on a {DASHBOARD_COLUMNS}-column grid")))
    }

    async fn rollback(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        let custom = &mut ctx.snapshot.customizations;
        let Some(backup) = custom.remove(DASHBOARD_BACKUP) else {
            return Err(MigrationError::task_failed("no v1 dashboard backup"));
        };
        custom.insert(DASHBOARD.to_owned(), backup);
        Ok(MigrationResult::success(&self.spec.id, "Dashboard layout restored").with_change("dashboard -> v1"))
    }
}

/// Copies widget visibility from `preferences.widgets` into the v2 dashboard.
#[derive(Debug)]
pub struct WidgetPreferencesMigration {
    spec: TaskSpec,
}

impl Default for WidgetPreferencesMigration {
    fn default() -> Self {
        Self {
            spec: TaskSpec::new(DASHBOARD_WIDGET_PREFERENCES, PERSONALIZED_DASHBOARD)
                .describe("Apply widget visibility preferences to the v2 dashboard")
                .after(DASHBOARD_LAYOUT_V2),
        }
    }
}

#[async_trait]
impl MigrationTask for WidgetPreferencesMigration {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn execute(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        let snapshot = &mut ctx.snapshot;
        let done = MigrationResult::success(&self.spec.id, "Widget preferences applied");
        let visibility = snapshot.preferences.get("widgets").and_then(Value::as_object).cloned().unwrap_or_default();

        let Some(dashboard) = snapshot.customizations.get_mut(DASHBOARD) else {
            return Ok(done.with_change("no dashboard"));
        };
        if !is_v2(dashboard) {
            return Err(MigrationError::task_failed("dashboard is not in the v2 layout"));
        }

        let mut hidden = 0;
        if let Some(widgets) = dashboard.get_mut("widgets").and_then(Value::as_array_mut) {
            for widget in widgets.iter_mut().filter_map(Value::as_object_mut) {
                let visible = widget
                    .get("id")
                    .and_then(Value::as_str)
                    .is_none_or(|id| is_visible(&visibility, id));
                if !visible {
                    hidden += 1;
                }
                widget.insert("visible".to_owned(), Value::Bool(visible));
            }
        }
        Ok(done.with_change(format!("{hidden} widgets hidden")))
    }
}

/// `preferences.font_size` becomes a relative `font_scale`, keeping `legacy_font_size`.
#[derive(Debug)]
pub struct FontScalingMigration {
    spec: TaskSpec,
}

impl Default for FontScalingMigration {
    fn default() -> Self {
        Self {
            spec: TaskSpec::new(ACCESSIBILITY_FONT_SCALING, ACCESSIBILITY)
                .describe("Replace absolute font sizes with a scale factor")
                .priority(MigrationPriority::Low)
                .reversible(),
        }
    }
}

#[async_trait]
impl MigrationTask for FontScalingMigration {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn validate(&self, ctx: &MigrationContext) -> Result<bool, MigrationError> {
        Ok(ctx.snapshot.preferences.get("font_size").is_none_or(|size| font_scale(size).is_some()))
    }

    async fn execute(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        let prefs = &mut ctx.snapshot.preferences;
        let done = MigrationResult::success(&self.spec.id, "Font scaling migrated");
        let Some(size) = prefs.remove("font_size") else {
            return Ok(done.with_change("no font size preference"));
        };
        let Some(scale) = font_scale(&size) else {
            prefs.insert("font_size".to_owned(), size);
            return Err(MigrationError::task_failed("unrecognized font size"));
        };

        prefs.insert("font_scale".to_owned(), json!(scale));
        prefs.insert("legacy_font_size".to_owned(), size);
        Ok(done.with_change(format!("font_size -> font_scale={scale}")))
    }

    async fn rollback(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        let prefs = &mut ctx.snapshot.preferences;
        let Some(size) = prefs.remove("legacy_font_size") else {
            return Err(MigrationError::task_failed("no font size backup"));
        };
        prefs.remove("font_scale");
        prefs.insert("font_size".to_owned(), size);
        Ok(MigrationResult::success(&self.spec.id, "Font size restored").with_change("font_scale -> font_size"))
    }
}

fn is_v2(layout: &Value) -> bool {
    layout.get("version").and_then(Value::as_u64) == Some(2)
}

fn widget_id(widget: &Value) -> Option<&str> {
    match widget {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map.get("id").and_then(Value::as_str),
        _ => None,
    }
}

/// `{"id": false}` and `{"id": {"visible": false}}` both hide a widget.
fn is_visible(preferences: &Map<String, Value>, id: &str) -> bool {
    match preferences.get(id) {
        Some(Value::Bool(visible)) => *visible,
        Some(Value::Object(entry)) => entry.get("visible").and_then(Value::as_bool).unwrap_or(true),
        _ => true,
    }
}

/// Named sizes map to fixed scales; pixel sizes are relative to 16px.
fn font_scale(size: &Value) -> Option<f64> {
    let px = match size {
        Value::Number(n) => n.as_f64()?,
        Value::String(name) => match name.as_str() {
            "small" => return Some(0.875),
            "medium" => return Some(1.0),
            "large" => return Some(1.25),
            "x-large" => return Some(1.5),
            other => other.trim_end_matches("px").trim().parse().ok()?,
        },
        _ => return None,
    };
    (px.is_finite() && px > 0.0).then_some(px / 16.0)
}
