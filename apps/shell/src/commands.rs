use crate::args::{Cli, Command};
use anyhow::{Context, Result, bail};
use fstone::Platform;
use fstone::compat::StaticEnvironment;
use fstone::domain::config::{PlatformConfig, StorageBackend};
use fstone::domain::{BrowserInfo, Capabilities, Environment, EvaluationContext, Feature};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

/// Executes one command and returns the JSON to print, if any.
pub async fn run(cli: Cli, mut config: PlatformConfig) -> Result<Option<String>> {
    if let Some(dir) = cli.data_dir {
        config.storage.backend = StorageBackend::File;
        config.storage.root = dir;
    }
    let environment = match cli.environment.as_deref() {
        Some(path) => read_environment(path)?,
        None => desktop(),
    };

    let platform = Platform::builder()
        .config(config)
        .environment(StaticEnvironment::new(environment))
        .build()
        .await
        .context("Failed to start the platform")?;

    let output = match cli.command {
        Command::Status => pretty(&json!({
            "features": platform.available_features().iter().map(summary).collect::<Vec<_>>(),
            "integration_status": platform.integration_status(),
        })),
        Command::Enable { id, user } => {
            let enabled = platform.enable_feature(&id, user.user.as_deref()).await?;
            pretty(&json!({ "feature": id, "enabled": enabled }))
        },
        Command::Disable { id, user } => {
            platform.disable_feature(&id, user.user.as_deref()).await?;
            pretty(&json!({ "feature": id, "enabled": false }))
        },
        Command::Batch { ids, user } => {
            let outcomes = platform.enable_features(&ids, user.user.as_deref()).await;
            let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
            let output = pretty(&outcomes)?;
            if failed > 0 {
                println!("{output}");
                bail!("{failed} of {} features could not be enabled", outcomes.len());
            }
            Ok(output)
        },
        Command::Evaluate { id, user, groups, device } => {
            let mut ctx = match user.user {
                Some(user) => EvaluationContext::for_user(user),
                None => EvaluationContext::anonymous(),
            }
            .with_groups(groups);
            if let Some(device) = device {
                ctx = ctx.with_device(device);
            }
            let decision = platform.components().flags.evaluate(&id, &ctx);
            pretty(&json!({ "feature": id, "decision": decision }))
        },
        Command::Validate => pretty(&platform.validate_integration().await),
        Command::Health => pretty(&platform.health_status().await),
        Command::Recommend { user } => pretty(&platform.recommendations(user.user.as_deref()).await?),
        Command::Export { out } => {
            let exported = platform.export_configuration()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, exported)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    return Ok(None);
                },
                None => Ok(exported),
            }
        },
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            pretty(&platform.import_flags(&raw).await?)
        },
    }?;
    Ok(Some(output))
}

/// A current desktop browser with every capability.
fn desktop() -> Environment {
    Environment {
        browser: BrowserInfo { name: "chrome".to_owned(), version: "126.0".to_owned() },
        platform: "linux 6.8".to_owned(),
        device_type: "desktop".to_owned(),
        supported_features: Capabilities::all(),
    }
}

fn read_environment(path: &Path) -> Result<Environment> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not an environment description", path.display()))
}

fn summary(feature: &Feature) -> serde_json::Value {
    json!({
        "id": feature.id,
        "name": feature.name,
        "version": feature.version,
        "enabled": feature.enabled,
    })
}

fn pretty(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to render output")
}
