use config::{Config, Environment, File};
use fstone_domain::config::PlatformConfig;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Prefix of environment overrides, e.g. `FSTONE__FLAGS__CACHE_TTL_SECONDS=60`.
pub const ENV_PREFIX: &str = "FSTONE";
const ENV_SEPARATOR: &str = "__";

/// Custom error type for config loading.
#[fstone_derive::fstone_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Layered configuration loader: an optional file overlaid by environment variables.
///
/// 1. **Base File**: when `path` is given, the file is required; its format follows the
///    extension (`toml`, `json`, `yaml`, …).
/// 2. **Environment Overrides**: variables prefixed with `FSTONE__`, nested with `__`
///    (e.g. `FSTONE__MIGRATION__ROLLBACK_ON_ERROR=false` maps to `migration.rollback_on_error`).
///
/// Without a file and without overrides the target's serde defaults apply.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or malformed, or if the merged
/// values do not match the structure of `T`.
///
/// # Example
/// ```rust
/// use fstone_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     #[serde(default)]
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(None::<&str>).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_layered(path.as_ref().map(AsRef::as_ref), environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

fn load_layered<T>(path: Option<&Path>, env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = path {
        info!(path = %path.display(), "Loading config file");
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(env)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

/// Loads the [`PlatformConfig`].
///
/// # Errors
/// See [`load_config`].
pub fn load_platform_config(path: Option<impl AsRef<Path>>) -> Result<PlatformConfig, ConfigError> {
    load_config::<PlatformConfig>(path)
}
