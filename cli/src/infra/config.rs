//! Configuration loading: YAML file plus environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::{AppConfig, Settings, TARGET_ENV, TOKEN_ENV, Target};
use crate::domain::error::ConfigError;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "TSURU_BLUEGREEN_CONFIG";
/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tsuru-bluegreen.yaml";
/// INI config read by earlier releases; only detected to point at the migration.
pub const LEGACY_CONFIG_FILE: &str = "tsuru-bluegreen.ini";

/// Config file location: `explicit`, else `$TSURU_BLUEGREEN_CONFIG`, else
/// `./tsuru-bluegreen.yaml`.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var(CONFIG_ENV) {
        Ok(val) if !val.trim().is_empty() => PathBuf::from(val),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// Read and parse the YAML config at `path`, then fill blank secrets from
/// the environment.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, or not valid YAML.
/// A missing file next to a legacy `tsuru-bluegreen.ini` is reported as
/// [`ConfigError::LegacyIni`].
pub fn load_app_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let legacy = path.with_file_name(LEGACY_CONFIG_FILE);
        if legacy.exists() {
            return Err(ConfigError::LegacyIni {
                expected: path.display().to_string(),
                legacy: legacy.display().to_string(),
            }
            .into());
        }
        return Err(ConfigError::NotFound(path.display().to_string()).into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut config: AppConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    config.apply_env_fallbacks(|key| std::env::var(key).ok());
    Ok(config)
}

/// Build the validated [`Settings`] of a run.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or validated, or if
/// `TSURU_TARGET`/`TSURU_TOKEN` are missing.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = config_path(explicit);
    let app = load_app_config(&path)?;
    let raw_target = std::env::var(TARGET_ENV).map_err(|_| ConfigError::MissingEnv(TARGET_ENV))?;
    let token = std::env::var(TOKEN_ENV).map_err(|_| ConfigError::MissingEnv(TOKEN_ENV))?;
    let target = Target::new(&raw_target, &token)?;
    Ok(Settings::new(target, app)?)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
