use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_BASE_CLASS: &str = "embed-video";
pub const STYLESHEET_FILE: &str = "embed-video.css";
/// `V`
pub const DEFAULT_TOGGLE_KEY_CODE: u32 = 86;
/// `C`
pub const DEFAULT_CYCLE_KEY_CODE: u32 = 67;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub persistent: bool,
    pub path: Option<PathBuf>,
    pub base_class: String,
    pub toggle_key_code: u32,
    pub cycle_key_code: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            persistent: false,
            path: None,
            base_class: DEFAULT_BASE_CLASS.into(),
            toggle_key_code: DEFAULT_TOGGLE_KEY_CODE,
            cycle_key_code: DEFAULT_CYCLE_KEY_CODE,
        }
    }
}

impl OverlayConfig {
    /// Base directory for style assets.
    pub fn asset_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_asset_path)
    }

    pub fn stylesheet_path(&self) -> PathBuf {
        self.asset_path().join(STYLESHEET_FILE)
    }
}

/// Defaults, then the TOML file at `path` (if given), then environment
/// overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OverlayConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read overlay config '{}'", path.display()))?;
            let mut config = parse_config(&raw)
                .with_context(|| format!("invalid overlay config '{}'", path.display()))?;
            if config.path.is_none() {
                config.path = path.parent().map(Path::to_path_buf);
            }
            config
        }
        None => OverlayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

pub fn parse_config(raw: &str) -> anyhow::Result<OverlayConfig> {
    Ok(toml::from_str::<OverlayConfig>(raw)?)
}

pub(crate) fn apply_env_overrides<F>(config: &mut OverlayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for key in ["OVERLAY_ENABLED", "APP__ENABLED"] {
        if let Some(v) = lookup(key).as_deref().and_then(parse_bool) {
            config.enabled = v;
        }
    }

    for key in ["OVERLAY_PERSISTENT", "APP__PERSISTENT"] {
        if let Some(v) = lookup(key).as_deref().and_then(parse_bool) {
            config.persistent = v;
        }
    }

    for key in ["OVERLAY_PATH", "APP__PATH"] {
        if let Some(v) = lookup(key) {
            if !v.trim().is_empty() {
                config.path = Some(PathBuf::from(v));
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_asset_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
