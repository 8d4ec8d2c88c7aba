//! Configuration file loading and merging

use super::schema::Config;
use crate::error::{QaError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Find user config by checking environment and standard locations
    pub fn find_user_config() -> Option<PathBuf> {
        // 1. $FWRULE_QA_CONFIG
        if let Ok(path) = env::var("FWRULE_QA_CONFIG") {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }

        // 2. $XDG_CONFIG_HOME/fwrule-qa/config.toml
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            let p = PathBuf::from(xdg).join("fwrule-qa/config.toml");
            if p.exists() {
                return Some(p);
            }
        }

        // 3. ~/.config/fwrule-qa/config.toml
        if let Ok(home) = env::var("HOME") {
            let p = PathBuf::from(home).join(".config/fwrule-qa/config.toml");
            if p.exists() {
                return Some(p);
            }
        }

        None
    }

    /// Load config from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| QaError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load built-in configuration embedded in the binary
    pub fn load_builtin() -> Result<Config> {
        const BUILTIN_TOML: &str = include_str!("../builtin.toml");
        let config: Config = toml::from_str(BUILTIN_TOML)?;
        Ok(config)
    }

    /// Merge a higher-priority config on top of a lower-priority one.
    /// Non-empty lists and present tables in `override_cfg` win.
    pub fn merge_configs(mut base: Config, override_cfg: Config) -> Config {
        if !override_cfg.zone.protected_supernets.is_empty() {
            base.zone.protected_supernets = override_cfg.zone.protected_supernets;
        }
        if !override_cfg.zone.description.is_empty() {
            base.zone.description = override_cfg.zone.description;
        }

        if override_cfg.policy.is_some() {
            base.policy = override_cfg.policy;
        }

        if override_cfg.columns.is_some() {
            base.columns = override_cfg.columns;
        }

        if override_cfg.reference.path.is_some() {
            base.reference.path = override_cfg.reference.path;
        }

        // Override common config with user settings
        base.common = override_cfg.common;

        base
    }

    /// Load with full config priority order
    /// Priority: built-in < user < explicit
    pub fn load_with_priority(explicit_config: Option<PathBuf>) -> Result<Config> {
        let mut configs = Vec::new();

        // 1. Built-in (lowest priority)
        configs.push(Self::load_builtin()?);

        // 2. User config
        if let Some(user_path) = Self::find_user_config() {
            tracing::debug!("Loading user config from {:?}", user_path);
            configs.push(Self::load_from_file(&user_path)?);
        }

        // 3. Explicit --config option (highest priority)
        if let Some(explicit_path) = explicit_config {
            tracing::debug!("Loading explicit config from {:?}", explicit_path);
            configs.push(Self::load_from_file(&explicit_path)?);
        }

        // Merge all configs, later ones override earlier ones
        Ok(configs
            .into_iter()
            .reduce(Self::merge_configs)
            .unwrap_or_default())
    }
}
