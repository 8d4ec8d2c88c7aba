//! Configuration validation, run before any candidate is evaluated

use super::schema::{ColumnConfig, Config, PolicyConfig};
use crate::error::{ConfigurationError, Result};
use crate::filter::zone::ProtectedZone;
use std::collections::HashSet;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the merged configuration and build the protected zone from it
    pub fn validate(config: &Config) -> Result<ProtectedZone> {
        let zone = ProtectedZone::from_cidrs(&config.zone.protected_supernets)?;
        Self::validate_policy(&config.policy())?;
        Self::validate_columns(&config.columns())?;
        Ok(zone)
    }

    fn validate_policy(policy: &PolicyConfig) -> std::result::Result<(), ConfigurationError> {
        if policy.exempt_protocols.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigurationError::EmptyExemptProtocol);
        }
        Ok(())
    }

    fn validate_columns(columns: &ColumnConfig) -> std::result::Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for name in columns.names() {
            if !seen.insert(name) {
                return Err(ConfigurationError::DuplicateColumn {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}
