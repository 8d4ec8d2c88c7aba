//! Same-zone classification against the protected supernets

use super::rule::RuleRecord;
use crate::error::ConfigurationError;
use ipnet::IpNet;

/// Protected supernets treated as one zone
#[derive(Debug, Clone)]
pub struct ProtectedZone {
    supernets: Vec<IpNet>,
}

impl ProtectedZone {
    /// Parse the configured supernet list. An empty list is an error.
    pub fn from_cidrs<S: AsRef<str>>(cidrs: &[S]) -> Result<Self, ConfigurationError> {
        if cidrs.is_empty() {
            return Err(ConfigurationError::EmptySupernets);
        }

        let supernets = cidrs
            .iter()
            .map(|cidr| {
                let cidr = cidr.as_ref().trim();
                cidr.parse::<IpNet>()
                    .map(|net| net.trunc())
                    .map_err(|_| ConfigurationError::InvalidSupernet {
                        cidr: cidr.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { supernets })
    }

    pub fn supernets(&self) -> &[IpNet] {
        &self.supernets
    }

    pub fn contains_both_ends(&self, candidate: &RuleRecord) -> bool {
        is_zone_to_zone(candidate, &self.supernets)
    }
}

/// True if both the source and the destination of the candidate have a
/// block inside one of the protected supernets
pub fn is_zone_to_zone(candidate: &RuleRecord, protected: &[IpNet]) -> bool {
    let source_in_zone = candidate.source().any_within(protected);
    let destination_in_zone = candidate.destination().any_within(protected);

    source_in_zone && destination_in_zone
}
