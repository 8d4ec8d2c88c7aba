//! Configuration schema types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete validator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub zone: ZoneConfig,
    /// Absent tables keep the values from lower-priority layers
    pub policy: Option<PolicyConfig>,
    pub columns: Option<ColumnConfig>,
    #[serde(default)]
    pub reference: ReferenceConfig,
}

impl Config {
    /// Effective approval policy
    pub fn policy(&self) -> PolicyConfig {
        self.policy.clone().unwrap_or_default()
    }

    /// Effective column names
    pub fn columns(&self) -> ColumnConfig {
        self.columns.clone().unwrap_or_default()
    }
}

/// Common settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommonConfig {
    #[serde(default = "default_config_version")]
    pub config_version: String,
    #[serde(default)]
    pub verbose: bool,
}

fn default_config_version() -> String {
    "1.0".to_string()
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            verbose: false,
        }
    }
}

/// Protected zone definition
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ZoneConfig {
    #[serde(default)]
    pub description: String,
    /// Supernets whose internal traffic may not be opened by a new rule
    #[serde(default)]
    pub protected_supernets: Vec<String>,
}

/// Approval policy settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Protocols that are globally permitted and never checked
    #[serde(default = "default_exempt_protocols")]
    pub exempt_protocols: Vec<String>,
    /// Reference rows whose status is not listed are ignored.
    /// Empty accepts every row.
    #[serde(default)]
    pub approved_statuses: Vec<String>,
}

fn default_exempt_protocols() -> Vec<String> {
    vec!["icmp".to_string()]
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            exempt_protocols: default_exempt_protocols(),
            approved_statuses: Vec::new(),
        }
    }
}

impl PolicyConfig {
    /// Check whether a raw protocol token names an exempt protocol
    pub fn is_exempt(&self, protocol: &str) -> bool {
        let protocol = protocol.trim();
        self.exempt_protocols
            .iter()
            .any(|p| p.trim().eq_ignore_ascii_case(protocol))
    }

    pub fn is_approved_status(&self, status: &str) -> bool {
        if self.approved_statuses.is_empty() {
            return true;
        }
        let status = status.trim();
        self.approved_statuses
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(status))
    }
}

/// Column names of the rule records
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnConfig {
    #[serde(default = "default_serial_no")]
    pub serial_no: String,
    #[serde(default = "default_source_ip")]
    pub source_ip: String,
    #[serde(default = "default_destination_ip")]
    pub destination_ip: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_serial_no() -> String {
    "SerialNo".to_string()
}

fn default_source_ip() -> String {
    "Source IP".to_string()
}

fn default_destination_ip() -> String {
    "Destination IP".to_string()
}

fn default_protocol() -> String {
    "Protocol".to_string()
}

fn default_port() -> String {
    "Port".to_string()
}

fn default_status() -> String {
    "Status".to_string()
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            serial_no: default_serial_no(),
            source_ip: default_source_ip(),
            destination_ip: default_destination_ip(),
            protocol: default_protocol(),
            port: default_port(),
            status: default_status(),
        }
    }
}

impl ColumnConfig {
    /// All column names, in declaration order
    pub fn names(&self) -> [&str; 6] {
        [
            self.serial_no.as_str(),
            self.source_ip.as_str(),
            self.destination_ip.as_str(),
            self.protocol.as_str(),
            self.port.as_str(),
            self.status.as_str(),
        ]
    }
}

/// Location of the approved rule set
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReferenceConfig {
    pub path: Option<PathBuf>,
}
