//! Canonical firewall rule built from one raw record

use super::netset::{NetworkSet, PortSet};
use crate::config::schema::ColumnConfig;
use crate::error::ParseError;
use crate::records::RawRecord;
use std::fmt;

/// Opaque rule identifier, used only for reporting
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fallback id for rows without a serial number
    pub fn for_row(row: usize) -> Self {
        Self(format!("row-{}", row))
    }

    /// Serial number of the record, or the row fallback when it has none
    pub fn from_record(record: &RawRecord, columns: &ColumnConfig, row: usize) -> Self {
        match record.get(&columns.serial_no).map(|s| s.trim()) {
            Some(serial) if !serial.is_empty() => Self::new(serial),
            _ => Self::for_row(row),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-cased protocol name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Protocol(String);

impl Protocol {
    pub fn parse(field: &str, column: &str) -> Result<Self, ParseError> {
        let name = field.trim();
        if name.is_empty() {
            return Err(ParseError::EmptyField {
                field: column.to_string(),
            });
        }
        Ok(Self(name.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One firewall rule. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    id: RuleId,
    source: NetworkSet,
    destination: NetworkSet,
    protocol: Protocol,
    ports: PortSet,
}

impl RuleRecord {
    /// Build a rule from already-parsed parts.
    /// Source and destination must share an address family.
    pub fn new(
        id: RuleId,
        source: NetworkSet,
        destination: NetworkSet,
        protocol: Protocol,
        ports: PortSet,
        destination_column: &str,
    ) -> Result<Self, ParseError> {
        if source.family() != destination.family() {
            return Err(ParseError::MixedFamily {
                field: destination_column.to_string(),
                token: destination.to_string(),
            });
        }

        Ok(Self {
            id,
            source,
            destination,
            protocol,
            ports,
        })
    }

    /// Parse a rule from a raw record using the configured column names
    pub fn from_record(
        record: &RawRecord,
        columns: &ColumnConfig,
        id: RuleId,
    ) -> Result<Self, ParseError> {
        let protocol = Protocol::parse(field(record, &columns.protocol)?, &columns.protocol)?;
        Self::from_record_with_protocol(record, columns, id, protocol)
    }

    /// Parse the network and port columns of a record whose protocol is already known
    pub(crate) fn from_record_with_protocol(
        record: &RawRecord,
        columns: &ColumnConfig,
        id: RuleId,
        protocol: Protocol,
    ) -> Result<Self, ParseError> {
        let source = NetworkSet::parse(field(record, &columns.source_ip)?, &columns.source_ip)?;
        let destination = NetworkSet::parse(
            field(record, &columns.destination_ip)?,
            &columns.destination_ip,
        )?;
        let ports = PortSet::parse(field(record, &columns.port)?, &columns.port)?;

        Self::new(id, source, destination, protocol, ports, &columns.destination_ip)
    }

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    pub fn source(&self) -> &NetworkSet {
        &self.source
    }

    pub fn destination(&self) -> &NetworkSet {
        &self.destination
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }
}

impl fmt::Display for RuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {} -> {} port {}]",
            self.id, self.protocol, self.source, self.destination, self.ports
        )
    }
}

/// Look up a column, failing if it is absent
pub(crate) fn field<'a>(record: &'a RawRecord, column: &str) -> Result<&'a str, ParseError> {
    record
        .get(column)
        .map(String::as_str)
        .ok_or_else(|| ParseError::MissingField {
            field: column.to_string(),
        })
}
