//! Overlap matching of a candidate rule against the approved rule set

use super::rule::{field, Protocol, RuleId, RuleRecord};
use crate::config::schema::{ColumnConfig, PolicyConfig};
use crate::error::{ConfigurationError, ParseError};
use crate::records::RawRecord;
use tracing::{debug, warn};

/// Why a reference row was left out of the rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Status column is not one of the approved statuses
    Unapproved { status: String },
    /// Protocol is exempt, so no candidate is ever matched against it
    ExemptProtocol { protocol: String },
    /// Row could not be parsed
    Invalid(ParseError),
}

/// A reference row that did not make it into the rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

/// Approved rules in load order. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRuleSet {
    rules: Vec<RuleRecord>,
    skipped: Vec<SkippedRow>,
}

impl ReferenceRuleSet {
    /// Build the set from already-parsed rules
    pub fn new(rules: Vec<RuleRecord>) -> Self {
        Self {
            rules,
            skipped: Vec::new(),
        }
    }

    /// Build the set from raw records, skipping rows that are unapproved,
    /// exempt, or malformed. Fails if no usable rule remains.
    pub fn from_records(
        records: &[RawRecord],
        columns: &ColumnConfig,
        policy: &PolicyConfig,
    ) -> Result<Self, ConfigurationError> {
        let mut rules = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for (row, record) in records.iter().enumerate() {
            match Self::parse_row(row, record, columns, policy) {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    match &reason {
                        SkipReason::Invalid(err) => {
                            warn!("Skipping reference row {}: {}", row, err)
                        }
                        other => debug!("Skipping reference row {}: {:?}", row, other),
                    }
                    skipped.push(SkippedRow { row, reason });
                }
            }
        }

        if rules.is_empty() {
            return Err(ConfigurationError::EmptyReferenceSet {
                loaded: records.len(),
                skipped: skipped.len(),
            });
        }

        debug!(
            "Loaded {} reference rules ({} skipped)",
            rules.len(),
            skipped.len()
        );

        Ok(Self { rules, skipped })
    }

    fn parse_row(
        row: usize,
        record: &RawRecord,
        columns: &ColumnConfig,
        policy: &PolicyConfig,
    ) -> Result<RuleRecord, SkipReason> {
        if let Some(status) = record.get(&columns.status) {
            if !policy.is_approved_status(status) {
                return Err(SkipReason::Unapproved {
                    status: status.clone(),
                });
            }
        }

        let id = RuleId::from_record(record, columns, row);

        let raw_protocol = field(record, &columns.protocol).map_err(SkipReason::Invalid)?;
        let protocol =
            Protocol::parse(raw_protocol, &columns.protocol).map_err(SkipReason::Invalid)?;
        if policy.is_exempt(protocol.as_str()) {
            return Err(SkipReason::ExemptProtocol {
                protocol: protocol.to_string(),
            });
        }

        RuleRecord::from_record_with_protocol(record, columns, id, protocol)
            .map_err(SkipReason::Invalid)
    }

    pub fn rules(&self) -> &[RuleRecord] {
        &self.rules
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule in load order that already permits the candidate
    pub fn find_overlap(&self, candidate: &RuleRecord) -> Option<&RuleRecord> {
        self.rules.iter().find(|rule| overlaps(candidate, rule))
    }
}

/// Check whether `reference` already permits `candidate`:
/// same protocol, candidate source and destination each contained in the
/// reference's, and at least one shared port
pub fn overlaps(candidate: &RuleRecord, reference: &RuleRecord) -> bool {
    candidate.protocol() == reference.protocol()
        && candidate.source().is_subset_of(reference.source())
        && candidate.destination().is_subset_of(reference.destination())
        && candidate.ports().intersects(reference.ports())
}

/// Identifier of the first reference rule that overlaps the candidate
pub fn find_overlap<'a>(
    candidate: &RuleRecord,
    reference: &'a ReferenceRuleSet,
) -> Option<&'a RuleId> {
    reference.find_overlap(candidate).map(RuleRecord::id)
}
