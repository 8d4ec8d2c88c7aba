//! Validation of candidate rules against the approved rule set and protected zone

use super::matcher::ReferenceRuleSet;
use super::rule::{field, RuleId, RuleRecord};
use super::zone::ProtectedZone;
use crate::config::schema::{ColumnConfig, Config, PolicyConfig};
use crate::config::ConfigValidator;
use crate::error::{ParseError, Result};
use crate::records::{RawRecord, VerdictSink};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Final decision for one candidate rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// An approved rule already covers the candidate
    AlreadyPermitted { matched_rule_id: RuleId },
    /// Source and destination both lie in the protected zone
    ZoneBlocked,
    /// Protocol is globally permitted and was not checked
    ProtocolExempt { reason: String },
    /// Safe to add
    Permittable,
}

/// Result of evaluating one candidate row
pub type Outcome = std::result::Result<Verdict, ParseError>;

/// Report tag for an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictTag {
    AlreadyPermitted,
    ZoneBlocked,
    ProtocolExempt,
    Permittable,
    Failed,
}

impl VerdictTag {
    pub fn of(outcome: &Outcome) -> Self {
        match outcome {
            Ok(Verdict::AlreadyPermitted { .. }) => VerdictTag::AlreadyPermitted,
            Ok(Verdict::ZoneBlocked) => VerdictTag::ZoneBlocked,
            Ok(Verdict::ProtocolExempt { .. }) => VerdictTag::ProtocolExempt,
            Ok(Verdict::Permittable) => VerdictTag::Permittable,
            Err(_) => VerdictTag::Failed,
        }
    }

    /// Whether a candidate with this tag can be implemented
    pub fn is_approvable(self) -> bool {
        matches!(self, VerdictTag::Permittable | VerdictTag::ProtocolExempt)
    }
}

impl fmt::Display for VerdictTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerdictTag::AlreadyPermitted => "already-permitted",
            VerdictTag::ZoneBlocked => "zone-blocked",
            VerdictTag::ProtocolExempt => "protocol-exempt",
            VerdictTag::Permittable => "permittable",
            VerdictTag::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What the result sink receives for each candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateReport {
    /// Position of the candidate in the input, from 0
    pub row: usize,
    pub tag: VerdictTag,
    pub explanation: String,
}

impl fmt::Display for CandidateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}: {}", self.row, self.tag, self.explanation)
    }
}

/// Verdict counts for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub already_permitted: usize,
    pub zone_blocked: usize,
    pub protocol_exempt: usize,
    pub permittable: usize,
    pub failed: usize,
}

impl RunSummary {
    fn add(&mut self, tag: VerdictTag) {
        match tag {
            VerdictTag::AlreadyPermitted => self.already_permitted += 1,
            VerdictTag::ZoneBlocked => self.zone_blocked += 1,
            VerdictTag::ProtocolExempt => self.protocol_exempt += 1,
            VerdictTag::Permittable => self.permittable += 1,
            VerdictTag::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.already_permitted
            + self.zone_blocked
            + self.protocol_exempt
            + self.permittable
            + self.failed
    }

    /// True if every candidate can be implemented
    pub fn all_approvable(&self) -> bool {
        self.already_permitted == 0 && self.zone_blocked == 0 && self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates: {} permittable, {} protocol-exempt, {} already-permitted, {} zone-blocked, {} failed",
            self.total(),
            self.permittable,
            self.protocol_exempt,
            self.already_permitted,
            self.zone_blocked,
            self.failed
        )
    }
}

/// Evaluates candidate rules. Holds only immutable state for the run.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    reference: ReferenceRuleSet,
    zone: ProtectedZone,
    policy: PolicyConfig,
    columns: ColumnConfig,
}

impl RuleValidator {
    pub fn new(
        reference: ReferenceRuleSet,
        zone: ProtectedZone,
        policy: PolicyConfig,
        columns: ColumnConfig,
    ) -> Self {
        Self {
            reference,
            zone,
            policy,
            columns,
        }
    }

    /// Validate the configuration and load the reference rows.
    /// Any failure here is fatal to the whole run.
    pub fn from_config(config: &Config, reference_records: &[RawRecord]) -> Result<Self> {
        let zone = ConfigValidator::validate(config)?;
        let policy = config.policy();
        let columns = config.columns();
        let reference = ReferenceRuleSet::from_records(reference_records, &columns, &policy)?;

        info!(
            "Loaded {} reference rules, {} protected supernets",
            reference.len(),
            zone.supernets().len()
        );

        Ok(Self::new(reference, zone, policy, columns))
    }

    pub fn reference(&self) -> &ReferenceRuleSet {
        &self.reference
    }

    pub fn zone(&self) -> &ProtectedZone {
        &self.zone
    }

    /// Evaluate one raw candidate row
    pub fn evaluate(&self, row: usize, record: &RawRecord) -> Outcome {
        self.assess(row, record).0
    }

    /// Evaluate a candidate that is already parsed
    pub fn evaluate_rule(&self, candidate: &RuleRecord) -> Verdict {
        self.assess_rule(candidate).0
    }

    /// Evaluate every candidate in order, handing each report to the sink
    pub fn run(&self, candidates: &[RawRecord], sink: &mut dyn VerdictSink) -> Result<RunSummary> {
        info!(
            "Validating {} candidates against {} reference rules",
            candidates.len(),
            self.reference.len()
        );

        let mut summary = RunSummary::default();
        for (row, record) in candidates.iter().enumerate() {
            let report = self.report(row, record);
            summary.add(report.tag);
            sink.record(&report);
        }
        sink.flush()?;

        info!("{}", summary);
        Ok(summary)
    }

    /// Evaluate one row and describe the result
    pub fn report(&self, row: usize, record: &RawRecord) -> CandidateReport {
        let (outcome, explanation) = self.assess(row, record);
        let tag = VerdictTag::of(&outcome);
        debug!("Candidate row {}: {}", row, tag);
        CandidateReport {
            row,
            tag,
            explanation,
        }
    }

    fn assess(&self, row: usize, record: &RawRecord) -> (Outcome, String) {
        let raw_protocol = match field(record, &self.columns.protocol) {
            Ok(p) => p,
            Err(err) => return failed(err),
        };

        // Exempt protocols have no port or address semantics to check
        if self.policy.is_exempt(raw_protocol) {
            let reason = format!(
                "{} traffic is globally permitted",
                raw_protocol.trim().to_lowercase()
            );
            let explanation = reason.clone();
            return (Ok(Verdict::ProtocolExempt { reason }), explanation);
        }

        let id = RuleId::from_record(record, &self.columns, row);
        match RuleRecord::from_record(record, &self.columns, id) {
            Ok(candidate) => {
                let (verdict, explanation) = self.assess_rule(&candidate);
                (Ok(verdict), explanation)
            }
            Err(err) => failed(err),
        }
    }

    fn assess_rule(&self, candidate: &RuleRecord) -> (Verdict, String) {
        if let Some(matched) = self.reference.find_overlap(candidate) {
            let shared = candidate.ports().intersection(matched.ports());
            let explanation = format!("overlaps approved rule {} on port {}", matched, shared);
            return (
                Verdict::AlreadyPermitted {
                    matched_rule_id: matched.id().clone(),
                },
                explanation,
            );
        }

        if self.zone.contains_both_ends(candidate) {
            let supernets: Vec<String> =
                self.zone.supernets().iter().map(|n| n.to_string()).collect();
            let explanation = format!(
                "source {} and destination {} both belong to protected supernets [{}]",
                candidate.source(),
                candidate.destination(),
                supernets.join(", ")
            );
            return (Verdict::ZoneBlocked, explanation);
        }

        let explanation = format!(
            "no overlap with {} approved rules and not zone-to-zone traffic",
            self.reference.len()
        );
        (Verdict::Permittable, explanation)
    }
}

fn failed(err: ParseError) -> (Outcome, String) {
    let explanation = err.to_string();
    (Err(err), explanation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigurationError, QaError};
    use crate::records::MemorySink;

    const SUPERNETS: [&str; 4] = [
        "10.200.0.0/16",
        "10.201.0.0/16",
        "10.202.0.0/16",
        "10.203.0.0/16",
    ];

    fn record(serial: &str, src: &str, dst: &str, proto: &str, port: &str) -> RawRecord {
        let mut record = RawRecord::new();
        if !serial.is_empty() {
            record.insert("SerialNo".to_string(), serial.to_string());
        }
        record.insert("Source IP".to_string(), src.to_string());
        record.insert("Destination IP".to_string(), dst.to_string());
        record.insert("Protocol".to_string(), proto.to_string());
        record.insert("Port".to_string(), port.to_string());
        record
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.zone.protected_supernets = SUPERNETS.iter().map(|s| s.to_string()).collect();
        config
    }

    fn validator() -> RuleValidator {
        let reference = vec![
            record("FW-1", "10.0.0.0/16", "10.1.0.0/16", "tcp", "22,443"),
            record("FW-2", "10.0.0.0/8", "10.0.0.0/8", "tcp", "443"),
            record("FW-3", "172.16.0.0/12", "10.200.0.0/16", "udp", "53"),
        ];
        RuleValidator::from_config(&config(), &reference).unwrap()
    }

    #[test]
    fn test_identical_rule_is_already_permitted() {
        let v = validator();
        let outcome = v.evaluate(0, &record("", "10.0.0.0/16", "10.1.0.0/16", "tcp", "443"));
        assert_eq!(
            outcome,
            Ok(Verdict::AlreadyPermitted {
                matched_rule_id: RuleId::new("FW-1")
            })
        );
    }

    #[test]
    fn test_first_match_is_reported() {
        let v = validator();
        // Both FW-1 and FW-2 cover this; FW-1 comes first
        let report = v.report(0, &record("", "10.0.1.0/24", "10.1.2.3", "TCP", "443"));
        assert_eq!(report.tag, VerdictTag::AlreadyPermitted);
        assert_eq!(
            report.explanation,
            "overlaps approved rule FW-1 [tcp 10.0.0.0/16 -> 10.1.0.0/16 port 22,443] on port 443"
        );
    }

    #[test]
    fn test_broader_candidate_is_not_permitted() {
        let v = validator();
        let outcome = v.evaluate(0, &record("", "10.0.0.0/7", "10.1.0.0/16", "tcp", "443"));
        assert_eq!(outcome, Ok(Verdict::Permittable));
    }

    #[test]
    fn test_zone_to_zone_is_blocked() {
        let v = validator();
        let report = v.report(0, &record("", "10.200.5.0/24", "10.201.8.0/24", "tcp", "8443"));
        assert_eq!(report.tag, VerdictTag::ZoneBlocked);
        assert!(report.explanation.contains("10.203.0.0/16"));
    }

    #[test]
    fn test_zone_to_outside_is_permittable() {
        let v = validator();
        let outcome = v.evaluate(0, &record("", "10.200.5.0/24", "192.168.1.0/24", "tcp", "8443"));
        assert_eq!(outcome, Ok(Verdict::Permittable));
    }

    #[test]
    fn test_overlap_takes_precedence_over_zone() {
        let v = validator();
        let outcome = v.evaluate(0, &record("", "10.200.1.0/24", "10.201.1.0/24", "tcp", "443"));
        assert_eq!(
            outcome,
            Ok(Verdict::AlreadyPermitted {
                matched_rule_id: RuleId::new("FW-2")
            })
        );
    }

    #[test]
    fn test_ipv6_rules_alongside_ipv4() {
        let mut config = config();
        config.zone.protected_supernets.push("fd00::/8".to_string());
        let reference = vec![
            record("FW-1", "10.0.0.0/8", "10.0.0.0/8", "tcp", "443"),
            record("R6", "2001:db8::/32", "2001:db9::/32", "tcp", "443"),
        ];
        let v = RuleValidator::from_config(&config, &reference).unwrap();

        assert_eq!(
            v.evaluate(0, &record("", "2001:db8:1::/48", "2001:db9::1", "tcp", "443")),
            Ok(Verdict::AlreadyPermitted {
                matched_rule_id: RuleId::new("R6")
            })
        );
        assert_eq!(
            v.evaluate(1, &record("", "fd00:1::/32", "fd12::1", "tcp", "443")),
            Ok(Verdict::ZoneBlocked)
        );
        assert_eq!(
            v.evaluate(2, &record("", "::ffff:10.0.0.1", "::ffff:10.1.0.1", "tcp", "443")),
            Ok(Verdict::Permittable)
        );
    }

    #[test]
    fn test_evaluate_parsed_rule() {
        let v = validator();
        let columns = ColumnConfig::default();
        let candidate = RuleRecord::from_record(
            &record("REQ-9", "172.20.0.0/16", "10.200.9.9", "UDP", "53"),
            &columns,
            RuleId::new("REQ-9"),
        )
        .unwrap();

        assert_eq!(
            v.evaluate_rule(&candidate),
            Verdict::AlreadyPermitted {
                matched_rule_id: RuleId::new("FW-3")
            }
        );
        assert_eq!(v.zone().supernets().len(), 4);
    }

    #[test]
    fn test_icmp_is_exempt_before_parsing() {
        let v = validator();
        // Networks and ports are garbage; exemption short-circuits
        let outcome = v.evaluate(0, &record("", "anywhere", "", " ICMP ", "n/a"));
        assert_eq!(
            outcome,
            Ok(Verdict::ProtocolExempt {
                reason: "icmp traffic is globally permitted".to_string()
            })
        );
    }

    #[test]
    fn test_parse_error_is_per_row() {
        let v = validator();
        let candidates = vec![
            record("", "10.0.0.0/16", "10.1.0.0/16", "tcp", "22"),
            record("", "10.0.0.0/16", "10.1.0.0/16", "tcp", "20-10"),
            record("", "10.200.5.0/24", "10.201.8.0/24", "tcp", "8443"),
            record("", "10.50.0.0/16", "192.168.1.0/24", "udp", "500"),
        ];

        let mut sink = MemorySink::new();
        let summary = v.run(&candidates, &mut sink).unwrap();

        let tags: Vec<VerdictTag> = sink.reports().iter().map(|r| r.tag).collect();
        assert_eq!(
            tags,
            vec![
                VerdictTag::AlreadyPermitted,
                VerdictTag::Failed,
                VerdictTag::ZoneBlocked,
                VerdictTag::Permittable,
            ]
        );

        let rows: Vec<usize> = sink.reports().iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 1, 2, 3]);
        assert_eq!(sink.reports()[1].explanation, "Port: port range \"20-10\" has low > high");

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_approvable());
    }

    #[test]
    fn test_missing_protocol_fails_row() {
        let v = validator();
        let mut candidate = record("", "10.0.0.0/16", "10.1.0.0/16", "tcp", "22");
        candidate.shift_remove("Protocol");

        assert_eq!(
            v.evaluate(0, &candidate),
            Err(ParseError::MissingField {
                field: "Protocol".to_string()
            })
        );
    }

    #[test]
    fn test_bad_reference_row_does_not_affect_others() {
        let reference = vec![
            record("FW-1", "10.0.0.0/16", "10.1.0.0/16", "tcp", "ssh"),
            record("FW-2", "10.0.0.0/16", "10.1.0.0/16", "tcp", "22"),
        ];
        let v = RuleValidator::from_config(&config(), &reference).unwrap();

        assert_eq!(v.reference().skipped().len(), 1);
        assert_eq!(
            v.evaluate(0, &record("", "10.0.0.0/24", "10.1.0.0/24", "tcp", "22")),
            Ok(Verdict::AlreadyPermitted {
                matched_rule_id: RuleId::new("FW-2")
            })
        );
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        let reference = vec![record("FW-1", "10.0.0.0/16", "10.1.0.0/16", "tcp", "22")];

        let err = RuleValidator::from_config(&Config::default(), &reference).unwrap_err();
        assert!(matches!(
            err,
            QaError::Configuration(ConfigurationError::EmptySupernets)
        ));

        let err = RuleValidator::from_config(&config(), &[]).unwrap_err();
        assert!(matches!(
            err,
            QaError::Configuration(ConfigurationError::EmptyReferenceSet { .. })
        ));
    }

    #[test]
    fn test_demo_files() {
        use crate::config::ConfigLoader;
        use crate::records::{RecordSource, TomlRecordSource};

        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
        let config = ConfigLoader::merge_configs(
            ConfigLoader::load_builtin().unwrap(),
            ConfigLoader::load_from_file(dir.join("config.toml")).unwrap(),
        );
        let reference = TomlRecordSource::new(dir.join("rules.toml")).load().unwrap();
        let candidates = TomlRecordSource::new(dir.join("candidates.toml")).load().unwrap();

        let v = RuleValidator::from_config(&config, &reference).unwrap();
        // Rule 3 is rejected and never consulted
        assert_eq!(v.reference().len(), 2);

        let mut sink = MemorySink::new();
        let summary = v.run(&candidates, &mut sink).unwrap();
        let tags: Vec<VerdictTag> = sink.reports().iter().map(|r| r.tag).collect();
        assert_eq!(
            tags,
            vec![
                VerdictTag::AlreadyPermitted,
                VerdictTag::ZoneBlocked,
                VerdictTag::ProtocolExempt,
                VerdictTag::Failed,
                VerdictTag::Permittable,
            ]
        );
        assert!(sink.reports()[0].explanation.starts_with("overlaps approved rule 1 "));
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            permittable: 2,
            failed: 1,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "3 candidates: 2 permittable, 0 protocol-exempt, 0 already-permitted, 0 zone-blocked, 1 failed"
        );
        assert!(!summary.all_approvable());
        assert!(VerdictTag::ProtocolExempt.is_approvable());
    }
}
