//! Rule parsing, overlap matching and zone classification

pub mod matcher;
pub mod netset;
pub mod policy;
pub mod rule;
pub mod zone;

pub use matcher::{find_overlap, overlaps, ReferenceRuleSet, SkipReason, SkippedRow};
pub use netset::{AddressFamily, NetworkSet, PortSet};
pub use policy::{CandidateReport, Outcome, RuleValidator, RunSummary, Verdict, VerdictTag};
pub use rule::{Protocol, RuleId, RuleRecord};
pub use zone::{is_zone_to_zone, ProtectedZone};
