//! Firewall rule request validation: overlap with approved rules and
//! same-zone traffic detection

pub mod config;
pub mod error;
pub mod filter;
pub mod records;

// Re-export commonly used types
pub use config::{ColumnConfig, Config, ConfigLoader, ConfigValidator, PolicyConfig};
pub use error::{ConfigurationError, ParseError, QaError, Result};
pub use filter::{
    CandidateReport, NetworkSet, PortSet, ProtectedZone, ReferenceRuleSet, RuleRecord,
    RuleValidator, RunSummary, Verdict, VerdictTag,
};
pub use records::{
    ConsoleSink, MemorySink, RawRecord, RecordSource, TomlRecordSource, TomlReportSink,
    VerdictSink,
};
