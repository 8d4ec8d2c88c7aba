//! Raw rule records and the sources that load them

pub mod sink;

use crate::error::{QaError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub use sink::{ConsoleSink, MemorySink, TomlReportSink, VerdictSink};

/// One row of a rule sheet: column name to cell text, in column order
pub type RawRecord = IndexMap<String, String>;

/// Anything that can hand over a batch of raw records
pub trait RecordSource {
    fn load(&self) -> Result<Vec<RawRecord>>;
}

/// Rule sheet stored as a TOML file of `[[rule]]` tables
#[derive(Debug, Clone)]
pub struct TomlRecordSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RecordFile {
    #[serde(default, rename = "rule")]
    rules: Vec<IndexMap<String, toml::Value>>,
}

impl TomlRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse records from TOML text
    pub fn parse_str(contents: &str) -> std::result::Result<Vec<RawRecord>, toml::de::Error> {
        let file: RecordFile = toml::from_str(contents)?;
        Ok(file
            .rules
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(column, value)| (column, cell_text(value)))
                    .collect()
            })
            .collect())
    }
}

impl RecordSource for TomlRecordSource {
    fn load(&self) -> Result<Vec<RawRecord>> {
        let contents = fs::read_to_string(&self.path).map_err(|source| QaError::RecordLoad {
            path: self.path.clone(),
            source,
        })?;

        let records = Self::parse_str(&contents).map_err(|source| QaError::RecordParse {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("Loaded {} records from {:?}", records.len(), self.path);
        Ok(records)
    }
}

/// Spreadsheet cells may hold numbers; keep their literal text
fn cell_text(value: toml::Value) -> String {
    match value {
        toml::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_records() {
        let records = TomlRecordSource::parse_str(
            r#"
[[rule]]
SerialNo = 17
"Source IP" = "10.0.0.0/16"
"Destination IP" = "10.1.0.0/16"
Protocol = "TCP"
Port = 443

[[rule]]
SerialNo = "FW-18"
"Source IP" = "10.0.0.0/16"
"Destination IP" = "10.1.0.0/16"
Protocol = "tcp"
Port = "22,8000-8002"
"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["SerialNo"], "17");
        assert_eq!(records[0]["Port"], "443");
        assert_eq!(records[1]["Port"], "22,8000-8002");

        let columns: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec!["SerialNo", "Source IP", "Destination IP", "Protocol", "Port"]
        );
    }

    #[test]
    fn test_parse_empty_file() {
        let records = TomlRecordSource::parse_str("").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[rule]]
"Source IP" = "192.168.1.10"
"#
        )
        .unwrap();

        let records = TomlRecordSource::new(file.path()).load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Source IP"], "192.168.1.10");
    }

    #[test]
    fn test_load_missing_file() {
        let err = TomlRecordSource::new("/nonexistent/rules.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, QaError::RecordLoad { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rule = 5").unwrap();

        let err = TomlRecordSource::new(file.path()).load().unwrap_err();
        assert!(matches!(err, QaError::RecordParse { .. }));
    }
}
