//! Result sinks that receive one report per candidate row

use crate::error::{QaError, Result};
use crate::filter::policy::CandidateReport;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Receives verdict reports in candidate order
pub trait VerdictSink {
    /// Accept the report for one candidate row
    fn record(&mut self, report: &CandidateReport);

    /// Flush recorded reports to persistence
    fn flush(&mut self) -> Result<()>;
}

/// Prints one line per report to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl VerdictSink for ConsoleSink {
    fn record(&mut self, report: &CandidateReport) {
        println!("{}", report);
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }
}

/// Keeps reports in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Vec<CandidateReport>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[CandidateReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<CandidateReport> {
        self.reports
    }
}

impl VerdictSink for MemorySink {
    fn record(&mut self, report: &CandidateReport) {
        self.reports.push(report.clone());
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct ReportFile<'a> {
    generated_at: String,
    #[serde(rename = "verdict")]
    verdicts: &'a [CandidateReport],
}

/// Collects reports and writes them as a TOML document on flush
#[derive(Debug)]
pub struct TomlReportSink {
    path: PathBuf,
    reports: Vec<CandidateReport>,
}

impl TomlReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reports: Vec::new(),
        }
    }

    /// Render the collected reports
    pub fn render(&self) -> Result<String> {
        let file = ReportFile {
            generated_at: Utc::now().to_rfc3339(),
            verdicts: &self.reports,
        };
        Ok(toml::to_string_pretty(&file)?)
    }
}

impl VerdictSink for TomlReportSink {
    fn record(&mut self, report: &CandidateReport) {
        self.reports.push(report.clone());
    }

    fn flush(&mut self) -> Result<()> {
        let content = self.render()?;
        fs::write(&self.path, content).map_err(|source| QaError::ReportWrite {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!("Wrote {} verdicts to {:?}", self.reports.len(), self.path);
        Ok(())
    }
}

/// Forwards every report to each inner sink
impl VerdictSink for Vec<Box<dyn VerdictSink>> {
    fn record(&mut self, report: &CandidateReport) {
        for sink in self.iter_mut() {
            sink.record(report);
        }
    }

    fn flush(&mut self) -> Result<()> {
        for sink in self.iter_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}
