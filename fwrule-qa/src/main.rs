use anyhow::{Context, Result};
use clap::Parser;
use fwrule_qa::error::ConfigurationError;
use fwrule_qa::{
    ConfigLoader, ConsoleSink, RawRecord, RecordSource, RuleValidator, TomlRecordSource,
    TomlReportSink, VerdictSink,
};
use std::path::PathBuf;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Parser, Debug)]
#[command(name = "fwrule-qa")]
#[command(about = "Check firewall rule requests against approved rules and protected zones")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Approved rule set (TOML file of [[rule]] tables)
    #[arg(long, short = 'r')]
    reference: Option<PathBuf>,

    /// Batch of candidate rules to check (same format as the rule set)
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with_all = ["source_ip", "destination_ip", "protocol", "destination_port"]
    )]
    candidates: Option<PathBuf>,

    /// Source networks of a single candidate (comma-separated)
    #[arg(long, alias = "source_ip", required_unless_present = "candidates")]
    source_ip: Option<String>,

    /// Destination networks of a single candidate (comma-separated)
    #[arg(long, alias = "destination_ip", required_unless_present = "candidates")]
    destination_ip: Option<String>,

    /// Protocol of a single candidate
    #[arg(long, required_unless_present = "candidates")]
    protocol: Option<String>,

    /// Destination ports of a single candidate. Comma-separated values and ranges accepted.
    #[arg(long, alias = "destination_port", required_unless_present = "candidates")]
    destination_port: Option<String>,

    /// Protected supernet (can be used multiple times; replaces the configured list)
    #[arg(long = "protected-supernet", value_name = "CIDR")]
    protected_supernets: Vec<String>,

    /// Also write a TOML report to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Enable debug logging (also enabled by `verbose = true` under [common])
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigLoader::load_with_priority(args.config.clone())
        .context("Failed to load configuration")?;

    // Initialize logging once the config can ask for debug output
    let level = log_level(args.verbose || config.common.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if !args.protected_supernets.is_empty() {
        config.zone.protected_supernets = args.protected_supernets.clone();
    }

    let reference_path = args
        .reference
        .clone()
        .or_else(|| config.reference.path.clone())
        .ok_or(ConfigurationError::MissingReference)?;

    let reference = TomlRecordSource::new(&reference_path)
        .load()
        .context("Failed to load reference rules")?;
    let validator = RuleValidator::from_config(&config, &reference)?;

    let candidates = match &args.candidates {
        Some(path) => TomlRecordSource::new(path)
            .load()
            .context("Failed to load candidate rules")?,
        None => vec![single_candidate(&args, &config.columns())],
    };

    let mut sinks: Vec<Box<dyn VerdictSink>> = vec![Box::new(ConsoleSink)];
    if let Some(path) = &args.report {
        sinks.push(Box::new(TomlReportSink::new(path)));
    }

    let summary = validator.run(&candidates, &mut sinks)?;

    std::process::exit(if summary.all_approvable() { 0 } else { 1 })
}

fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Build a candidate row from the command-line fields
fn single_candidate(args: &Args, columns: &fwrule_qa::ColumnConfig) -> RawRecord {
    let fields = [
        (&columns.source_ip, &args.source_ip),
        (&columns.destination_ip, &args.destination_ip),
        (&columns.protocol, &args.protocol),
        (&columns.port, &args.destination_port),
    ];

    fields
        .into_iter()
        .filter_map(|(column, value)| value.clone().map(|v| (column.clone(), v)))
        .collect()
}
