use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use issue_reports_common::Config;
use issue_reports_core::{
    export_csv, export_json, print_created_vs_resolved_summary, print_creation_summary,
    CreatedVsResolvedReport, CreationReport, IssueSearch, JiraSearchClient, LocalIssueStore,
    RawParams,
};
use issue_reports_core::params;
use std::path::{Path, PathBuf};
use tracing::metadata::LevelFilter;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
        .into()
    }
}

fn level_from_config(name: &str) -> LogLevel {
    LogLevel::from_str(name, true).unwrap_or(LogLevel::Info)
}

#[derive(Parser)]
#[command(name = "issue-reports", version, about = "Issue creation and created-vs-resolved reports")]
struct Cli {
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// text, json or csv (csv: creation report only)
    #[arg(long)]
    format: Option<String>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// JSON issue file used instead of the configured tracker
    #[arg(long)]
    source: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Issues created per interval for one project
    Creation {
        #[arg(long)] project: String,
        #[arg(long)] start: String,
        #[arg(long)] end: String,
        #[arg(long)] interval: Option<String>,
        #[command(flatten)] out: OutputArgs,
    },
    /// Created and resolved issues per period over the last days
    CreatedVsResolved {
        #[arg(long)] scope: String,
        #[arg(long)] period: Option<String>,
        #[arg(long)] days: Option<String>,
        #[arg(long)] cumulative: bool,
        #[arg(long)] unresolved_trend: bool,
        /// end of the window (RFC 3339), defaults to now
        #[arg(long)] now: Option<String>,
        #[command(flatten)] out: OutputArgs,
    },
    /// Write a default config file
    InitConfig {
        #[arg(long)] force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();
    let level = cli.log_level.unwrap_or_else(|| level_from_config(&config.logging.level));
    // logs on stderr, reports on stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Creation { project, start, end, interval, out } => {
            let raw = creation_params(project, start, end, interval, &config);
            run_creation(raw, out, &config)?
        }
        Commands::CreatedVsResolved { scope, period, days, cumulative, unresolved_trend, now, out } => {
            let mut raw = RawParams::new();
            raw.insert(params::PROJECT_OR_FILTER_ID.into(), scope);
            if let Some(p) = period {
                raw.insert(params::PERIOD_NAME.into(), p);
            }
            if let Some(d) = days {
                raw.insert(params::DAYS_PREVIOUS.into(), d);
            }
            raw.insert(params::CUMULATIVE.into(), cumulative.to_string());
            raw.insert(params::SHOW_UNRESOLVED_TREND.into(), unresolved_trend.to_string());
            let now = match now {
                Some(s) => DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc),
                None => Utc::now(),
            };
            run_created_vs_resolved(raw, now, out, &config)?
        }
        Commands::InitConfig { force } => run_init_config(&config, force)?,
    }
    Ok(())
}

fn open_search(source: Option<&Path>, config: &Config) -> anyhow::Result<Box<dyn IssueSearch>> {
    let file = source
        .map(Path::to_path_buf)
        .or_else(|| config.source.issues_file.as_ref().map(PathBuf::from));
    if let Some(path) = file {
        tracing::info!(path = %path.display(), "counting from issue file");
        return Ok(Box::new(LocalIssueStore::open(&path)?));
    }
    if config.source.base_url.is_some() {
        return Ok(Box::new(JiraSearchClient::from_config(&config.source)?));
    }
    anyhow::bail!("no issue source: pass --source <issues.json> or set source.base_url in {}", Config::config_path().display())
}

/// Form map for the creation report; an omitted `--interval` takes `report.default_interval_days`.
fn creation_params(project: String, start: String, end: String, interval: Option<String>, config: &Config) -> RawParams {
    let mut raw = RawParams::new();
    raw.insert(params::PROJECT_ID.into(), project);
    raw.insert(params::START_DATE.into(), start);
    raw.insert(params::END_DATE.into(), end);
    let interval = interval.unwrap_or_else(|| config.report.default_interval_days.to_string());
    raw.insert(params::INTERVAL.into(), interval);
    raw
}

fn output_format(out: &OutputArgs, config: &Config) -> String {
    out.format.clone().unwrap_or_else(|| config.export.format.clone())
}

fn output_path(out: &OutputArgs, config: &Config, default_name: &str) -> anyhow::Result<PathBuf> {
    let path = match &out.output {
        Some(p) => p.clone(),
        None => Path::new(&config.export.output_dir).join(default_name),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() { std::fs::create_dir_all(parent)?; }
    }
    Ok(path)
}

fn run_creation(raw: RawParams, out: OutputArgs, config: &Config) -> anyhow::Result<()> {
    let search = open_search(out.source.as_deref(), config)?;
    let report = CreationReport::new(search, config.report.clone());
    report.validate(&raw).into_result()?;
    let view = report.generate(&raw)?;
    match output_format(&out, config).as_str() {
        "text" => print_creation_summary(&view)?,
        "json" => {
            let path = output_path(&out, config, "creation-report.json")?;
            export_json(&path, &view)?;
            println!("Exported to {}", path.display());
        }
        "csv" => {
            let path = output_path(&out, config, "creation-report.csv")?;
            export_csv(&path, &view)?;
            println!("Exported to {}", path.display());
        }
        other => anyhow::bail!("Unknown format: {other} (use text, json or csv)"),
    }
    Ok(())
}

fn run_created_vs_resolved(raw: RawParams, now: DateTime<Utc>, out: OutputArgs, config: &Config) -> anyhow::Result<()> {
    let search = open_search(out.source.as_deref(), config)?;
    let report = CreatedVsResolvedReport::new(search, config.chart.clone());
    report.validate(&raw).into_result()?;
    let view = report.generate(&raw, now)?;
    match output_format(&out, config).as_str() {
        "text" => print_created_vs_resolved_summary(&view)?,
        "json" => {
            let path = output_path(&out, config, "created-vs-resolved.json")?;
            export_json(&path, &view)?;
            println!("Exported to {}", path.display());
        }
        other => anyhow::bail!("Unknown format: {other} (use text or json)"),
    }
    Ok(())
}

fn run_init_config(config: &Config, force: bool) -> anyhow::Result<()> {
    let path = Config::config_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.save()?;
    println!("Config written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_level_names() {
        assert!(level_from_config("debug") == LogLevel::Debug);
        assert!(level_from_config("WARN") == LogLevel::Warn);
        assert!(level_from_config("chatty") == LogLevel::Info);
    }

    #[test]
    fn cli_parses_creation() {
        let cli = Cli::try_parse_from([
            "issue-reports", "creation", "--project", "10000", "--start", "2024-01-01",
            "--end", "2024-01-10", "--interval", "3", "--format", "csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Creation { project, interval, out, .. } => {
                assert_eq!(project, "10000");
                assert_eq!(interval.as_deref(), Some("3"));
                assert_eq!(out.format.as_deref(), Some("csv"));
            }
            _ => panic!("expected creation"),
        }
    }

    #[test]
    fn omitted_interval_uses_configured_default() {
        let mut config = Config::default();
        config.report.default_interval_days = 14;
        let raw = creation_params("10000".into(), "2024-01-01".into(), "2024-01-10".into(), None, &config);
        assert_eq!(raw.get(params::INTERVAL).map(String::as_str), Some("14"));
        let raw = creation_params("10000".into(), "2024-01-01".into(), "2024-01-10".into(), Some("3".into()), &config);
        assert_eq!(raw.get(params::INTERVAL).map(String::as_str), Some("3"));
    }

    #[test]
    fn creation_without_interval_passes_validation() {
        let cli = Cli::try_parse_from([
            "issue-reports", "creation", "--project", "10000", "--start", "2024-01-01", "--end", "2024-01-10",
        ])
        .unwrap();
        let Commands::Creation { project, start, end, interval, .. } = cli.command else {
            panic!("expected creation");
        };
        let config = Config::default();
        let raw = creation_params(project, start, end, interval, &config);
        let report = CreationReport::new(LocalIssueStore::default(), config.report.clone());
        assert!(report.validate(&raw).into_result().is_ok());
        assert_eq!(report.parse_params(&raw).unwrap().interval, 7);
    }

    #[test]
    fn missing_source_is_reported() {
        let err = open_search(None, &Config::default()).err().unwrap();
        assert!(err.to_string().contains("no issue source"));
    }
}
