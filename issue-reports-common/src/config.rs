use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_interval_days")]
    pub default_interval_days: i64,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>, // chrono formats, tried in order
}

fn default_interval_days() -> i64 {
    7
}
fn default_date_formats() -> Vec<String> {
    vec!["%Y-%m-%d".into(), "%d/%b/%y".into()]
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_interval_days: default_interval_days(),
            date_formats: default_date_formats(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_days_previous")]
    pub default_days_previous: i64,
    #[serde(default = "default_period")]
    pub default_period: String,
}

fn default_days_previous() -> i64 {
    30
}
fn default_period() -> String {
    "daily".into()
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_days_previous: default_days_previous(),
            default_period: default_period(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub issues_file: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_token_env() -> String {
    "ISSUE_REPORTS_TOKEN".into()
}
fn default_timeout() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            issues_file: None,
            base_url: None,
            username: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_format() -> String {
    "text".into()
}
fn default_output_dir() -> String {
    ".".into()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("issue-reports")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("ISSUE_REPORTS_CONFIG") {
            PathBuf::from(env_path) // $ISSUE_REPORTS_CONFIG overrides default config path
        } else {
            Self::config_path()
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let cfg: Self =
            toml::from_str(&content).map_err(|e| crate::IssueReportError::Config(e.to_string()))?;
        Ok(cfg)
    }

    pub fn save(&self) -> crate::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::IssueReportError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
