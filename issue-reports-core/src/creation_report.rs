use crate::histogram::{build_histogram, HistogramResult, MAX_HEIGHT};
use crate::params::{self, RawParams};
use crate::search::{CountQuery, IssueSearch, SearchScope};
use chrono::{DateTime, Utc};
use issue_reports_common::{IssueReportError, ReportConfig, Result, ValidationErrors};
use serde::{Deserialize, Serialize};

pub const MSG_START_REQUIRED: &str = "A valid start date is required.";
pub const MSG_END_REQUIRED: &str = "A valid end date is required.";
pub const MSG_INTERVAL_INVALID: &str = "The interval must be a positive number of days.";
pub const MSG_PROJECT_INVALID: &str = "A valid project must be selected.";
pub const MSG_END_BEFORE_START: &str = "The end date must not be before the start date.";
pub const MSG_REPORT_ERROR: &str = "An error occurred while generating the issue creation report.";

/// Everything a renderer needs to draw the histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationReportView {
    pub project_id: i64,
    pub project_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub interval: i64,
    pub open_count: Vec<i64>,
    pub normalised_count: Vec<i64>,
    pub dates: Vec<DateTime<Utc>>,
    pub max_count: i64,
    pub max_height: i64,
    pub errors: Vec<String>,
}

impl CreationReportView {
    /// heights to draw per bucket, raw counts when they needed no scaling
    pub fn bar_heights(&self) -> Vec<i64> {
        if self.max_count == MAX_HEIGHT { self.open_count.clone() } else { self.normalised_count.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationParams {
    pub project_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: i64,
}

/// Issue creation histogram for one project.
pub struct CreationReport<S> {
    search: S,
    config: ReportConfig,
}

impl<S: IssueSearch> CreationReport<S> {
    pub fn new(search: S, config: ReportConfig) -> Self {
        Self { search, config }
    }

    /// Field-level problems with a form submission; empty when it can be run.
    pub fn validate(&self, raw: &RawParams) -> ValidationErrors {
        let formats = &self.config.date_formats;
        let mut errs = ValidationErrors::new();
        let start = params::get_date(raw, params::START_DATE, formats);
        let end = params::get_date(raw, params::END_DATE, formats);
        if start.is_none() {
            errs.add(params::START_DATE, MSG_START_REQUIRED);
        }
        if end.is_none() {
            errs.add(params::END_DATE, MSG_END_REQUIRED);
        }
        if !params::get_long(raw, params::INTERVAL).is_some_and(|i| i > 0) {
            errs.add(params::INTERVAL, MSG_INTERVAL_INVALID);
        }
        if params::get_long(raw, params::PROJECT_ID).is_none() {
            errs.add(params::PROJECT_ID, MSG_PROJECT_INVALID);
        }
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                errs.add(params::END_DATE, MSG_END_BEFORE_START);
            }
        }
        errs
    }

    /// Reads the parameters for a run. A bad interval falls back to the
    /// configured default; every other problem is an `InvalidParameters` error.
    pub fn parse_params(&self, raw: &RawParams) -> Result<CreationParams> {
        let formats = &self.config.date_formats;
        let mut errs = ValidationErrors::new();
        let project_id = params::get_long(raw, params::PROJECT_ID);
        let start = params::get_date(raw, params::START_DATE, formats);
        let end = params::get_date(raw, params::END_DATE, formats);
        if project_id.is_none() {
            errs.add(params::PROJECT_ID, MSG_PROJECT_INVALID);
        }
        if start.is_none() {
            errs.add(params::START_DATE, MSG_START_REQUIRED);
        }
        if end.is_none() {
            errs.add(params::END_DATE, MSG_END_REQUIRED);
        }
        let (Some(project_id), Some(start), Some(end)) = (project_id, start, end) else {
            return Err(IssueReportError::InvalidParameters(errs));
        };
        let interval = match params::get_long(raw, params::INTERVAL) {
            Some(i) if i > 0 => i,
            other => {
                tracing::error!(
                    given = ?other,
                    default = self.config.default_interval_days,
                    "invalid interval, using the default"
                );
                self.config.default_interval_days
            }
        };
        Ok(CreationParams { project_id, start, end, interval })
    }

    pub fn generate(&self, raw: &RawParams) -> Result<CreationReportView> {
        let p = self.parse_params(raw)?;
        self.run(&p)
    }

    pub fn run(&self, p: &CreationParams) -> Result<CreationReportView> {
        let scope = SearchScope::Project(p.project_id);
        tracing::info!(%scope, start = %p.start, end = %p.end, interval = p.interval, "building creation report");
        let histogram: HistogramResult = build_histogram(p.start, p.end, p.interval, |from, to| {
            let n = self.search.count(&CountQuery::created(scope, from, to))?;
            tracing::debug!(%from, %to, count = n, "bucket");
            Ok::<_, IssueReportError>(n)
        })
        .inspect_err(|e| tracing::error!(error = %e, "issue count failed"))?;

        let mut errors = Vec::new();
        if histogram.max_count < 0 {
            tracing::error!(max_count = histogram.max_count, "negative issue count");
            errors.push(MSG_REPORT_ERROR.to_owned());
        }
        let project_name = self.search.project_name(p.project_id)?;
        Ok(CreationReportView {
            project_id: p.project_id,
            project_name,
            start_date: p.start,
            end_date: p.end,
            interval: p.interval,
            open_count: histogram.counts(),
            dates: histogram.dates(),
            normalised_count: histogram.normalized,
            max_count: histogram.max_count,
            max_height: MAX_HEIGHT,
            errors,
        })
    }
}
