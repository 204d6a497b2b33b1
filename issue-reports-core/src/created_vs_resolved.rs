use crate::params::{self, RawParams};
use crate::search::{CountQuery, IssueSearch, SearchScope};
use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, Timelike, Utc};
use issue_reports_common::{ChartConfig, IssueReportError, Result, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MSG_SCOPE_INVALID: &str = "A valid project or filter must be selected.";
pub const MSG_PERIOD_INVALID: &str = "A valid period must be selected.";
pub const MSG_DAYS_INVALID: &str = "Days previously must be a positive number.";
pub const MSG_DAYS_OUT_OF_RANGE: &str = "Days previously reaches past the earliest supported date.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl FromStr for Period {
    type Err = IssueReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Period::Hourly),
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "quarterly" => Ok(Period::Quarterly),
            "yearly" => Ok(Period::Yearly),
            other => Err(IssueReportError::Other(format!("unknown period: {other}"))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Period::Hourly => "hourly",
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    d.and_time(NaiveTime::MIN).and_utc()
}

impl Period {
    /// Start of the period containing `t`. Weeks start on Monday.
    pub fn floor(self, t: DateTime<Utc>) -> DateTime<Utc> {
        let d = t.date_naive();
        match self {
            Period::Hourly => midnight(d) + Duration::hours(t.hour() as i64),
            Period::Daily => midnight(d),
            Period::Weekly => {
                let back = Days::new(d.weekday().num_days_from_monday() as u64);
                midnight(d.checked_sub_days(back).unwrap_or(d))
            }
            Period::Monthly => midnight(d.with_day(1).unwrap_or(d)),
            Period::Quarterly => {
                let first_month = (d.month0() / 3) * 3 + 1;
                midnight(NaiveDate::from_ymd_opt(d.year(), first_month, 1).unwrap_or(d))
            }
            Period::Yearly => midnight(NaiveDate::from_ymd_opt(d.year(), 1, 1).unwrap_or(d)),
        }
    }

    /// Start of the period after the one starting at `start`.
    pub fn next(self, start: DateTime<Utc>) -> DateTime<Utc> {
        let add_months = |n| start.checked_add_months(Months::new(n)).unwrap_or(DateTime::<Utc>::MAX_UTC);
        match self {
            Period::Hourly => start + Duration::hours(1),
            Period::Daily => start + Duration::days(1),
            Period::Weekly => start + Duration::weeks(1),
            Period::Monthly => add_months(1),
            Period::Quarterly => add_months(3),
            Period::Yearly => add_months(12),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedVsResolvedParams {
    pub scope: SearchScope,
    pub period: Period,
    pub days_previous: i64,
    pub cumulative: bool,
    pub show_unresolved_trend: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCounts {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created: i64,
    pub resolved: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved_trend: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedVsResolvedView {
    pub scope: SearchScope,
    pub period: Period,
    pub days_previous: i64,
    pub cumulative: bool,
    pub show_unresolved_trend: bool,
    pub periods: Vec<PeriodCounts>,
    pub total_created: i64,
    pub total_resolved: i64,
}

/// Created and resolved issue counts per calendar period.
pub struct CreatedVsResolvedReport<S> {
    search: S,
    config: ChartConfig,
}

impl<S: IssueSearch> CreatedVsResolvedReport<S> {
    pub fn new(search: S, config: ChartConfig) -> Self {
        Self { search, config }
    }

    pub fn validate(&self, raw: &RawParams) -> ValidationErrors {
        match self.parse_params(raw) {
            Ok(_) => ValidationErrors::new(),
            Err(IssueReportError::InvalidParameters(errs)) => errs,
            Err(e) => {
                let mut errs = ValidationErrors::new();
                errs.add(params::PROJECT_OR_FILTER_ID, e.to_string());
                errs
            }
        }
    }

    pub fn parse_params(&self, raw: &RawParams) -> Result<CreatedVsResolvedParams> {
        let mut errs = ValidationErrors::new();
        let scope = params::get_str(raw, params::PROJECT_OR_FILTER_ID).and_then(|s| s.parse::<SearchScope>().ok());
        if scope.is_none() {
            errs.add(params::PROJECT_OR_FILTER_ID, MSG_SCOPE_INVALID);
        }
        let period = match params::get_str(raw, params::PERIOD_NAME) {
            Some(name) => name.parse::<Period>().ok(),
            None => self.config.default_period.parse::<Period>().ok(),
        };
        if period.is_none() {
            errs.add(params::PERIOD_NAME, MSG_PERIOD_INVALID);
        }
        let days_previous = match params::get_str(raw, params::DAYS_PREVIOUS) {
            None => Some(self.config.default_days_previous),
            Some(_) => params::get_long(raw, params::DAYS_PREVIOUS).filter(|d| *d > 0),
        };
        if days_previous.is_none() {
            errs.add(params::DAYS_PREVIOUS, MSG_DAYS_INVALID);
        }
        let (Some(scope), Some(period), Some(days_previous)) = (scope, period, days_previous) else {
            return Err(IssueReportError::InvalidParameters(errs));
        };
        Ok(CreatedVsResolvedParams {
            scope,
            period,
            days_previous,
            cumulative: params::get_bool(raw, params::CUMULATIVE),
            show_unresolved_trend: params::get_bool(raw, params::SHOW_UNRESOLVED_TREND),
        })
    }

    pub fn generate(&self, raw: &RawParams, now: DateTime<Utc>) -> Result<CreatedVsResolvedView> {
        let p = self.parse_params(raw)?;
        self.run(&p, now)
    }

    pub fn run(&self, p: &CreatedVsResolvedParams, now: DateTime<Utc>) -> Result<CreatedVsResolvedView> {
        let Some(window_start) = Duration::try_days(p.days_previous).and_then(|d| now.checked_sub_signed(d)) else {
            let mut errs = ValidationErrors::new();
            errs.add(params::DAYS_PREVIOUS, MSG_DAYS_OUT_OF_RANGE);
            return Err(IssueReportError::InvalidParameters(errs));
        };
        tracing::info!(scope = %p.scope, period = %p.period, days = p.days_previous, "building created vs resolved report");

        let mut periods = Vec::new();
        let mut cursor = p.period.floor(window_start);
        while cursor < now {
            let end = p.period.next(cursor).min(now);
            let created = self.count(CountQuery::created(p.scope, cursor, end))?;
            let resolved = self.count(CountQuery::resolved(p.scope, cursor, end))?;
            tracing::debug!(start = %cursor, %end, created, resolved, "period");
            periods.push(PeriodCounts { start: cursor, end, created, resolved, unresolved_trend: None });
            cursor = end;
        }

        let total_created: i64 = periods.iter().map(|c| c.created).sum();
        let total_resolved: i64 = periods.iter().map(|c| c.resolved).sum();
        let (mut run_created, mut run_resolved) = (0i64, 0i64);
        for c in periods.iter_mut() {
            run_created += c.created;
            run_resolved += c.resolved;
            if p.show_unresolved_trend {
                c.unresolved_trend = Some(run_created - run_resolved);
            }
            if p.cumulative {
                c.created = run_created;
                c.resolved = run_resolved;
            }
        }

        Ok(CreatedVsResolvedView {
            scope: p.scope,
            period: p.period,
            days_previous: p.days_previous,
            cumulative: p.cumulative,
            show_unresolved_trend: p.show_unresolved_trend,
            periods,
            total_created,
            total_resolved,
        })
    }

    fn count(&self, q: CountQuery) -> Result<i64> {
        self.search
            .count(&q)
            .inspect_err(|e| tracing::error!(error = %e, jql = %q.to_jql(), "issue count failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::{IssueRecord, LocalIssueStore, ProjectRecord};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> RawParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn store() -> LocalIssueStore {
        let issue = |key: &str, created, resolved| IssueRecord { key: key.into(), project_id: 1, created, resolved };
        LocalIssueStore {
            projects: vec![ProjectRecord { id: 1, key: "APP".into(), name: "Application".into() }],
            issues: vec![
                issue("APP-1", at(2024, 5, 1, 9), Some(at(2024, 5, 3, 9))),
                issue("APP-2", at(2024, 5, 2, 9), None),
                issue("APP-3", at(2024, 5, 2, 10), Some(at(2024, 5, 4, 1))),
                issue("APP-4", at(2024, 5, 4, 2), None),
            ],
        }
    }

    #[test]
    fn floors_to_period_start() {
        let t = at(2024, 5, 15, 13); // a Wednesday
        assert_eq!(Period::Hourly.floor(t), at(2024, 5, 15, 13));
        assert_eq!(Period::Daily.floor(t), at(2024, 5, 15, 0));
        assert_eq!(Period::Weekly.floor(t), at(2024, 5, 13, 0));
        assert_eq!(Period::Monthly.floor(t), at(2024, 5, 1, 0));
        assert_eq!(Period::Quarterly.floor(t), at(2024, 4, 1, 0));
        assert_eq!(Period::Yearly.floor(t), at(2024, 1, 1, 0));
    }

    #[test]
    fn next_handles_calendar_lengths() {
        assert_eq!(Period::Monthly.next(at(2024, 1, 1, 0)), at(2024, 2, 1, 0));
        assert_eq!(Period::Quarterly.next(at(2024, 10, 1, 0)), at(2025, 1, 1, 0));
        assert_eq!(Period::Yearly.next(at(2024, 1, 1, 0)), at(2025, 1, 1, 0));
        assert_eq!(Period::Weekly.next(at(2024, 5, 13, 0)), at(2024, 5, 20, 0));
    }

    #[test]
    fn period_names_round_trip_through_display() {
        for p in [Period::Hourly, Period::Daily, Period::Weekly, Period::Monthly, Period::Quarterly, Period::Yearly] {
            assert_eq!(p.to_string().parse::<Period>().unwrap(), p);
        }
        assert!("fortnightly".parse::<Period>().is_err());
    }

    #[test]
    fn daily_counts_with_aligned_and_clipped_periods() {
        let r = CreatedVsResolvedReport::new(store(), ChartConfig::default());
        let now = at(2024, 5, 4, 12);
        let view = r
            .generate(&raw(&[("projectOrFilterId", "project-1"), ("periodName", "daily"), ("daysprevious", "3")]), now)
            .unwrap();
        // window starts 2024-05-01 12:00, floored to midnight
        assert_eq!(view.periods.len(), 4);
        assert_eq!(view.periods[0].start, at(2024, 5, 1, 0));
        assert_eq!(view.periods[3].end, now);
        let created: Vec<i64> = view.periods.iter().map(|c| c.created).collect();
        let resolved: Vec<i64> = view.periods.iter().map(|c| c.resolved).collect();
        assert_eq!(created, vec![1, 2, 0, 1]);
        assert_eq!(resolved, vec![0, 0, 1, 1]);
        assert_eq!((view.total_created, view.total_resolved), (4, 2));
        assert!(view.periods.iter().all(|c| c.unresolved_trend.is_none()));
    }

    #[test]
    fn cumulative_and_unresolved_trend() {
        let r = CreatedVsResolvedReport::new(store(), ChartConfig::default());
        let params = raw(&[
            ("projectOrFilterId", "1"),
            ("periodName", "daily"),
            ("daysprevious", "3"),
            ("cumulative", "true"),
            ("showUnresolvedTrend", "TRUE"),
        ]);
        let view = r.generate(&params, at(2024, 5, 4, 12)).unwrap();
        let created: Vec<i64> = view.periods.iter().map(|c| c.created).collect();
        let trend: Vec<Option<i64>> = view.periods.iter().map(|c| c.unresolved_trend).collect();
        assert_eq!(created, vec![1, 3, 3, 4]);
        assert_eq!(trend, vec![Some(1), Some(3), Some(2), Some(2)]);
        assert_eq!(view.total_created, 4); // totals stay plain sums
    }

    #[test]
    fn defaults_from_config() {
        let r = CreatedVsResolvedReport::new(store(), ChartConfig::default());
        let p = r.parse_params(&raw(&[("projectOrFilterId", "filter-3")])).unwrap();
        assert_eq!(p.scope, SearchScope::Filter(3));
        assert_eq!(p.period, Period::Daily);
        assert_eq!(p.days_previous, 30);
        assert!(!p.cumulative && !p.show_unresolved_trend);
    }

    #[test]
    fn validation_lists_bad_fields() {
        let r = CreatedVsResolvedReport::new(store(), ChartConfig::default());
        let errs = r.validate(&raw(&[("periodName", "fortnightly"), ("daysprevious", "-4")]));
        assert!(errs.has_field("projectOrFilterId"));
        assert!(errs.has_field("periodName"));
        assert!(errs.has_field("daysprevious"));
    }

    #[test]
    fn days_previous_past_calendar_range_is_rejected() {
        let r = CreatedVsResolvedReport::new(store(), ChartConfig::default());
        for days in ["1000000000", "200000000000000", "9223372036854775807"] {
            let params = raw(&[("projectOrFilterId", "project-1"), ("daysprevious", days)]);
            assert!(r.validate(&params).is_empty());
            match r.generate(&params, at(2024, 5, 4, 0)) {
                Err(IssueReportError::InvalidParameters(errs)) => {
                    assert!(errs.has_field("daysprevious"), "days={days}");
                    assert_eq!(errs.errors[0].message, MSG_DAYS_OUT_OF_RANGE);
                }
                other => panic!("days={days}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn filter_scope_against_local_store_fails() {
        let r = CreatedVsResolvedReport::new(store(), ChartConfig::default());
        let res = r.generate(&raw(&[("projectOrFilterId", "filter-3"), ("daysprevious", "2")]), at(2024, 5, 4, 0));
        assert!(matches!(res, Err(IssueReportError::Search(_))));
    }
}
