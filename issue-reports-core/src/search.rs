use chrono::{DateTime, Utc};
use issue_reports_common::{IssueReportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a count is restricted to: a project or a saved filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum SearchScope {
    Project(i64),
    Filter(i64),
}

impl FromStr for SearchScope {
    type Err = IssueReportError;

    /// accepts `project-<id>`, `filter-<id>`, or a bare project id
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parse_id = |raw: &str| {
            raw.parse::<i64>()
                .map_err(|_| IssueReportError::Other(format!("invalid project or filter id: {s}")))
        };
        if let Some(rest) = s.strip_prefix("project-") {
            Ok(SearchScope::Project(parse_id(rest)?))
        } else if let Some(rest) = s.strip_prefix("filter-") {
            Ok(SearchScope::Filter(parse_id(rest)?))
        } else {
            Ok(SearchScope::Project(parse_id(s)?))
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchScope::Project(id) => write!(f, "project-{id}"),
            SearchScope::Filter(id) => write!(f, "filter-{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueField {
    Created,
    Resolved,
}

impl IssueField {
    pub fn jql_name(self) -> &'static str {
        match self {
            IssueField::Created => "created",
            IssueField::Resolved => "resolved",
        }
    }
}

/// Issues in `scope` whose `field` timestamp lies in `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountQuery {
    pub scope: SearchScope,
    pub field: IssueField,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

const JQL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

impl CountQuery {
    pub fn created(scope: SearchScope, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { scope, field: IssueField::Created, start, end }
    }

    pub fn resolved(scope: SearchScope, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { scope, field: IssueField::Resolved, start, end }
    }

    pub fn to_jql(&self) -> String {
        let scope = match self.scope {
            SearchScope::Project(id) => format!("project = {id}"),
            SearchScope::Filter(id) => format!("filter = {id}"),
        };
        let field = self.field.jql_name();
        format!(
            "{scope} AND {field} >= \"{}\" AND {field} < \"{}\"",
            self.start.format(JQL_DATE_FORMAT),
            self.end.format(JQL_DATE_FORMAT),
        )
    }
}

/// Counting service the reports query; one call per bucket.
pub trait IssueSearch {
    fn count(&self, query: &CountQuery) -> Result<i64>;
    fn project_name(&self, project_id: i64) -> Result<String>;
}

impl<T: IssueSearch + ?Sized> IssueSearch for &T {
    fn count(&self, query: &CountQuery) -> Result<i64> {
        (**self).count(query)
    }
    fn project_name(&self, project_id: i64) -> Result<String> {
        (**self).project_name(project_id)
    }
}

impl<T: IssueSearch + ?Sized> IssueSearch for Box<T> {
    fn count(&self, query: &CountQuery) -> Result<i64> {
        (**self).count(query)
    }
    fn project_name(&self, project_id: i64) -> Result<String> {
        (**self).project_name(project_id)
    }
}
