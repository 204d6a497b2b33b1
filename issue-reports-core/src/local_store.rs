use crate::search::{CountQuery, IssueField, IssueSearch, SearchScope};
use chrono::{DateTime, Utc};
use issue_reports_common::{IssueReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub key: String,
    pub project_id: i64,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub resolved: Option<DateTime<Utc>>,
}

/// In-memory issue set loaded from a JSON export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalIssueStore {
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
}

impl LocalIssueStore {
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            projects = store.projects.len(),
            issues = store.issues.len(),
            "loaded issue store"
        );
        Ok(store)
    }
}

impl IssueSearch for LocalIssueStore {
    fn count(&self, query: &CountQuery) -> Result<i64> {
        let SearchScope::Project(project_id) = query.scope else {
            return Err(IssueReportError::Search(format!(
                "saved filters are not available in a local issue file: {}",
                query.scope
            )));
        };
        let n = self
            .issues
            .iter()
            .filter(|i| i.project_id == project_id)
            .filter_map(|i| match query.field {
                IssueField::Created => Some(i.created),
                IssueField::Resolved => i.resolved,
            })
            .filter(|ts| *ts >= query.start && *ts < query.end)
            .count();
        Ok(n as i64)
    }

    fn project_name(&self, project_id: i64) -> Result<String> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| IssueReportError::Search(format!("unknown project id: {project_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn store() -> LocalIssueStore {
        let issue = |key: &str, project_id, created, resolved| IssueRecord {
            key: key.into(),
            project_id,
            created,
            resolved,
        };
        LocalIssueStore {
            projects: vec![ProjectRecord { id: 1, key: "APP".into(), name: "Application".into() }],
            issues: vec![
                issue("APP-1", 1, ts(1, 0), Some(ts(2, 0))),
                issue("APP-2", 1, ts(3, 23), None),
                issue("APP-3", 1, ts(4, 0), Some(ts(4, 6))),
                issue("OPS-1", 2, ts(2, 0), None),
            ],
        }
    }

    #[test]
    fn counts_created_on_half_open_window() {
        let s = store();
        let q = CountQuery::created(SearchScope::Project(1), ts(1, 0), ts(4, 0));
        assert_eq!(s.count(&q).unwrap(), 2); // APP-3 sits on the end boundary
    }

    #[test]
    fn counts_resolved_and_skips_open_issues() {
        let s = store();
        let q = CountQuery::resolved(SearchScope::Project(1), ts(1, 0), ts(5, 0));
        assert_eq!(s.count(&q).unwrap(), 2);
    }

    #[test]
    fn filter_scope_is_rejected() {
        let q = CountQuery::created(SearchScope::Filter(9), ts(1, 0), ts(5, 0));
        assert!(matches!(store().count(&q), Err(IssueReportError::Search(_))));
    }

    #[test]
    fn project_name_lookup() {
        let s = store();
        assert_eq!(s.project_name(1).unwrap(), "Application");
        assert!(s.project_name(2).is_err());
    }
}
