pub mod created_vs_resolved;
pub mod creation_report;
pub mod export;
pub mod histogram;
pub mod jira_client;
pub mod local_store;
pub mod params;
pub mod search;

pub use issue_reports_common::{IssueReportError, Result, ValidationErrors};
pub use created_vs_resolved::{CreatedVsResolvedParams, CreatedVsResolvedReport, CreatedVsResolvedView, Period, PeriodCounts};
pub use creation_report::{CreationParams, CreationReport, CreationReportView};
pub use export::{export_csv, export_json, print_created_vs_resolved_summary, print_creation_summary, write_created_vs_resolved_summary, write_creation_summary};
pub use histogram::{build_histogram, Bucket, HistogramResult, MAX_HEIGHT};
pub use jira_client::JiraSearchClient;
pub use local_store::{IssueRecord, LocalIssueStore, ProjectRecord};
pub use params::RawParams;
pub use search::{CountQuery, IssueField, IssueSearch, SearchScope};
