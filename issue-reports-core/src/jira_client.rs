use crate::search::{CountQuery, IssueSearch};
use issue_reports_common::{IssueReportError, Result, SourceConfig};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Counts issues through the tracker's REST search endpoint.
#[derive(Debug, Clone)]
pub struct JiraSearchClient {
    base_url: String,
    credentials: Option<(String, String)>,
    client: Client,
}

impl JiraSearchClient {
    pub fn new(base_url: &str, credentials: Option<(String, String)>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IssueReportError::Other(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            credentials,
            client,
        })
    }

    /// builds a client from `[source]`; the token is read from the configured env var
    pub fn from_config(cfg: &SourceConfig) -> Result<Self> {
        let base_url = cfg
            .base_url
            .as_deref()
            .ok_or_else(|| IssueReportError::Config("source.base_url is not set".into()))?;
        let credentials = match &cfg.username {
            Some(user) => {
                let token = std::env::var(&cfg.token_env).map_err(|_| {
                    IssueReportError::Auth(format!("${} is not set for user {user}", cfg.token_env))
                })?;
                Some((user.clone(), token))
            }
            None => None,
        };
        Self::new(base_url, credentials, Duration::from_secs(cfg.timeout_secs))
    }

    pub fn search_url(&self) -> String {
        format!("{}/rest/api/2/search", self.base_url)
    }

    pub fn project_url(&self, project_id: i64) -> String {
        format!("{}/rest/api/2/project/{project_id}", self.base_url)
    }

    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let mut req = self.client.get(url).query(query);
        if let Some((user, token)) = &self.credentials {
            req = req.basic_auth(user, Some(token));
        }
        let resp = req.send().map_err(|e| IssueReportError::Search(e.to_string()))?;
        check_status(resp.status(), url)?;
        resp.json::<Value>().map_err(|e| IssueReportError::Search(e.to_string()))
    }
}

/// 401/403 are credential problems, any other failure is a search error
pub fn check_status(status: StatusCode, url: &str) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(IssueReportError::Auth(format!("tracker returned HTTP {status} for {url}")));
    }
    if !status.is_success() {
        return Err(IssueReportError::Search(format!("tracker returned HTTP {status} for {url}")));
    }
    Ok(())
}

/// reads `total` from a search response
pub fn parse_search_total(body: &Value) -> Result<i64> {
    body.get("total")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| IssueReportError::Search("search response is missing 'total'".into()))
}

/// reads `name` from a project response
pub fn parse_project_name(body: &Value) -> Result<String> {
    body.get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_owned())
        .ok_or_else(|| IssueReportError::Search("project response is missing 'name'".into()))
}

impl IssueSearch for JiraSearchClient {
    fn count(&self, query: &CountQuery) -> Result<i64> {
        let jql = query.to_jql();
        tracing::debug!(%jql, "searching");
        // maxResults=0: only the total is needed
        let body = self.get_json(&self.search_url(), &[("jql", jql.as_str()), ("maxResults", "0")])?;
        parse_search_total(&body)
    }

    fn project_name(&self, project_id: i64) -> Result<String> {
        let body = self.get_json(&self.project_url(project_id), &[])?;
        parse_project_name(&body)
    }
}
