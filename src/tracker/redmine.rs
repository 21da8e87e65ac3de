use crate::tracker::{RedmineSettings, normalize_base};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use futures::{
    future::BoxFuture,
    stream::{self, BoxStream, StreamExt, TryStreamExt},
};
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const API_KEY_HEADER: &str = "X-Redmine-API-Key";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Records requested per page; Redmine caps `limit` at 100.
pub const PAGE_SIZE: u64 = 100;

/// Redmine status id for active users.
const USER_STATUS_ACTIVE: &str = "1";

/// A `{id, name}` reference as embedded in Redmine records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub project: NamedRef,
    pub tracker: NamedRef,
    pub status: NamedRef,
    pub priority: NamedRef,
    pub author: NamedRef,
    /// Absent for unassigned issues.
    #[serde(default)]
    pub assigned_to: Option<NamedRef>,
    #[serde(default)]
    pub subject: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub due_date: Option<String>,
}

impl Issue {
    #[must_use]
    pub fn assignee_name(&self) -> Option<&str> {
        self.assigned_to.as_ref().map(|user| user.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    pub project: NamedRef,
    #[serde(default)]
    pub issue: Option<IdRef>,
    pub user: NamedRef,
    pub activity: NamedRef,
    pub hours: f64,
    /// `YYYY-MM-DD`
    pub spent_on: String,
}

/// Filters for `issues.json`.
///
/// `status_id` takes Redmine's short filter syntax: `open`, `closed`, `*` or a
/// status id. `due_date` accepts operators such as `*` (any date set).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    pub status_id: Option<String>,
    pub project_id: Option<u64>,
    pub due_date: Option<String>,
}

impl IssueQuery {
    #[must_use]
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status_id: Some(status.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn project(mut self, project_id: u64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    #[must_use]
    pub fn due_date(mut self, filter: impl Into<String>) -> Self {
        self.due_date = Some(filter.into());
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = &self.status_id {
            params.push(("status_id", status.clone()));
        }
        if let Some(project) = self.project_id {
            params.push(("project_id", project.to_string()));
        }
        if let Some(due) = &self.due_date {
            params.push(("due_date", due.clone()));
        }
        params
    }
}

/// Time entries with `spent_on` in `from..=to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEntryQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl TimeEntryQuery {
    fn params(self) -> Vec<(&'static str, String)> {
        vec![("from", self.from.to_string()), ("to", self.to.to_string())]
    }
}

/// Read-only Redmine queries used by the collectors.
pub trait RedmineApi: Send + Sync {
    fn issues(&self, query: IssueQuery) -> BoxStream<'_, Result<Issue>>;

    /// Number of issues matching `query`.
    fn count_issues(&self, query: IssueQuery) -> BoxFuture<'_, Result<u64>>;

    fn projects(&self) -> BoxStream<'_, Result<Project>>;

    fn count_active_users(&self) -> BoxFuture<'_, Result<u64>>;

    fn time_entries(&self, query: TimeEntryQuery) -> BoxStream<'_, Result<TimeEntry>>;
}

/// HTTP client for the Redmine JSON API.
#[derive(Clone, Debug)]
pub struct RedmineClient {
    http: reqwest::Client,
    base: Url,
    api_key: Option<SecretString>,
    page_size: u64,
}

impl RedmineClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(settings: &RedmineSettings, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build Redmine HTTP client")?;

        Ok(Self {
            http,
            base: normalize_base(settings.url.clone()),
            api_key: settings.api_key.clone(),
            page_size: PAGE_SIZE,
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base
            .join(path)
            .with_context(|| format!("invalid Redmine endpoint {path}"))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    #[instrument(skip_all, level = "debug", err, fields(otel.kind = "client", http.url = %url))]
    async fn get_json(&self, url: Url) -> Result<Value> {
        let mut request = self.http.get(url.clone()).header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.expose_secret());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Redmine request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Redmine returned {status} for {url}"));
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("invalid JSON from {url}"))
    }

    async fn page<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        params: &[(&'static str, String)],
        offset: u64,
    ) -> Result<Page<T>> {
        let mut page_params = params.to_vec();
        page_params.push(("offset", offset.to_string()));
        page_params.push(("limit", self.page_size.to_string()));

        let body = self.get_json(self.endpoint(path, &page_params)?).await?;
        let page = Page::from_body(body, key)?;

        debug!(path, offset, records = page.items.len(), "fetched Redmine page");

        Ok(page)
    }

    /// Stream every record of a paged collection, one page at a time.
    fn paginate<'a, T>(
        &'a self,
        path: &'static str,
        key: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> BoxStream<'a, Result<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let limit = self.page_size;

        stream::try_unfold(Some(0_u64), move |offset| {
            let params = params.clone();
            async move {
                let Some(offset) = offset else {
                    return Ok(None);
                };
                let page: Result<Page<T>> = self.page(path, key, &params, offset).await;
                page.map(|page| {
                    let next = page.next_offset(offset, limit);
                    Some((page.items, next))
                })
            }
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, anyhow::Error>)))
        .try_flatten()
        .boxed()
    }

    async fn total_count(&self, path: &str, mut params: Vec<(&'static str, String)>) -> Result<u64> {
        params.push(("limit", "1".to_string()));
        let body = self.get_json(self.endpoint(path, &params)?).await?;
        body.get("total_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("Redmine response for {path} has no total_count"))
    }
}

impl RedmineApi for RedmineClient {
    fn issues(&self, query: IssueQuery) -> BoxStream<'_, Result<Issue>> {
        self.paginate("issues.json", "issues", query.params())
    }

    fn count_issues(&self, query: IssueQuery) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move { self.total_count("issues.json", query.params()).await })
    }

    fn projects(&self) -> BoxStream<'_, Result<Project>> {
        self.paginate("projects.json", "projects", Vec::new())
    }

    fn count_active_users(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            self.total_count("users.json", vec![("status", USER_STATUS_ACTIVE.to_string())])
                .await
        })
    }

    fn time_entries(&self, query: TimeEntryQuery) -> BoxStream<'_, Result<TimeEntry>> {
        self.paginate("time_entries.json", "time_entries", query.params())
    }
}

/// One page of a Redmine collection response.
struct Page<T> {
    items: Vec<T>,
    total_count: Option<u64>,
}

impl<T: DeserializeOwned> Page<T> {
    fn from_body(mut body: Value, key: &str) -> Result<Self> {
        let items = body
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| anyhow!("missing '{key}' in Redmine response"))?;
        let items: Vec<T> = serde_json::from_value(items)
            .with_context(|| format!("failed to decode Redmine {key}"))?;
        let total_count = body.get("total_count").and_then(Value::as_u64);

        Ok(Self { items, total_count })
    }
}

impl<T> Page<T> {
    /// Offset of the following page, or `None` once the collection is exhausted.
    fn next_offset(&self, offset: u64, limit: u64) -> Option<u64> {
        if self.items.is_empty() {
            return None;
        }

        let received = self.items.len() as u64;
        let fetched = offset + received;

        match self.total_count {
            Some(total) => (fetched < total).then_some(fetched),
            None => (received >= limit).then_some(fetched),
        }
    }
}
