use crate::tracker::{GithubSettings, normalize_base};
use anyhow::{Context, Result, anyhow};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const API_VERSION: &str = "2022-11-28";

/// Records requested per page; GitHub caps `per_page` at 100.
pub const PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    pub comments_url: String,
    #[serde(default)]
    pub assignee: Option<Account>,
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Present when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    #[must_use]
    pub const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    pub comments_url: String,
    #[serde(default)]
    pub assignee: Option<Account>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Signature {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    #[serde(default)]
    pub author: Option<Signature>,
    #[serde(default)]
    pub committer: Option<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub url: String,
    pub commit: CommitDetail,
    /// GitHub account of the author; absent when the email is not linked to one.
    #[serde(default)]
    pub author: Option<Account>,
    #[serde(default)]
    pub committer: Option<Account>,
}

impl Commit {
    /// Author login, falling back to the git signature name.
    #[must_use]
    pub fn author_name(&self) -> Option<&str> {
        self.author
            .as_ref()
            .map(|a| a.login.as_str())
            .or_else(|| self.commit.author.as_ref().map(|s| s.name.as_str()))
    }

    #[must_use]
    pub fn committer_name(&self) -> Option<&str> {
        self.committer
            .as_ref()
            .map(|a| a.login.as_str())
            .or_else(|| self.commit.committer.as_ref().map(|s| s.name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub clone_url: String,
    pub commits_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub watchers_count: u64,
}

/// `state` filter accepted by the issues and pulls endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Open,
    Closed,
    All,
}

impl State {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// Read-only GitHub queries used by the collectors.
pub trait GithubApi: Send + Sync {
    /// Issues of the configured repository; the endpoint also returns pull requests.
    fn issues(&self, state: State) -> BoxStream<'_, Result<Issue>>;

    fn pulls(&self, state: State) -> BoxStream<'_, Result<PullRequest>>;

    fn commits(&self) -> BoxStream<'_, Result<Commit>>;

    /// Repositories of the authenticated user.
    fn repos(&self) -> BoxStream<'_, Result<Repository>>;
}

/// HTTP client for the GitHub REST API.
#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    api: Url,
    token: SecretString,
    repo: String,
    next_link: Regex,
}

impl GithubClient {
    /// # Errors
    ///
    /// Returns an error if the repository is not in `owner/name` form or the
    /// HTTP client cannot be built
    pub fn new(settings: &GithubSettings, timeout: Duration) -> Result<Self> {
        let repo = settings.repo.trim().trim_matches('/').to_string();
        match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => {
                return Err(anyhow!(
                    "Invalid GitHub repository '{}'. Expected owner/name",
                    settings.repo
                ));
            }
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            http,
            api: normalize_base(settings.api_url.clone()),
            token: settings.token.clone(),
            repo,
            next_link: Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#)?,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .api
            .join(path)
            .with_context(|| format!("invalid GitHub endpoint {path}"))?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("per_page", &PER_PAGE.to_string());
        Ok(url)
    }

    fn repo_endpoint(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url> {
        self.endpoint(&format!("repos/{}/{resource}", self.repo), params)
    }

    /// URL of the next page advertised in a `Link` header.
    fn next_page(&self, headers: &HeaderMap) -> Option<Url> {
        let link = headers.get(LINK)?.to_str().ok()?;
        let captures = self.next_link.captures(link)?;
        Url::parse(captures.get(1)?.as_str()).ok()
    }

    #[instrument(skip_all, level = "debug", err, fields(otel.kind = "client", http.url = %url))]
    async fn page<T: DeserializeOwned>(&self, url: Url) -> Result<(Vec<T>, Option<Url>)> {
        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(AUTHORIZATION, format!("Bearer {}", self.token.expose_secret()))
            .send()
            .await
            .with_context(|| format!("GitHub request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GitHub returned {status} for {url}"));
        }

        let next = self.next_page(response.headers());
        let items: Vec<T> = response
            .json()
            .await
            .with_context(|| format!("invalid JSON from {url}"))?;

        debug!(records = items.len(), has_next = next.is_some(), "fetched GitHub page");

        Ok((items, next))
    }

    /// Stream every record of a paged collection, following `Link: rel="next"`.
    fn paginate<'a, T>(&'a self, first: Result<Url>) -> BoxStream<'a, Result<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let first = match first {
            Ok(url) => url,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        stream::try_unfold(Some(first), move |next| async move {
            let Some(url) = next else {
                return Ok(None);
            };
            let page: Result<(Vec<T>, Option<Url>)> = self.page(url).await;
            page.map(|(items, next)| Some((items, next)))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, anyhow::Error>)))
        .try_flatten()
        .boxed()
    }
}

impl GithubApi for GithubClient {
    fn issues(&self, state: State) -> BoxStream<'_, Result<Issue>> {
        self.paginate(self.repo_endpoint("issues", &[("state", state.as_str())]))
    }

    fn pulls(&self, state: State) -> BoxStream<'_, Result<PullRequest>> {
        self.paginate(self.repo_endpoint("pulls", &[("state", state.as_str())]))
    }

    fn commits(&self) -> BoxStream<'_, Result<Commit>> {
        self.paginate(self.repo_endpoint("commits", &[]))
    }

    fn repos(&self) -> BoxStream<'_, Result<Repository>> {
        self.paginate(self.endpoint("user/repos", &[]))
    }
}
