#![allow(dead_code)]

use anyhow::{Result, anyhow};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::LINK},
    response::IntoResponse,
    routing::get,
};
use futures::{
    StreamExt,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracker_exporter::collectors::{COLLECTOR_NAMES, config::CollectorConfig};
use tracker_exporter::tracker::{
    GithubApi, GithubSettings, RedmineApi, RedmineSettings, Sources, TrackerSettings,
    github::{self, State as IssueState},
    redmine::{self, IdRef, IssueQuery, NamedRef, TimeEntryQuery},
};
use url::Url;

/// Redmine's stock closed statuses: Closed, Rejected.
pub const CLOSED_STATUS_IDS: &[u64] = &[5, 6];

pub fn named(id: u64, name: &str) -> NamedRef {
    NamedRef {
        id,
        name: name.to_string(),
    }
}

pub fn project(id: u64, name: &str) -> redmine::Project {
    redmine::Project {
        id,
        name: name.to_string(),
    }
}

/// An issue with status `status` (`(id, name)`), assigned to `assignee` if set.
pub fn issue(
    id: u64,
    project: (u64, &str),
    status: (u64, &str),
    assignee: Option<&str>,
) -> redmine::Issue {
    redmine::Issue {
        id,
        project: named(project.0, project.1),
        tracker: named(1, "Bug"),
        status: named(status.0, status.1),
        priority: named(2, "Normal"),
        author: named(1, "admin"),
        assigned_to: assignee.map(|name| named(10 + id, name)),
        subject: format!("Issue {id}"),
        due_date: None,
    }
}

pub fn time_entry(
    id: u64,
    project: (u64, &str),
    issue: Option<u64>,
    hours: f64,
    spent_on: &str,
) -> redmine::TimeEntry {
    redmine::TimeEntry {
        id,
        project: named(project.0, project.1),
        issue: issue.map(|id| IdRef { id }),
        user: named(3, "carol"),
        activity: named(9, "Development"),
        hours,
        spent_on: spent_on.to_string(),
    }
}

fn status_matches(filter: &str, status_id: u64) -> bool {
    match filter {
        "*" => true,
        "open" => !CLOSED_STATUS_IDS.contains(&status_id),
        "closed" => CLOSED_STATUS_IDS.contains(&status_id),
        other => other.parse::<u64>().is_ok_and(|id| id == status_id),
    }
}

fn issue_matches(query: &IssueQuery, issue: &redmine::Issue) -> bool {
    query
        .status_id
        .as_deref()
        .is_none_or(|filter| status_matches(filter, issue.status.id))
        && query.project_id.is_none_or(|id| id == issue.project.id)
        && query
            .due_date
            .as_deref()
            .is_none_or(|filter| filter != "*" || issue.due_date.is_some())
}

fn failing<'a, T: Send + 'a>(message: &'static str) -> BoxStream<'a, Result<T>> {
    stream::once(async move { Err(anyhow!(message)) }).boxed()
}

/// In-memory Redmine that answers queries the way the REST API filters them.
#[derive(Clone, Default)]
pub struct MockRedmine {
    pub issues: Vec<redmine::Issue>,
    pub projects: Vec<redmine::Project>,
    pub time_entries: Vec<redmine::TimeEntry>,
    pub active_users: u64,
    /// Every request fails when set.
    pub unavailable: bool,
    /// Issue queries received, in order.
    pub issue_queries: Arc<Mutex<Vec<IssueQuery>>>,
    /// Time entry queries received, in order.
    pub time_entry_queries: Arc<Mutex<Vec<TimeEntryQuery>>>,
}

impl MockRedmine {
    pub fn issue_queries(&self) -> Vec<IssueQuery> {
        self.issue_queries.lock().unwrap().clone()
    }

    pub fn time_entry_queries(&self) -> Vec<TimeEntryQuery> {
        self.time_entry_queries.lock().unwrap().clone()
    }

    fn filtered(&self, query: &IssueQuery) -> Vec<redmine::Issue> {
        self.issue_queries.lock().unwrap().push(query.clone());
        self.issues
            .iter()
            .filter(|issue| issue_matches(query, issue))
            .cloned()
            .collect()
    }
}

impl RedmineApi for MockRedmine {
    fn issues(&self, query: IssueQuery) -> BoxStream<'_, Result<redmine::Issue>> {
        if self.unavailable {
            return failing("Redmine returned 503 Service Unavailable");
        }
        stream::iter(self.filtered(&query).into_iter().map(Ok)).boxed()
    }

    fn count_issues(&self, query: IssueQuery) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            if self.unavailable {
                return Err(anyhow!("Redmine returned 503 Service Unavailable"));
            }
            Ok(self.filtered(&query).len() as u64)
        })
    }

    fn projects(&self) -> BoxStream<'_, Result<redmine::Project>> {
        if self.unavailable {
            return failing("Redmine returned 503 Service Unavailable");
        }
        stream::iter(self.projects.clone().into_iter().map(Ok)).boxed()
    }

    fn count_active_users(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            if self.unavailable {
                return Err(anyhow!("Redmine returned 503 Service Unavailable"));
            }
            Ok(self.active_users)
        })
    }

    fn time_entries(&self, query: TimeEntryQuery) -> BoxStream<'_, Result<redmine::TimeEntry>> {
        if self.unavailable {
            return failing("Redmine returned 503 Service Unavailable");
        }
        self.time_entry_queries.lock().unwrap().push(query);

        let from = query.from.to_string();
        let to = query.to.to_string();
        let entries: Vec<_> = self
            .time_entries
            .iter()
            .filter(|e| e.spent_on.as_str() >= from.as_str() && e.spent_on.as_str() <= to.as_str())
            .cloned()
            .collect();

        stream::iter(entries.into_iter().map(Ok)).boxed()
    }
}

pub fn account(login: &str) -> github::Account {
    github::Account {
        login: login.to_string(),
    }
}

pub fn gh_issue(id: u64, assignee: Option<&str>, pull_request: bool) -> github::Issue {
    github::Issue {
        id,
        number: id % 1000,
        body: None,
        state: "open".to_string(),
        comments_url: format!("https://api.github.com/repos/octo/widgets/issues/{id}/comments"),
        assignee: assignee.map(account),
        labels: vec![github::Label {
            name: "bug".to_string(),
        }],
        pull_request: pull_request.then(|| json!({"url": "https://api.github.com/pulls/1"})),
    }
}

pub fn gh_pull(id: u64, state: &str) -> github::PullRequest {
    github::PullRequest {
        id,
        number: id % 1000,
        state: state.to_string(),
        body: Some("Adds a feature".to_string()),
        comments_url: format!("https://api.github.com/repos/octo/widgets/issues/{id}/comments"),
        assignee: None,
        labels: Vec::new(),
    }
}

pub fn gh_commit(sha: &str, author: Option<&str>, message: &str) -> github::Commit {
    github::Commit {
        sha: sha.to_string(),
        url: format!("https://api.github.com/repos/octo/widgets/commits/{sha}"),
        commit: github::CommitDetail {
            message: message.to_string(),
            author: Some(github::Signature {
                name: "Git Author".to_string(),
            }),
            committer: None,
        },
        author: author.map(account),
        committer: None,
    }
}

pub fn gh_repo(id: u64, name: &str, language: Option<&str>) -> github::Repository {
    github::Repository {
        id,
        name: name.to_string(),
        full_name: format!("octo/{name}"),
        url: format!("https://api.github.com/repos/octo/{name}"),
        clone_url: format!("https://github.com/octo/{name}.git"),
        commits_url: format!("https://api.github.com/repos/octo/{name}/commits{{/sha}}"),
        created_at: Some("2024-01-01T00:00:00Z".to_string()),
        updated_at: Some("2026-01-01T00:00:00Z".to_string()),
        language: language.map(ToString::to_string),
        watchers_count: 3,
    }
}

/// In-memory GitHub.
#[derive(Clone, Default)]
pub struct MockGithub {
    pub issues: Vec<github::Issue>,
    pub pulls: Vec<github::PullRequest>,
    pub commits: Vec<github::Commit>,
    pub repos: Vec<github::Repository>,
    pub unavailable: bool,
}

fn state_matches(state: IssueState, value: &str) -> bool {
    match state {
        IssueState::All => true,
        other => other.as_str() == value,
    }
}

impl GithubApi for MockGithub {
    fn issues(&self, state: IssueState) -> BoxStream<'_, Result<github::Issue>> {
        if self.unavailable {
            return failing("GitHub returned 502 Bad Gateway");
        }
        let issues: Vec<_> = self
            .issues
            .iter()
            .filter(|i| state_matches(state, &i.state))
            .cloned()
            .collect();
        stream::iter(issues.into_iter().map(Ok)).boxed()
    }

    fn pulls(&self, state: IssueState) -> BoxStream<'_, Result<github::PullRequest>> {
        if self.unavailable {
            return failing("GitHub returned 502 Bad Gateway");
        }
        let pulls: Vec<_> = self
            .pulls
            .iter()
            .filter(|p| state_matches(state, &p.state))
            .cloned()
            .collect();
        stream::iter(pulls.into_iter().map(Ok)).boxed()
    }

    fn commits(&self) -> BoxStream<'_, Result<github::Commit>> {
        if self.unavailable {
            return failing("GitHub returned 502 Bad Gateway");
        }
        stream::iter(self.commits.clone().into_iter().map(Ok)).boxed()
    }

    fn repos(&self) -> BoxStream<'_, Result<github::Repository>> {
        if self.unavailable {
            return failing("GitHub returned 502 Bad Gateway");
        }
        stream::iter(self.repos.clone().into_iter().map(Ok)).boxed()
    }
}

/// The "Alpha" project with two open issues, one of them unassigned.
pub fn alpha_redmine() -> MockRedmine {
    MockRedmine {
        projects: vec![project(1, "Alpha")],
        issues: vec![
            issue(101, (1, "Alpha"), (1, "New"), Some("bob")),
            issue(102, (1, "Alpha"), (2, "In Progress"), None),
        ],
        active_users: 4,
        ..MockRedmine::default()
    }
}

pub fn redmine_sources(redmine: MockRedmine) -> Sources {
    Sources::default().with_redmine(Arc::new(redmine))
}

pub fn github_sources(github: MockGithub) -> Sources {
    Sources::default().with_github(Arc::new(github))
}

// ----------------------------------------------------------------------------
// Fake tracker HTTP server
// ----------------------------------------------------------------------------

/// Requests seen by the fake tracker server: path and raw query.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<(String, HashMap<String, String>, HeaderMap)>>>);

impl RequestLog {
    fn push(&self, path: &str, params: &HashMap<String, String>, headers: &HeaderMap) {
        self.0
            .lock()
            .unwrap()
            .push((path.to_string(), params.clone(), headers.clone()));
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(p, _, _)| p.clone()).collect()
    }

    pub fn requests(&self) -> Vec<(String, HashMap<String, String>, HeaderMap)> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct FakeTracker {
    base: String,
    log: RequestLog,
    redmine: Arc<HashMap<&'static str, Vec<Value>>>,
    github: Arc<HashMap<String, Vec<Value>>>,
    per_page: usize,
}

/// Serve Redmine collections with offset/limit paging.
async fn redmine_collection(
    State(fake): State<FakeTracker>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    fake.log.push(&format!("/redmine/{resource}"), &params, &headers);

    let key = resource.trim_end_matches(".json");
    let Some((key, records)) = fake.redmine.get_key_value(key) else {
        return (StatusCode::NOT_FOUND, Json(json!({"errors": ["not found"]})));
    };

    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(25);
    let page: Vec<Value> = records.iter().skip(offset).take(limit).cloned().collect();

    let mut body = serde_json::Map::new();
    body.insert((*key).to_string(), Value::Array(page));
    body.insert("total_count".to_string(), json!(records.len()));
    body.insert("offset".to_string(), json!(offset));
    body.insert("limit".to_string(), json!(limit));

    (StatusCode::OK, Json(Value::Object(body)))
}

/// Serve GitHub collections with `Link: rel="next"` paging.
async fn github_collection(
    State(fake): State<FakeTracker>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    fake.log.push(&format!("/github/{path}"), &params, &headers);

    let Some(records) = fake.github.get(&path) else {
        return (StatusCode::NOT_FOUND, HeaderMap::new(), Json(json!({"message": "Not Found"})));
    };

    let page: usize = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let items: Vec<Value> = records
        .iter()
        .skip((page - 1) * fake.per_page)
        .take(fake.per_page)
        .cloned()
        .collect();

    let mut response_headers = HeaderMap::new();
    if page * fake.per_page < records.len() {
        let next = format!(
            "<{}/github/{path}?page={}>; rel=\"next\", <{}/github/{path}?page=99>; rel=\"last\"",
            fake.base,
            page + 1,
            fake.base
        );
        response_headers.insert(LINK, HeaderValue::from_str(&next).unwrap());
    }

    (StatusCode::OK, response_headers, Json(Value::Array(items)))
}

/// A local HTTP server imitating the Redmine (`/redmine/...`) and GitHub
/// (`/github/...`) APIs.
pub struct FakeTrackerServer {
    pub base: Url,
    pub log: RequestLog,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeTrackerServer {
    pub fn redmine_url(&self) -> Url {
        self.base.join("redmine/").unwrap()
    }

    pub fn github_url(&self) -> Url {
        self.base.join("github/").unwrap()
    }
}

impl Drop for FakeTrackerServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a fake tracker. GitHub collections are keyed by path below the API
/// root, e.g. `repos/octo/widgets/issues`.
pub async fn spawn_fake_tracker(
    redmine: HashMap<&'static str, Vec<Value>>,
    github: HashMap<String, Vec<Value>>,
    per_page: usize,
) -> FakeTrackerServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");
    let log = RequestLog::default();

    let fake = FakeTracker {
        base: base.clone(),
        log: log.clone(),
        redmine: Arc::new(redmine),
        github: Arc::new(github),
        per_page,
    };

    let app = Router::new()
        .route("/redmine/{resource}", get(redmine_collection))
        .route("/github/{*path}", get(github_collection))
        .with_state(fake);

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    FakeTrackerServer {
        base: Url::parse(&format!("{base}/")).unwrap(),
        log,
        handle,
    }
}

pub fn redmine_issue_json(id: u64, project: &str, assignee: Option<&str>) -> Value {
    let mut issue = json!({
        "id": id,
        "project": {"id": 1, "name": project},
        "tracker": {"id": 1, "name": "Bug"},
        "status": {"id": 1, "name": "New", "is_closed": false},
        "priority": {"id": 2, "name": "Normal"},
        "author": {"id": 1, "name": "admin"},
        "subject": format!("Issue {id}"),
        "due_date": null,
    });
    if let Some(name) = assignee {
        issue["assigned_to"] = json!({"id": 7, "name": name});
    }
    issue
}

// ----------------------------------------------------------------------------
// Exporter helpers
// ----------------------------------------------------------------------------

/// Find an available port for testing (returns port > 1024)
pub fn get_available_port() -> u16 {
    use std::net::TcpListener;

    // Bind to port 0 lets the OS assign an available ephemeral port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("Failed to get local addr")
        .port();

    assert!(port > 1024, "Assigned port {} should be > 1024", port);

    port
}

/// Wait for server to be ready on the given port
///
/// # Arguments
/// * `port` - The port number to connect to (should be > 1024)
/// * `max_attempts` - Maximum number of connection attempts (e.g., 50 = 5 seconds at 100ms intervals)
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    use tokio::time::{Duration, sleep};

    for _ in 1..=max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }

        sleep(Duration::from_millis(100)).await;
    }

    eprintln!("Failed to connect to server on port {port} after {max_attempts} attempts");
    false
}

/// Get base URL for test server
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Redmine collections for a single "Alpha" project with two open issues.
pub fn alpha_redmine_json() -> HashMap<&'static str, Vec<Value>> {
    HashMap::from([
        (
            "issues",
            vec![
                redmine_issue_json(101, "Alpha", Some("bob")),
                redmine_issue_json(102, "Alpha", None),
            ],
        ),
        ("projects", vec![json!({"id": 1, "name": "Alpha", "identifier": "alpha"})]),
        ("users", vec![json!({"id": 1}), json!({"id": 2})]),
        ("time_entries", Vec::new()),
    ])
}

/// Settings pointing the Redmine client (and optionally GitHub) at `server`.
pub fn fake_tracker_settings(
    server: &FakeTrackerServer,
    github_repo: Option<&str>,
) -> TrackerSettings {
    TrackerSettings {
        redmine: Some(RedmineSettings {
            url: server.redmine_url(),
            api_key: Some(SecretString::from("test-key".to_string())),
        }),
        github: github_repo.map(|repo| GithubSettings {
            api_url: server.github_url(),
            token: SecretString::from("test-token".to_string()),
            repo: repo.to_string(),
        }),
        timeout: std::time::Duration::from_secs(5),
    }
}

/// Every registered collector enabled with the default status filters.
pub fn all_collectors() -> CollectorConfig {
    let names: Vec<String> = COLLECTOR_NAMES.iter().map(ToString::to_string).collect();
    CollectorConfig::new().with_enabled(&names)
}

/// Start the exporter on a free loopback port and wait until it accepts
/// connections.
pub async fn start_exporter(
    trackers: TrackerSettings,
    config: CollectorConfig,
) -> (u16, tokio::task::JoinHandle<Result<()>>) {
    let port = get_available_port();

    let handle = tokio::spawn(async move {
        tracker_exporter::exporter::new(port, Some("127.0.0.1".to_string()), trackers, config)
            .await
    });

    assert!(wait_for_server(port, 50).await, "Server failed to start on port {port}");

    (port, handle)
}
