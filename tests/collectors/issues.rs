use super::common::{self, MockRedmine};
use super::{collect_one, started_ts};
use anyhow::Result;
use tracker_exporter::collectors::{
    Collector, IssuesCollector, config::CollectorConfig, families::FamilyKey,
};

#[tokio::test]
async fn test_issues_collector_labels_every_open_issue() -> Result<()> {
    let sources = common::redmine_sources(common::alpha_redmine());
    let snapshot = collect_one(&IssuesCollector::new(), &sources, &CollectorConfig::new()).await?;

    let family = snapshot.family(FamilyKey::RedmineOpenIssues).unwrap();
    assert_eq!(family.observations().len(), 2);
    assert_eq!(
        family.value_of(&["Alpha", "101", "New", "Bug", "Normal", "admin", "bob"]),
        Some(started_ts())
    );
    assert_eq!(
        family.value_of(&["Alpha", "102", "In Progress", "Bug", "Normal", "admin", "None"]),
        Some(started_ts())
    );

    Ok(())
}

#[tokio::test]
async fn test_issues_collector_only_requests_open_issues() -> Result<()> {
    let mut redmine = common::alpha_redmine();
    redmine
        .issues
        .push(common::issue(103, (1, "Alpha"), (5, "Closed"), Some("dave")));
    let queries = redmine.issue_queries.clone();

    let sources = common::redmine_sources(redmine);
    let snapshot = collect_one(&IssuesCollector::new(), &sources, &CollectorConfig::new()).await?;

    let family = snapshot.family(FamilyKey::RedmineOpenIssues).unwrap();
    assert_eq!(family.label_values("issueid"), vec!["101", "102"]);

    let queries = queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].status_id.as_deref(), Some("open"));

    Ok(())
}

#[tokio::test]
async fn test_issues_collector_without_issues_leaves_family_empty() -> Result<()> {
    let sources = common::redmine_sources(MockRedmine::default());
    let snapshot = collect_one(&IssuesCollector::new(), &sources, &CollectorConfig::new()).await?;

    assert_eq!(snapshot.names(), vec!["redmine_project_issue_open"]);
    assert!(snapshot.family(FamilyKey::RedmineOpenIssues).unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_issues_collector_propagates_upstream_failure() {
    let redmine = MockRedmine {
        unavailable: true,
        ..common::alpha_redmine()
    };
    let sources = common::redmine_sources(redmine);

    let err = collect_one(&IssuesCollector::new(), &sources, &CollectorConfig::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[test]
fn test_issues_collector_metadata() {
    let collector = IssuesCollector::new();
    assert_eq!(collector.name(), "issues");
    assert!(collector.enabled_by_default());
    assert_eq!(collector.families(), &[FamilyKey::RedmineOpenIssues]);
}
