use super::common::{self, MockGithub, MockRedmine};
use anyhow::Result;
use std::sync::Arc;
use tracker_exporter::collectors::{
    COLLECTOR_NAMES, config::CollectorConfig, families::FamilyKey, registry::CollectorRegistry,
};
use tracker_exporter::tracker::Sources;

fn all_enabled() -> CollectorConfig {
    let names: Vec<String> = COLLECTOR_NAMES.iter().map(ToString::to_string).collect();
    CollectorConfig::new().with_enabled(&names)
}

fn both_trackers(redmine: MockRedmine) -> Sources {
    Sources::default()
        .with_redmine(Arc::new(redmine))
        .with_github(Arc::new(MockGithub::default()))
}

#[test]
fn test_registry_skips_collectors_without_tracker() -> Result<()> {
    let registry = CollectorRegistry::new(
        all_enabled(),
        common::redmine_sources(MockRedmine::default()),
    )?;

    assert!(!registry.collector_names().contains(&"github"));
    assert!(registry.collector_names().contains(&"issues"));
    assert!(!registry.families().contains(&FamilyKey::GithubCommits));

    Ok(())
}

#[test]
fn test_registry_without_runnable_collector_fails() {
    let config = CollectorConfig::new().with_enabled(&["github".to_string()]);
    let result = CollectorRegistry::new(config, common::redmine_sources(MockRedmine::default()));
    assert!(result.is_err());
}

#[test]
fn test_registry_keeps_registration_order() -> Result<()> {
    let registry = CollectorRegistry::new(all_enabled(), both_trackers(MockRedmine::default()))?;
    assert_eq!(registry.collector_names(), COLLECTOR_NAMES);
    assert_eq!(registry.families(), FamilyKey::ALL);
    Ok(())
}

#[tokio::test]
async fn test_collect_declares_every_family_with_zero_records() -> Result<()> {
    let registry = CollectorRegistry::new(all_enabled(), both_trackers(MockRedmine::default()))?;

    let snapshot = registry.collect().await?;

    let expected: Vec<&str> = FamilyKey::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(snapshot.names(), expected);

    // only the date and the user count have a sample without records
    let populated: Vec<&str> = snapshot
        .families()
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| f.name())
        .collect();
    assert_eq!(populated, vec!["redmine_active_users", "redmine_today"]);

    Ok(())
}

#[tokio::test]
async fn test_collect_alpha_scenario() -> Result<()> {
    let registry = CollectorRegistry::new(all_enabled(), both_trackers(common::alpha_redmine()))?;

    let snapshot = registry.collect().await?;

    let detail = snapshot.family(FamilyKey::RedmineOpenIssues).unwrap();
    assert_eq!(detail.label_values("user"), vec!["bob", "None"]);

    let open = snapshot.family(FamilyKey::RedmineOpenIssueCount).unwrap();
    assert_eq!(open.value_of(&["Alpha"]), Some(2.0));

    let text = snapshot.to_string();
    assert!(text.contains("user=\"None\""));
    assert!(text.contains("redmine_project_open_issues{projectname=\"Alpha\"} 2\n"));

    Ok(())
}

#[tokio::test]
async fn test_collect_is_idempotent() -> Result<()> {
    let registry = CollectorRegistry::new(all_enabled(), both_trackers(common::alpha_redmine()))?;

    let first = registry.collect().await?;
    let second = registry.collect().await?;

    assert_eq!(first.names(), second.names());
    for (a, b) in first.families().iter().zip(second.families()) {
        let labels_a: Vec<_> = a.observations().iter().map(|o| &o.label_values).collect();
        let labels_b: Vec<_> = b.observations().iter().map(|o| &o.label_values).collect();
        assert_eq!(labels_a, labels_b, "{} changed between cycles", a.name());
    }

    let counts = |s: &tracker_exporter::collectors::cycle::Snapshot| {
        s.family(FamilyKey::RedmineOpenIssueCount)
            .unwrap()
            .observations()
            .to_vec()
    };
    assert_eq!(counts(&first), counts(&second));

    Ok(())
}

#[tokio::test]
async fn test_collect_duration_is_monotonic() -> Result<()> {
    let registry = CollectorRegistry::new(all_enabled(), both_trackers(common::alpha_redmine()))?;

    let mut last = registry.scraper().cycles();
    assert_eq!(last.0, 0);

    for _ in 0..3 {
        registry.collect().await?;
        let now = registry.scraper().cycles();
        assert_eq!(now.0, last.0 + 1);
        assert!(now.1 >= last.1);
        last = now;
    }

    Ok(())
}

#[tokio::test]
async fn test_collect_failure_aborts_cycle() -> Result<()> {
    let redmine = MockRedmine {
        unavailable: true,
        ..common::alpha_redmine()
    };
    let registry = CollectorRegistry::new(all_enabled(), both_trackers(redmine))?;

    let err = registry.collect().await.unwrap_err();
    assert!(format!("{err:#}").contains("collector 'issues' failed"));

    // failed cycles are not observed
    assert_eq!(registry.scraper().cycles().0, 0);
    assert_eq!(registry.scraper().errors("issues"), 1);

    Ok(())
}

#[tokio::test]
async fn test_cycles_do_not_share_observations() -> Result<()> {
    let registry = CollectorRegistry::new(all_enabled(), both_trackers(common::alpha_redmine()))?;

    let (a, b) = tokio::join!(registry.collect(), registry.collect());
    let (a, b) = (a?, b?);

    for snapshot in [&a, &b] {
        let detail = snapshot.family(FamilyKey::RedmineOpenIssues).unwrap();
        assert_eq!(detail.observations().len(), 2);
    }

    Ok(())
}
