use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::Source;
use crate::tracker::redmine::IssueQuery;
use anyhow::{Context, Result};
use futures::TryStreamExt;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

const FAMILIES: &[FamilyKey] = &[
    FamilyKey::RedmineOpenIssueCount,
    FamilyKey::RedmineClosedIssueCount,
    FamilyKey::RedmineResolvedIssueCount,
    FamilyKey::RedmineOnHoldIssueCount,
    FamilyKey::RedmineInProgressIssueCount,
    FamilyKey::RedmineFeedbackIssueCount,
];

/// Issue counts per Redmine project and status category.
///
/// Each category maps to one `status_id` filter (see
/// [`StatusFilters`](crate::collectors::config::StatusFilters)); the value is
/// the `total_count` Redmine reports for `project_id` and that filter. A
/// category without a filter is skipped and its family stays empty. Projects
/// sharing a name are summed into one series.
#[derive(Clone, Default)]
pub struct StatusCollector;

impl StatusCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for StatusCollector {
    fn name(&self) -> &'static str {
        "status"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Redmine
    }

    fn families(&self) -> &'static [FamilyKey] {
        FAMILIES
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "status", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let redmine = ctx.sources.redmine()?;
            let projects: Vec<_> = redmine.projects().try_collect().await?;
            let table = ctx.config.statuses.table();
            let mut counts: BTreeMap<(FamilyKey, &str), u64> = BTreeMap::new();

            for project in &projects {
                for (key, filter) in table {
                    let Some(status) = filter else {
                        continue;
                    };

                    let count = redmine
                        .count_issues(IssueQuery::with_status(status).project(project.id))
                        .await
                        .with_context(|| {
                            format!("counting {} for project {}", key.name(), project.name)
                        })?;

                    *counts.entry((key, project.name.as_str())).or_default() += count;
                }
            }

            for ((key, name), count) in counts {
                #[allow(clippy::cast_precision_loss)]
                let value = count as f64;
                ctx.cycle.observe(key, &[name], value)?;
            }

            debug!(projects = projects.len(), "collected issue counts");

            Ok(())
        })
    }
}
