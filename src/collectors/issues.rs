use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::redmine::IssueQuery;
use crate::tracker::{Source, label_or_absent};
use anyhow::Result;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use tracing::{debug, instrument};

/// Open Redmine issues, one detail series per issue.
#[derive(Clone, Default)]
pub struct IssuesCollector;

impl IssuesCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for IssuesCollector {
    fn name(&self) -> &'static str {
        "issues"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Redmine
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::RedmineOpenIssues]
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "issues", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let redmine = ctx.sources.redmine()?;
            let mut issues = redmine.issues(IssueQuery::with_status("open"));
            let mut count = 0usize;

            while let Some(issue) = issues.try_next().await? {
                let id = issue.id.to_string();
                ctx.cycle.mark(
                    FamilyKey::RedmineOpenIssues,
                    &[
                        issue.project.name.as_str(),
                        id.as_str(),
                        issue.status.name.as_str(),
                        issue.tracker.name.as_str(),
                        issue.priority.name.as_str(),
                        issue.author.name.as_str(),
                        label_or_absent(issue.assignee_name()),
                    ],
                )?;
                count += 1;
            }

            debug!(issues = count, "collected open issues");

            Ok(())
        })
    }
}
