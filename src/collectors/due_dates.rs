use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::redmine::IssueQuery;
use crate::tracker::{Source, label_or_absent};
use anyhow::Result;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use tracing::{debug, instrument};

/// Open Redmine issues that have a due date.
#[derive(Clone, Default)]
pub struct DueDatesCollector;

impl DueDatesCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for DueDatesCollector {
    fn name(&self) -> &'static str {
        "due_dates"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Redmine
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::RedmineIssueDueDate]
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "due_dates", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let redmine = ctx.sources.redmine()?;
            let mut issues = redmine.issues(IssueQuery::with_status("open").due_date("*"));
            let mut count = 0usize;

            while let Some(issue) = issues.try_next().await? {
                // `due_date=*` already filters, older servers ignore it
                let Some(due_date) = issue.due_date.as_deref() else {
                    continue;
                };

                let id = issue.id.to_string();
                ctx.cycle.mark(
                    FamilyKey::RedmineIssueDueDate,
                    &[
                        issue.project.name.as_str(),
                        id.as_str(),
                        issue.subject.as_str(),
                        label_or_absent(issue.assignee_name()),
                        due_date,
                    ],
                )?;
                count += 1;
            }

            debug!(issues = count, "collected issues with a due date");

            Ok(())
        })
    }
}
