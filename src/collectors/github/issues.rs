use crate::collectors::families::FamilyKey;
use crate::collectors::github::join_labels;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::github::State;
use crate::tracker::{Source, label_or_absent};
use anyhow::Result;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use tracing::{debug, instrument};

/// Open issues of the configured repository, pull requests excluded.
#[derive(Clone, Default)]
pub struct IssuesCollector;

impl IssuesCollector {
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for IssuesCollector {
    fn name(&self) -> &'static str {
        "github_issues"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Github
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::GithubIssues]
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "github_issues", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut issues = ctx.sources.github()?.issues(State::Open);
            let mut count = 0usize;

            while let Some(issue) = issues.try_next().await? {
                // the issues endpoint lists pull requests too
                if issue.is_pull_request() {
                    continue;
                }

                let id = issue.id.to_string();
                let number = issue.number.to_string();
                let labels = join_labels(&issue.labels);

                ctx.cycle.mark(
                    FamilyKey::GithubIssues,
                    &[
                        id.as_str(),
                        label_or_absent(issue.assignee.as_ref().map(|a| a.login.as_str())),
                        number.as_str(),
                        issue.comments_url.as_str(),
                        label_or_absent(issue.body.as_deref()),
                        labels.as_str(),
                        issue.state.as_str(),
                    ],
                )?;
                count += 1;
            }

            debug!(issues = count, "collected open GitHub issues");

            Ok(())
        })
    }
}
