use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::Source;
use crate::tracker::github::Label;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{info_span, instrument};
use tracing_futures::Instrument as _;

mod commits;
use commits::CommitsCollector;

mod issues;
use issues::IssuesCollector;

mod pulls;
use pulls::PullRequestsCollector;

mod repos;
use repos::ReposCollector;

const FAMILIES: &[FamilyKey] = &[
    FamilyKey::GithubIssues,
    FamilyKey::GithubPullRequests,
    FamilyKey::GithubCommits,
    FamilyKey::GithubRepos,
];

/// GitHub issues, pull requests, commits and repositories.
#[derive(Clone)]
pub struct GithubCollector {
    subs: Vec<Arc<dyn Collector + Send + Sync>>,
}

impl GithubCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subs: vec![
                Arc::new(IssuesCollector::new()),
                Arc::new(PullRequestsCollector::new()),
                Arc::new(CommitsCollector::new()),
                Arc::new(ReposCollector::new()),
            ],
        }
    }
}

impl Default for GithubCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Label names joined with commas, in API order.
pub(crate) fn join_labels(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|label| label.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

impl Collector for GithubCollector {
    fn name(&self) -> &'static str {
        "github"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Github
    }

    fn families(&self) -> &'static [FamilyKey] {
        FAMILIES
    }

    #[instrument(
        skip(self, ctx),
        level = "info",
        err,
        fields(collector = "github", otel.kind = "internal")
    )]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // Collect sub-collectors concurrently (unordered join)
            let mut tasks = FuturesUnordered::new();

            for sub in &self.subs {
                let span = info_span!(
                    "collector.collect",
                    sub_collector = %sub.name(),
                    otel.kind = "internal"
                );

                tasks.push(sub.collect(ctx).instrument(span));
            }

            while let Some(res) = tasks.next().await {
                res?;
            }

            Ok(())
        })
    }
}
