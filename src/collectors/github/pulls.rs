use crate::collectors::families::FamilyKey;
use crate::collectors::github::join_labels;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::github::State;
use crate::tracker::{Source, label_or_absent};
use anyhow::Result;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use tracing::instrument;

/// Pull requests of the configured repository, any state.
#[derive(Clone, Default)]
pub struct PullRequestsCollector;

impl PullRequestsCollector {
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for PullRequestsCollector {
    fn name(&self) -> &'static str {
        "github_pulls"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Github
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::GithubPullRequests]
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "github_pulls", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut pulls = ctx.sources.github()?.pulls(State::All);

            while let Some(pull) = pulls.try_next().await? {
                let id = pull.id.to_string();
                let number = pull.number.to_string();
                let labels = join_labels(&pull.labels);

                ctx.cycle.mark(
                    FamilyKey::GithubPullRequests,
                    &[
                        id.as_str(),
                        label_or_absent(pull.assignee.as_ref().map(|a| a.login.as_str())),
                        number.as_str(),
                        pull.comments_url.as_str(),
                        label_or_absent(pull.body.as_deref()),
                        labels.as_str(),
                        pull.state.as_str(),
                    ],
                )?;
            }

            Ok(())
        })
    }
}
