use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::{Source, label_or_absent};
use anyhow::Result;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use tracing::instrument;

/// Commits on the default branch of the configured repository.
#[derive(Clone, Default)]
pub struct CommitsCollector;

impl CommitsCollector {
    pub const fn new() -> Self {
        Self
    }
}

/// First line of a commit message.
fn summary(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

impl Collector for CommitsCollector {
    fn name(&self) -> &'static str {
        "github_commits"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Github
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::GithubCommits]
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "github_commits", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut commits = ctx.sources.github()?.commits();

            while let Some(commit) = commits.try_next().await? {
                ctx.cycle.mark(
                    FamilyKey::GithubCommits,
                    &[
                        commit.sha.as_str(),
                        label_or_absent(commit.author_name()),
                        label_or_absent(commit.committer_name()),
                        summary(&commit.commit.message),
                        commit.url.as_str(),
                    ],
                )?;
            }

            Ok(())
        })
    }
}
