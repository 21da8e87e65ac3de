use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::{Source, label_or_absent};
use anyhow::Result;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use tracing::instrument;

/// Repositories visible to the authenticated user.
#[derive(Clone, Default)]
pub struct ReposCollector;

impl ReposCollector {
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for ReposCollector {
    fn name(&self) -> &'static str {
        "github_repos"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Github
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::GithubRepos]
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "github_repos", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut repos = ctx.sources.github()?.repos();

            while let Some(repo) = repos.try_next().await? {
                let id = repo.id.to_string();
                let watchers = repo.watchers_count.to_string();

                ctx.cycle.mark(
                    FamilyKey::GithubRepos,
                    &[
                        repo.name.as_str(),
                        id.as_str(),
                        repo.url.as_str(),
                        repo.clone_url.as_str(),
                        label_or_absent(repo.created_at.as_deref()),
                        repo.commits_url.as_str(),
                        repo.full_name.as_str(),
                        label_or_absent(repo.language.as_deref()),
                        label_or_absent(repo.updated_at.as_deref()),
                        watchers.as_str(),
                    ],
                )?;
            }

            Ok(())
        })
    }
}
