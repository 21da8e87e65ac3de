use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::Source;
use anyhow::Result;
use futures::future::BoxFuture;
use tracing::instrument;

/// Number of active Redmine users.
#[derive(Clone, Default)]
pub struct UsersCollector;

impl UsersCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for UsersCollector {
    fn name(&self) -> &'static str {
        "users"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Redmine
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::RedmineActiveUsers]
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "users", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let active = ctx.sources.redmine()?.count_active_users().await?;

            #[allow(clippy::cast_precision_loss)]
            let value = active as f64;
            ctx.cycle
                .observe::<&str>(FamilyKey::RedmineActiveUsers, &[], value)
        })
    }
}
