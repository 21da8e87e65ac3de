use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::Source;
use anyhow::Result;
use futures::future::BoxFuture;

/// Today's date as seen by the exporter, for dashboards that join on it.
#[derive(Clone, Default)]
pub struct CalendarCollector;

impl CalendarCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Collector for CalendarCollector {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    // No query, but the family belongs to the Redmine set.
    fn source(&self) -> Source {
        Source::Redmine
    }

    fn families(&self) -> &'static [FamilyKey] {
        &[FamilyKey::RedmineToday]
    }

    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let today = ctx.cycle.today().format("%Y-%m-%d").to_string();
            ctx.cycle.mark(FamilyKey::RedmineToday, &[today])
        })
    }
}
