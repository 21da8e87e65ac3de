use crate::tracker::{Source, Sources};
use anyhow::Result;
use futures::future::BoxFuture;
use std::collections::HashMap;

#[macro_use]
mod register_macro;

pub mod config;
pub mod cycle;
pub mod families;
pub mod registry;
pub mod scraper;

use config::CollectorConfig;
use cycle::Cycle;
use families::FamilyKey;

/// Everything a collector needs during one cycle.
#[derive(Clone, Copy)]
pub struct CollectionContext<'a> {
    /// Tracker clients
    pub sources: &'a Sources,
    /// Collector settings (status filters, ...)
    pub config: &'a CollectorConfig,
    /// The cycle being populated
    pub cycle: &'a Cycle,
}

pub trait Collector {
    fn name(&self) -> &'static str;

    fn enabled_by_default(&self) -> bool;

    /// Tracker this collector queries.
    fn source(&self) -> Source;

    /// Families this collector populates; declared empty at the start of every cycle.
    fn families(&self) -> &'static [FamilyKey];

    /// Query the tracker and add observations to the cycle.
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>>;
}

// THIS IS THE ONLY PLACE YOU NEED TO ADD NEW COLLECTORS
register_collectors! {
    issues => IssuesCollector,
    status => StatusCollector,
    users => UsersCollector,
    calendar => CalendarCollector,
    due_dates => DueDatesCollector,
    time_entries => TimeEntriesCollector,
    github => GithubCollector,
}
