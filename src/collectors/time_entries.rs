use crate::collectors::config::TIME_ENTRY_WINDOW_DAYS;
use crate::collectors::families::FamilyKey;
use crate::collectors::{CollectionContext, Collector};
use crate::tracker::redmine::TimeEntryQuery;
use crate::tracker::{ABSENT_LABEL, Source};
use anyhow::{Result, anyhow};
use chrono::{Days, NaiveDate};
use futures::TryStreamExt;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

const FAMILIES: &[FamilyKey] = &[FamilyKey::RedmineTimeSpent, FamilyKey::RedmineProjectHours];

/// Time logged in Redmine over the last seven days.
///
/// Publishes every entry as a detail series and the hours summed per
/// project. The window is calendar based: `spent_on` from six days before
/// the cycle date up to and including the cycle date.
#[derive(Clone, Default)]
pub struct TimeEntriesCollector;

impl TimeEntriesCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Date range ending on `today` spanning the time entry window.
///
/// # Errors
///
/// Returns an error if the window start is out of the calendar range
pub fn window(today: NaiveDate) -> Result<TimeEntryQuery> {
    let from = today
        .checked_sub_days(Days::new(u64::from(TIME_ENTRY_WINDOW_DAYS - 1)))
        .ok_or_else(|| anyhow!("time entry window before {today} is out of range"))?;

    Ok(TimeEntryQuery { from, to: today })
}

impl Collector for TimeEntriesCollector {
    fn name(&self) -> &'static str {
        "time_entries"
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    fn source(&self) -> Source {
        Source::Redmine
    }

    fn families(&self) -> &'static [FamilyKey] {
        FAMILIES
    }

    #[instrument(skip(self, ctx), level = "info", err, fields(collector = "time_entries", otel.kind = "client"))]
    fn collect<'a>(&'a self, ctx: CollectionContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query = window(ctx.cycle.today())?;
            let redmine = ctx.sources.redmine()?;
            let mut entries = redmine.time_entries(query);
            let mut hours_per_project: BTreeMap<String, f64> = BTreeMap::new();

            while let Some(entry) = entries.try_next().await? {
                let id = entry.id.to_string();
                let issue = entry
                    .issue
                    .as_ref()
                    .map_or_else(|| ABSENT_LABEL.to_string(), |issue| issue.id.to_string());
                let hours = entry.hours.to_string();

                ctx.cycle.mark(
                    FamilyKey::RedmineTimeSpent,
                    &[
                        id.as_str(),
                        entry.project.name.as_str(),
                        issue.as_str(),
                        entry.user.name.as_str(),
                        entry.activity.name.as_str(),
                        hours.as_str(),
                        entry.spent_on.as_str(),
                    ],
                )?;

                *hours_per_project.entry(entry.project.name).or_default() += entry.hours;
            }

            for (project, hours) in &hours_per_project {
                ctx.cycle
                    .observe(FamilyKey::RedmineProjectHours, &[project.as_str()], *hours)?;
            }

            debug!(
                from = %query.from,
                to = %query.to,
                projects = hours_per_project.len(),
                "collected time entries"
            );

            Ok(())
        })
    }
}
