use crate::collectors::config::CollectorConfig;
use crate::collectors::cycle::{Cycle, Snapshot};
use crate::collectors::families::FamilyKey;
use crate::collectors::scraper::ScraperCollector;
use crate::collectors::{COLLECTOR_NAMES, CollectionContext, Collector, CollectorType, all_factories};
use crate::tracker::Sources;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// The enabled collectors plus the tracker clients they query.
///
/// One [`CollectorRegistry::collect`] call is one collection cycle. Cycles
/// share nothing but the scrape metrics, so concurrent scrapes are safe.
#[derive(Clone)]
pub struct CollectorRegistry {
    collectors: Vec<CollectorType>,
    sources: Sources,
    config: Arc<CollectorConfig>,
    scraper: ScraperCollector,
}

impl CollectorRegistry {
    /// Instantiate every enabled collector whose tracker is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the scrape metrics cannot be created or no enabled
    /// collector has a configured tracker
    pub fn new(config: CollectorConfig, sources: Sources) -> Result<Self> {
        let factories = all_factories();

        let collectors: Vec<CollectorType> = COLLECTOR_NAMES
            .iter()
            .filter(|name| config.is_enabled(name))
            .filter_map(|name| factories.get(name).map(|f| f()))
            .filter(|collector| {
                let available = sources.has(collector.source());
                if !available {
                    warn!(
                        collector = collector.name(),
                        source = %collector.source(),
                        "collector disabled, tracker is not configured"
                    );
                }
                available
            })
            .collect();

        if collectors.is_empty() {
            return Err(anyhow!(
                "no collector can run, configure a Redmine or GitHub tracker"
            ));
        }

        info!(
            collectors = ?collectors.iter().map(Collector::name).collect::<Vec<_>>(),
            "collectors enabled"
        );

        Ok(Self {
            collectors,
            sources,
            config: Arc::new(config),
            scraper: ScraperCollector::new()?,
        })
    }

    /// Families published by the enabled collectors, in emission order.
    #[must_use]
    pub fn families(&self) -> Vec<FamilyKey> {
        let mut keys: Vec<FamilyKey> = self
            .collectors
            .iter()
            .flat_map(|c| c.families().iter().copied())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Run one collection cycle.
    ///
    /// Every family of the enabled collectors is declared empty first, then
    /// the collectors run one after another. A failing collector aborts the
    /// cycle: its error is returned and no partial snapshot is published.
    ///
    /// # Errors
    ///
    /// Returns the first collector error
    #[instrument(skip(self), level = "info", err, fields(otel.kind = "internal"))]
    pub async fn collect(&self) -> Result<Snapshot> {
        let start = Instant::now();
        let cycle = Cycle::begin(self.families());

        let ctx = CollectionContext {
            sources: &self.sources,
            config: &self.config,
            cycle: &cycle,
        };

        for collector in &self.collectors {
            let name = collector.name();
            let timer = self.scraper.start_scrape(name);
            let span = info_span!("collector.collect", collector = %name, otel.kind = "internal");

            match collector.collect(ctx).instrument(span).await {
                Ok(()) => {
                    timer.success();
                    debug!(collector = name, "collected");
                }
                Err(e) => {
                    timer.error();
                    warn!(collector = name, error = %e, "collector failed, aborting cycle");
                    return Err(e.context(format!("collector '{name}' failed")));
                }
            }
        }

        let observations = cycle.observation_count();
        let snapshot = cycle.into_snapshot();
        let elapsed = start.elapsed();
        self.scraper.observe_cycle(elapsed);

        debug!(
            observations,
            elapsed_ms = elapsed.as_millis(),
            "collection cycle complete"
        );

        Ok(snapshot)
    }

    #[must_use]
    pub const fn scraper(&self) -> &ScraperCollector {
        &self.scraper
    }

    #[must_use]
    pub const fn sources(&self) -> &Sources {
        &self.sources
    }

    #[must_use]
    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
