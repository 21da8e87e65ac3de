use anyhow::Result;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::time::{Duration, Instant};

const BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Process-wide scrape metrics.
///
/// Unlike the tracker families, which are rebuilt on every cycle, these live
/// from process start to exit and are never reset:
///
/// - `tracker_collector_collect_seconds` (Histogram): duration of every
///   completed cycle; `_count` and `_sum` grow monotonically
/// - `tracker_collector_scrape_duration_seconds{collector}` (Histogram)
/// - `tracker_collector_scrape_errors_total{collector}` (Counter)
/// - `tracker_collector_last_scrape_success{collector}` (Gauge, 1 or 0)
/// - `tracker_collector_scrapes_total` (Counter): completed cycles
///
/// Clones share the same underlying metrics, so concurrent cycles update one
/// set of atomics.
#[derive(Clone)]
pub struct ScraperCollector {
    collect_seconds: Histogram,
    scrape_duration_seconds: HistogramVec,
    scrape_errors_total: IntCounterVec,
    last_scrape_success: GaugeVec,
    scrapes_total: IntCounter,
    registry: Registry,
}

impl ScraperCollector {
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or registered
    pub fn new() -> Result<Self> {
        let collect_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "tracker_collector_collect_seconds",
                "Time spent to collect metrics from the trackers",
            )
            .buckets(BUCKETS.to_vec()),
        )?;

        let scrape_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tracker_collector_scrape_duration_seconds",
                "Time spent scraping each collector in seconds",
            )
            .buckets(BUCKETS.to_vec()),
            &["collector"],
        )?;

        let scrape_errors_total = IntCounterVec::new(
            Opts::new(
                "tracker_collector_scrape_errors_total",
                "Total number of scrape errors per collector",
            ),
            &["collector"],
        )?;

        let last_scrape_success = GaugeVec::new(
            Opts::new(
                "tracker_collector_last_scrape_success",
                "Whether the last scrape was successful (1=success, 0=failure)",
            ),
            &["collector"],
        )?;

        let scrapes_total = IntCounter::with_opts(Opts::new(
            "tracker_collector_scrapes_total",
            "Total number of completed collection cycles since start",
        ))?;

        let registry = Registry::new();
        registry.register(Box::new(collect_seconds.clone()))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;
        registry.register(Box::new(scrape_errors_total.clone()))?;
        registry.register(Box::new(last_scrape_success.clone()))?;
        registry.register(Box::new(scrapes_total.clone()))?;

        Ok(Self {
            collect_seconds,
            scrape_duration_seconds,
            scrape_errors_total,
            last_scrape_success,
            scrapes_total,
            registry,
        })
    }

    /// Record the start of a collector scrape
    #[must_use]
    pub fn start_scrape(&self, collector_name: &'static str) -> ScrapeTimer {
        ScrapeTimer {
            collector_name,
            start: Instant::now(),
            scraper: self.clone(),
            recorded: false,
        }
    }

    /// Record the duration of a completed cycle.
    pub fn observe_cycle(&self, elapsed: Duration) {
        self.collect_seconds.observe(elapsed.as_secs_f64());
        self.scrapes_total.inc();
    }

    /// Completed cycles and their total duration in seconds.
    #[must_use]
    pub fn cycles(&self) -> (u64, f64) {
        (
            self.collect_seconds.get_sample_count(),
            self.collect_seconds.get_sample_sum(),
        )
    }

    /// Errors recorded for one collector.
    #[must_use]
    pub fn errors(&self, collector_name: &str) -> u64 {
        self.scrape_errors_total
            .with_label_values(&[collector_name])
            .get()
    }

    fn record(&self, collector_name: &str, duration: Duration, success: bool) {
        self.scrape_duration_seconds
            .with_label_values(&[collector_name])
            .observe(duration.as_secs_f64());

        if success {
            self.last_scrape_success
                .with_label_values(&[collector_name])
                .set(1.0);
        } else {
            self.scrape_errors_total
                .with_label_values(&[collector_name])
                .inc();
            self.last_scrape_success
                .with_label_values(&[collector_name])
                .set(0.0);
        }
    }

    /// Render the scrape metrics in text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Times one collector run.
///
/// Call [`ScrapeTimer::success`] or [`ScrapeTimer::error`]; a timer dropped
/// without either (the scrape was abandoned) only records its duration.
pub struct ScrapeTimer {
    collector_name: &'static str,
    start: Instant,
    scraper: ScraperCollector,
    recorded: bool,
}

impl ScrapeTimer {
    /// Mark scrape as successful
    pub fn success(mut self) {
        self.finish(true);
    }

    /// Mark scrape as failed
    pub fn error(mut self) {
        self.finish(false);
    }

    fn finish(&mut self, success: bool) {
        self.recorded = true;
        self.scraper
            .record(self.collector_name, self.start.elapsed(), success);
    }
}

impl Drop for ScrapeTimer {
    fn drop(&mut self) {
        if !self.recorded {
            self.scraper
                .scrape_duration_seconds
                .with_label_values(&[self.collector_name])
                .observe(self.start.elapsed().as_secs_f64());
        }
    }
}
