pub mod run;

use crate::collectors::config::CollectorConfig;
use crate::tracker::TrackerSettings;

#[derive(Debug)]
pub enum Action {
    Run {
        port: u16,
        listen: Option<String>,
        trackers: TrackerSettings,
        config: CollectorConfig,
    },
}
