use crate::{
    cli::actions::Action,
    collectors::{
        COLLECTOR_NAMES, Collector, all_factories,
        config::{CollectorConfig, STATUS_CATEGORIES, StatusFilters},
    },
    tracker::{GithubSettings, RedmineSettings, TrackerSettings},
};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    // Get the port or return an error
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // Get the listen address (None means auto-detect)
    let listen = matches.get_one::<String>("listen").map(ToString::to_string);

    let trackers = tracker_settings(matches)?;

    if trackers.redmine.is_none() && trackers.github.is_none() {
        return Err(anyhow!(
            "No tracker configured. Set --redmine.url and/or --github.token with --github.repo."
        ));
    }

    let collectors = get_enabled_collectors(matches);
    info!("Enabled collectors: {:?}", collectors);

    let config = CollectorConfig::new()
        .with_enabled(&collectors)
        .with_statuses(status_filters(matches));

    Ok(Action::Run {
        port,
        listen,
        trackers,
        config,
    })
}

/// Build the tracker connection settings.
///
/// # Errors
///
/// Returns an error if the GitHub settings are incomplete
pub fn tracker_settings(matches: &ArgMatches) -> Result<TrackerSettings> {
    let redmine = matches
        .get_one::<Url>("redmine.url")
        .map(|url| RedmineSettings {
            url: url.clone(),
            api_key: non_empty(matches, "redmine.api-key").map(SecretString::from),
        });

    if redmine
        .as_ref()
        .is_some_and(|settings| settings.api_key.is_none())
    {
        warn!("No Redmine API key set, only public data will be visible");
    }

    let github = match (
        non_empty(matches, "github.token"),
        non_empty(matches, "github.repo"),
    ) {
        (Some(token), Some(repo)) => Some(GithubSettings {
            api_url: matches
                .get_one::<Url>("github.url")
                .cloned()
                .ok_or_else(|| anyhow!("GitHub API URL is required"))?,
            token: SecretString::from(token),
            repo,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(anyhow!(
                "--github.repo is required when --github.token is set"
            ));
        }
        (None, Some(_)) => {
            return Err(anyhow!(
                "--github.token is required when --github.repo is set"
            ));
        }
    };

    let timeout = matches
        .get_one::<u64>("http-timeout")
        .copied()
        .map_or(crate::tracker::DEFAULT_TIMEOUT, Duration::from_secs);

    Ok(TrackerSettings {
        redmine,
        github,
        timeout,
    })
}

/// Status filters from `--status.*`; an empty value disables the category.
pub fn status_filters(matches: &ArgMatches) -> StatusFilters {
    StatusFilters::from_values(
        STATUS_CATEGORIES.map(|(category, _)| non_empty(matches, &format!("status.{category}"))),
    )
}

fn non_empty(matches: &ArgMatches, id: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_enabled_collectors(matches: &ArgMatches) -> Vec<String> {
    let factories = all_factories();

    COLLECTOR_NAMES
        .iter()
        .filter(|&name| {
            // If explicitly disabled, skip it
            if matches.get_flag(&format!("no-collector.{name}")) {
                return false;
            }

            // If explicitly enabled, include it
            if matches.get_flag(&format!("collector.{name}")) {
                return true;
            }

            // Otherwise, check the collector's default setting
            factories
                .get(name)
                .is_some_and(|factory| factory().enabled_by_default())
        })
        .map(|&name| name.to_string())
        .collect()
}
