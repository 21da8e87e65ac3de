//! Remote tracker clients.
//!
//! Read-only clients for the Redmine REST API and the GitHub REST API. Both
//! are exposed behind object-safe traits ([`RedmineApi`], [`GithubApi`]) so the
//! collectors can be exercised against in-memory trackers in tests.
//!
//! Record collections are returned as lazily paged streams: a page is only
//! requested once the previous one has been consumed.

pub mod github;
pub mod redmine;

pub use github::{GithubApi, GithubClient};
pub use redmine::{RedmineApi, RedmineClient};

use anyhow::{Result, anyhow};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

/// Label value used when an optional relation (assignee, author, ...) is absent.
pub const ABSENT_LABEL: &str = "None";

/// Render an optional relation as a label value.
#[inline]
pub fn label_or_absent(value: Option<&str>) -> &str {
    value.unwrap_or(ABSENT_LABEL)
}

/// Default HTTP request timeout for tracker queries.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which remote tracker a collector reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Redmine,
    Github,
}

impl Source {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redmine => "redmine",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RedmineSettings {
    pub url: Url,
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub api_url: Url,
    pub token: SecretString,
    /// Repository in `owner/name` form.
    pub repo: String,
}

/// Connection settings for every configured tracker.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub redmine: Option<RedmineSettings>,
    pub github: Option<GithubSettings>,
    pub timeout: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            redmine: None,
            github: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The tracker clients available to collectors.
#[derive(Clone, Default)]
pub struct Sources {
    redmine: Option<Arc<dyn RedmineApi>>,
    github: Option<Arc<dyn GithubApi>>,
}

impl Sources {
    /// Build HTTP clients for every tracker present in `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built or a setting is invalid
    pub fn connect(settings: &TrackerSettings) -> Result<Self> {
        let mut sources = Self::default();

        if let Some(redmine) = &settings.redmine {
            let client = RedmineClient::new(redmine, settings.timeout)?;
            info!(url = %redmine.url, "Redmine tracker configured");
            sources = sources.with_redmine(Arc::new(client));
        }

        if let Some(github) = &settings.github {
            let client = GithubClient::new(github, settings.timeout)?;
            info!(repo = %github.repo, "GitHub tracker configured");
            sources = sources.with_github(Arc::new(client));
        }

        Ok(sources)
    }

    #[must_use]
    pub fn with_redmine(mut self, client: Arc<dyn RedmineApi>) -> Self {
        self.redmine = Some(client);
        self
    }

    #[must_use]
    pub fn with_github(mut self, client: Arc<dyn GithubApi>) -> Self {
        self.github = Some(client);
        self
    }

    #[must_use]
    pub fn has(&self, source: Source) -> bool {
        match source {
            Source::Redmine => self.redmine.is_some(),
            Source::Github => self.github.is_some(),
        }
    }

    /// Names of the configured trackers.
    #[must_use]
    pub fn configured(&self) -> Vec<&'static str> {
        [Source::Redmine, Source::Github]
            .into_iter()
            .filter(|s| self.has(*s))
            .map(Source::as_str)
            .collect()
    }

    /// # Errors
    ///
    /// Returns an error if no Redmine client is configured
    pub fn redmine(&self) -> Result<&dyn RedmineApi> {
        self.redmine
            .as_deref()
            .ok_or_else(|| anyhow!("Redmine tracker is not configured"))
    }

    /// # Errors
    ///
    /// Returns an error if no GitHub client is configured
    pub fn github(&self) -> Result<&dyn GithubApi> {
        self.github
            .as_deref()
            .ok_or_else(|| anyhow!("GitHub tracker is not configured"))
    }
}

/// Make sure `url` ends with a slash so relative endpoints join below it.
pub(crate) fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
