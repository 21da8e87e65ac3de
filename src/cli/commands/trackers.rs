use crate::collectors::config::STATUS_CATEGORIES;
use clap::{Arg, Command};

/// Default GitHub REST API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Environment variable of a status category, `on-hold` becomes
/// `REDMINE_STATUS_ON_HOLD`.
#[must_use]
pub fn status_env(category: &str) -> String {
    format!("REDMINE_STATUS_{}", category.to_uppercase().replace('-', "_"))
}

pub fn add_tracker_args(mut cmd: Command) -> Command {
    cmd = cmd
        .arg(
            Arg::new("redmine.url")
                .long("redmine.url")
                .help("Redmine base URL, enables the Redmine collectors")
                .env("REDMINE_URL")
                .value_name("URL")
                .value_parser(url::Url::parse),
        )
        .arg(
            Arg::new("redmine.api-key")
                .long("redmine.api-key")
                .help("Redmine REST API key")
                .env("REDMINE_API_KEY")
                .hide_env_values(true)
                .value_name("KEY"),
        )
        .arg(
            Arg::new("github.url")
                .long("github.url")
                .help("GitHub REST API URL")
                .default_value(GITHUB_API_URL)
                .env("GITHUB_API_URL")
                .value_name("URL")
                .value_parser(url::Url::parse),
        )
        .arg(
            Arg::new("github.token")
                .long("github.token")
                .help("GitHub token, enables the GitHub collector together with --github.repo")
                .env("GITHUB_TOKEN")
                .hide_env_values(true)
                .value_name("TOKEN"),
        )
        .arg(
            Arg::new("github.repo")
                .long("github.repo")
                .help("GitHub repository to report on")
                .env("GITHUB_REPO")
                .value_name("OWNER/NAME"),
        );

    for (category, default) in STATUS_CATEGORIES {
        let id: &'static str = Box::leak(format!("status.{category}").into_boxed_str());
        let env: &'static str = Box::leak(status_env(category).into_boxed_str());
        let help: &'static str = Box::leak(
            format!("Redmine status_id filter counted as {category}, empty to disable")
                .into_boxed_str(),
        );

        let mut arg = Arg::new(id)
            .long(id)
            .help(help)
            .env(env)
            .value_name("STATUS_ID");

        if let Some(default) = default {
            arg = arg.default_value(default);
        }

        cmd = cmd.arg(arg);
    }

    cmd
}
