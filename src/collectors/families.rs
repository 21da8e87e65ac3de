//! Gauge family catalog.
//!
//! Every family the exporter can publish is declared here under a
//! [`FamilyKey`]. Names and label lists are the wire contract with
//! dashboards: renaming either is a breaking change.

use anyhow::{Result, anyhow};
use std::fmt;

/// Static description of a gauge family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyDefinition {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

const PROJECT: &[&str] = &["projectname"];

/// Strongly typed family identifier; variant order is emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FamilyKey {
    RedmineOpenIssues,
    RedmineOpenIssueCount,
    RedmineClosedIssueCount,
    RedmineResolvedIssueCount,
    RedmineOnHoldIssueCount,
    RedmineInProgressIssueCount,
    RedmineFeedbackIssueCount,
    RedmineActiveUsers,
    RedmineToday,
    RedmineIssueDueDate,
    RedmineTimeSpent,
    RedmineProjectHours,
    GithubIssues,
    GithubPullRequests,
    GithubCommits,
    GithubRepos,
}

impl FamilyKey {
    pub const ALL: &'static [Self] = &[
        Self::RedmineOpenIssues,
        Self::RedmineOpenIssueCount,
        Self::RedmineClosedIssueCount,
        Self::RedmineResolvedIssueCount,
        Self::RedmineOnHoldIssueCount,
        Self::RedmineInProgressIssueCount,
        Self::RedmineFeedbackIssueCount,
        Self::RedmineActiveUsers,
        Self::RedmineToday,
        Self::RedmineIssueDueDate,
        Self::RedmineTimeSpent,
        Self::RedmineProjectHours,
        Self::GithubIssues,
        Self::GithubPullRequests,
        Self::GithubCommits,
        Self::GithubRepos,
    ];

    #[must_use]
    pub const fn definition(self) -> FamilyDefinition {
        match self {
            Self::RedmineOpenIssues => FamilyDefinition {
                name: "redmine_project_issue_open",
                help: "Redmine open issues, one series per issue",
                labels: &[
                    "projectname",
                    "issueid",
                    "status",
                    "tracker",
                    "priority",
                    "author",
                    "user",
                ],
            },
            Self::RedmineOpenIssueCount => FamilyDefinition {
                name: "redmine_project_open_issues",
                help: "Number of open issues per Redmine project",
                labels: PROJECT,
            },
            Self::RedmineClosedIssueCount => FamilyDefinition {
                name: "redmine_project_closed_issues",
                help: "Number of closed issues per Redmine project",
                labels: PROJECT,
            },
            Self::RedmineResolvedIssueCount => FamilyDefinition {
                name: "redmine_project_resolved_issues",
                help: "Number of resolved issues per Redmine project",
                labels: PROJECT,
            },
            Self::RedmineOnHoldIssueCount => FamilyDefinition {
                name: "redmine_project_on_hold_issues",
                help: "Number of on-hold issues per Redmine project",
                labels: PROJECT,
            },
            Self::RedmineInProgressIssueCount => FamilyDefinition {
                name: "redmine_project_in_progress_issues",
                help: "Number of in-progress issues per Redmine project",
                labels: PROJECT,
            },
            Self::RedmineFeedbackIssueCount => FamilyDefinition {
                name: "redmine_project_feedback_issues",
                help: "Number of issues awaiting feedback per Redmine project",
                labels: PROJECT,
            },
            Self::RedmineActiveUsers => FamilyDefinition {
                name: "redmine_active_users",
                help: "Number of active Redmine users",
                labels: &[],
            },
            Self::RedmineToday => FamilyDefinition {
                name: "redmine_today",
                help: "Current date of the collection cycle",
                labels: &["date"],
            },
            Self::RedmineIssueDueDate => FamilyDefinition {
                name: "redmine_project_issue_due_date",
                help: "Redmine open issues with a due date, one series per issue",
                labels: &["projectname", "issueid", "subject", "user", "due_date"],
            },
            Self::RedmineTimeSpent => FamilyDefinition {
                name: "redmine_time_spent_last_7_days",
                help: "Redmine time entries of the recent window, one series per entry",
                labels: &[
                    "entryid",
                    "projectname",
                    "issueid",
                    "user",
                    "activity",
                    "hours",
                    "spent_on",
                ],
            },
            Self::RedmineProjectHours => FamilyDefinition {
                name: "redmine_project_hours_spent_last_7_days",
                help: "Hours logged per Redmine project in the recent window",
                labels: PROJECT,
            },
            Self::GithubIssues => FamilyDefinition {
                name: "github_project_issues_open",
                help: "GitHub open issues, one series per issue",
                labels: &[
                    "issueid",
                    "assignee",
                    "number",
                    "comments_url",
                    "body",
                    "labels",
                    "state",
                ],
            },
            Self::GithubPullRequests => FamilyDefinition {
                name: "github_project_pull_requests",
                help: "GitHub pull requests, one series per pull request",
                labels: &[
                    "pullid",
                    "assignee",
                    "number",
                    "comments_url",
                    "body",
                    "labels",
                    "state",
                ],
            },
            Self::GithubCommits => FamilyDefinition {
                name: "github_project_commits",
                help: "GitHub commits, one series per commit",
                labels: &["sha", "author", "committer", "message", "url"],
            },
            Self::GithubRepos => FamilyDefinition {
                name: "github_project_all_repos",
                help: "GitHub repositories of the authenticated user",
                labels: &[
                    "name",
                    "id",
                    "url",
                    "clone_url",
                    "created_at",
                    "commits_url",
                    "full_name",
                    "language",
                    "updated_at",
                    "watchers",
                ],
            },
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.definition().name
    }
}

/// One sample of a family; label values follow the family's label order.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub label_values: Vec<String>,
    pub value: f64,
}

/// A gauge family and the observations added during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    definition: FamilyDefinition,
    observations: Vec<Observation>,
}

impl MetricFamily {
    #[must_use]
    pub const fn new(definition: FamilyDefinition) -> Self {
        Self {
            definition,
            observations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn definition(&self) -> &FamilyDefinition {
        &self.definition
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.definition.name
    }

    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Add one observation.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of label values differs from the
    /// family's label names
    pub fn add<S: AsRef<str>>(&mut self, label_values: &[S], value: f64) -> Result<()> {
        if label_values.len() != self.definition.labels.len() {
            return Err(anyhow!(
                "family {} expects {} label values, got {}",
                self.definition.name,
                self.definition.labels.len(),
                label_values.len()
            ));
        }

        self.observations.push(Observation {
            label_values: label_values.iter().map(|v| v.as_ref().to_string()).collect(),
            value,
        });

        Ok(())
    }

    /// Value of the first observation carrying exactly `label_values`.
    #[must_use]
    pub fn value_of(&self, label_values: &[&str]) -> Option<f64> {
        self.observations
            .iter()
            .find(|o| o.label_values.iter().map(String::as_str).eq(label_values.iter().copied()))
            .map(|o| o.value)
    }

    /// Values of one label across all observations, in insertion order.
    #[must_use]
    pub fn label_values(&self, label: &str) -> Vec<&str> {
        let Some(position) = self.definition.labels.iter().position(|l| *l == label) else {
            return Vec::new();
        };

        self.observations
            .iter()
            .filter_map(|o| o.label_values.get(position).map(String::as_str))
            .collect()
    }
}

/// Prometheus text exposition: `# HELP`, `# TYPE gauge`, then one line per
/// observation. An empty family renders its header only.
impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.definition.name;

        writeln!(f, "# HELP {name} {}", escape_help(self.definition.help))?;
        writeln!(f, "# TYPE {name} gauge")?;

        for observation in &self.observations {
            f.write_str(name)?;

            if !self.definition.labels.is_empty() {
                f.write_str("{")?;
                for (i, (label, value)) in self
                    .definition
                    .labels
                    .iter()
                    .zip(&observation.label_values)
                    .enumerate()
                {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{label}=\"{}\"", escape_label_value(value))?;
                }
                f.write_str("}")?;
            }

            f.write_str(" ")?;
            write_value(f, observation.value)?;
            f.write_str("\n")?;
        }

        Ok(())
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', r"\\").replace('\n', r"\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('\n', r"\n")
}

fn write_value(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "+Inf" } else { "-Inf" })
    } else {
        write!(f, "{value}")
    }
}
